use axum::{extract::{Query, State}, http::HeaderMap, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::{fail, require_admin, ApiResult, AppState};
use crate::domain::aggregates::Bundle;
use crate::domain::services::{build_bundle, compute_metadata, dedup_bundles, plan_bundles};
use crate::StoreError;

#[derive(Debug, Deserialize, Validate)]
pub struct BuildParams {
    pub gate_id: i64,
    #[validate(range(min = 1.0, max = 1000.0))]
    pub width: f32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PlanParams {
    #[validate(range(min = 1.0, max = 1000.0))]
    pub width: f32,
    #[serde(default)]
    pub dedup: bool,
}

/// Builds and finalises a bundle around one gate.
pub(crate) async fn bundle_for_gate(s: &AppState, gate_id: i64, width: f32) -> Result<Bundle, StoreError> {
    let gate = s.catalog.gate_by_id(gate_id).await?;
    let extensions = s.catalog.extensions_compatible_with_gate(gate_id).await?;
    let mut bundle = build_bundle(width, &gate, &extensions)?;
    compute_metadata(&mut bundle);
    Ok(bundle)
}

pub async fn build(State(s): State<AppState>, Query(p): Query<BuildParams>) -> ApiResult<Json<Bundle>> {
    p.validate().map_err(fail)?;
    bundle_for_gate(&s, p.gate_id, p.width).await.map(Json).map_err(fail)
}

pub async fn plan(State(s): State<AppState>, Query(p): Query<PlanParams>) -> ApiResult<Json<Vec<Bundle>>> {
    p.validate().map_err(fail)?;
    let bundles = plan_bundles(&*s.catalog, s.config.plan_options(p.dedup), p.width).await.map_err(fail)?;
    Ok(Json(bundles))
}

/// Precomputed bundle kept for fast repeat display.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PopularBundle { pub id: i64, pub gate_id: i64, pub name: String, pub size: f32, pub price: f32, pub color: String, pub computed_at: DateTime<Utc> }

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshPopularRequest {
    #[validate(length(min = 1, max = 50))]
    pub widths: Vec<f32>,
}

pub async fn list_popular(State(s): State<AppState>) -> ApiResult<Json<Vec<PopularBundle>>> {
    let rows = sqlx::query_as::<_, PopularBundle>("SELECT * FROM popular_bundles ORDER BY size, price")
        .fetch_all(&s.db).await.map_err(fail)?;
    Ok(Json(rows))
}

/// Replaces the popular bundle rows with fresh plans for each requested width.
pub async fn refresh_popular(State(s): State<AppState>, headers: HeaderMap, Json(r): Json<RefreshPopularRequest>) -> ApiResult<Json<Vec<PopularBundle>>> {
    require_admin(&headers, &s.config).map_err(fail)?;
    r.validate().map_err(fail)?;
    let mut planned = Vec::new();
    for width in &r.widths {
        planned.extend(plan_bundles(&*s.catalog, s.config.plan_options(true), *width).await.map_err(fail)?);
    }
    let planned = dedup_bundles(planned);

    let mut tx = s.db.begin().await.map_err(fail)?;
    sqlx::query("DELETE FROM popular_bundles").execute(&mut *tx).await.map_err(fail)?;
    let mut rows = Vec::with_capacity(planned.len());
    for b in &planned {
        let row = sqlx::query_as::<_, PopularBundle>("INSERT INTO popular_bundles (gate_id, name, size, price, color, computed_at) VALUES ($1, $2, $3, $4, $5, NOW()) RETURNING *")
            .bind(b.gate.id()).bind(&b.name).bind(b.width).bind(b.price).bind(&b.color)
            .fetch_one(&mut *tx).await.map_err(fail)?;
        rows.push(row);
    }
    tx.commit().await.map_err(fail)?;
    tracing::info!(widths = r.widths.len(), bundles = rows.len(), "popular bundles refreshed");
    Ok(Json(rows))
}
