use axum::{extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, Json};
use serde::Deserialize;
use validator::Validate;

use crate::api::{fail, require_admin, ApiResult, AppState};
use crate::catalog::GateFilter;
use crate::domain::aggregates::{Extension, Gate, Product};

#[derive(Debug, Deserialize)] pub struct GateListParams { pub max_width: Option<f32> }

pub async fn list_gates(State(s): State<AppState>, Query(p): Query<GateListParams>) -> ApiResult<Json<Vec<Gate>>> {
    let gates = s.catalog.list_gates(GateFilter { narrower_than: p.max_width }).await.map_err(fail)?;
    Ok(Json(gates))
}

pub async fn get_gate(State(s): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Gate>> {
    s.catalog.gate_by_id(id).await.map(Json).map_err(fail)
}

pub async fn get_extension(State(s): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Extension>> {
    s.catalog.extension_by_id(id).await.map(Json).map_err(fail)
}

pub async fn gate_extensions(State(s): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Vec<Extension>>> {
    s.catalog.gate_by_id(id).await.map_err(fail)?;
    s.catalog.extensions_compatible_with_gate(id).await.map(Json).map_err(fail)
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(range(min = 0.1, max = 1000.0))]
    pub width: f32,
    #[validate(range(min = 0.0))]
    pub price: f32,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 100.0))]
    pub tolerance: f32,
}

impl NewProductRequest {
    fn product(&self) -> Product {
        Product::new(0, self.name.trim(), self.width, self.price).with_image(self.image.trim()).with_color(self.color.trim())
    }
}

pub async fn create_gate(State(s): State<AppState>, headers: HeaderMap, Json(r): Json<NewProductRequest>) -> ApiResult<(StatusCode, Json<Gate>)> {
    require_admin(&headers, &s.config).map_err(fail)?;
    r.validate().map_err(fail)?;
    let gate = s.catalog.create_gate(Gate::new(r.product(), r.tolerance)).await.map_err(fail)?;
    tracing::info!(gate_id = gate.id(), name = gate.name(), "gate created");
    Ok((StatusCode::CREATED, Json(gate)))
}

pub async fn create_extension(State(s): State<AppState>, headers: HeaderMap, Json(r): Json<NewProductRequest>) -> ApiResult<(StatusCode, Json<Extension>)> {
    require_admin(&headers, &s.config).map_err(fail)?;
    r.validate().map_err(fail)?;
    let extension = s.catalog.create_extension(Extension::new(r.product())).await.map_err(fail)?;
    tracing::info!(extension_id = extension.id(), name = extension.name(), "extension created");
    Ok((StatusCode::CREATED, Json(extension)))
}

pub async fn link_extension(State(s): State<AppState>, headers: HeaderMap, Path((gate_id, extension_id)): Path<(i64, i64)>) -> ApiResult<StatusCode> {
    require_admin(&headers, &s.config).map_err(fail)?;
    s.catalog.link_extension(gate_id, extension_id).await.map_err(fail)?;
    Ok(StatusCode::NO_CONTENT)
}
