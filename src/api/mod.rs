//! HTTP surface: catalog browsing, bundle building, cart, checkout, contact.

mod bundles;
mod cart;
mod catalog;
mod contact;

use std::sync::Arc;
use axum::{http::{HeaderMap, StatusCode}, routing::{get, patch, post}, Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::catalog::CatalogAdmin;
use crate::config::AppConfig;
use crate::domain::events::DomainEvent;
use crate::StoreError;

pub use bundles::PopularBundle;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub catalog: Arc<dyn CatalogAdmin>,
    pub nats: Option<async_nats::Client>,
    pub config: Arc<AppConfig>,
}

pub type ApiResult<T> = Result<T, (StatusCode, String)>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "gatestore"})) }))
        .route("/api/v1/gates", get(catalog::list_gates))
        .route("/api/v1/gates/:id", get(catalog::get_gate))
        .route("/api/v1/gates/:id/extensions", get(catalog::gate_extensions))
        .route("/api/v1/extensions/:id", get(catalog::get_extension))
        .route("/api/v1/bundles/build", get(bundles::build))
        .route("/api/v1/bundles/plan", get(bundles::plan))
        .route("/api/v1/popular-bundles", get(bundles::list_popular))
        .route("/api/v1/cart/:session", get(cart::get_cart).delete(cart::clear_cart))
        .route("/api/v1/cart/:session/items", post(cart::add_item))
        .route("/api/v1/cart/:session/items/:line_key", patch(cart::update_line).delete(cart::remove_line))
        .route("/api/v1/cart/:session/bundles", post(cart::add_bundle))
        .route("/api/v1/checkout/:session", post(cart::checkout))
        .route("/api/v1/orders/:id", get(cart::get_order))
        .route("/api/v1/contact", post(contact::submit))
        .route("/api/v1/admin/gates", post(catalog::create_gate))
        .route("/api/v1/admin/extensions", post(catalog::create_extension))
        .route("/api/v1/admin/gates/:id/extensions/:extension_id", post(catalog::link_extension))
        .route("/api/v1/admin/popular-bundles", post(bundles::refresh_popular))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Maps any domain error onto the handler error type.
pub(crate) fn fail(e: impl Into<StoreError>) -> (StatusCode, String) {
    let e: StoreError = e.into();
    e.into()
}

pub(crate) fn require_admin(headers: &HeaderMap, config: &AppConfig) -> Result<(), StoreError> {
    let expected = config.admin_token.as_deref().ok_or(StoreError::Forbidden)?;
    match headers.get(ADMIN_TOKEN_HEADER).and_then(|v| v.to_str().ok()) {
        Some(given) if given == expected => Ok(()),
        _ => Err(StoreError::Forbidden),
    }
}

pub(crate) async fn publish_events(nats: Option<&async_nats::Client>, events: Vec<DomainEvent>) {
    let Some(client) = nats else { return };
    for event in events {
        let subject = event.subject();
        let payload = match serde_json::to_vec(&event) {
            Ok(p) => p,
            Err(e) => { tracing::warn!(%subject, error = %e, "failed to encode event"); continue; }
        };
        if let Err(e) = client.publish(subject.clone(), payload.into()).await {
            tracing::warn!(%subject, error = %e, "failed to publish event");
        }
    }
}
