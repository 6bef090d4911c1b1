//! Gatestore
//!
//! Storefront for pressure-fit safety gates.
//!
//! ## Features
//! - Gate and extension catalog with a TTL cache in front of Postgres
//! - Bundle builder: one gate plus the extensions that reach a requested width
//! - Batch planner offering one bundle per gate that fits
//! - Session-keyed shopping cart and checkout into pending-payment orders
//! - Popular-bundle precomputation

pub mod api;
pub mod catalog;
pub mod config;
pub mod domain;

use axum::http::StatusCode;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::domain::aggregates::{CartError, OrderError};
use crate::domain::services::{BundleError, PlanError};
use crate::domain::value_objects::{MoneyError, SessionIdError};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error("invalid session: {0}")]
    Session(#[from] SessionIdError),

    #[error(transparent)]
    Money(#[from] MoneyError),

    #[error("Order not found")]
    OrderNotFound,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Admin token required")]
    Forbidden,

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl From<PlanError> for StoreError {
    fn from(e: PlanError) -> Self {
        match e {
            PlanError::Bundle(e) => Self::Bundle(e),
            PlanError::Catalog(e) => Self::Catalog(e),
        }
    }
}

impl From<validator::ValidationErrors> for StoreError {
    fn from(e: validator::ValidationErrors) -> Self { Self::Validation(e.to_string()) }
}

impl StoreError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Catalog(CatalogError::NotFound { .. }) | Self::Cart(CartError::ItemNotFound) | Self::OrderNotFound => StatusCode::NOT_FOUND,
            Self::Catalog(CatalogError::Invalid(_)) | Self::Session(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Bundle(BundleError::InvalidWidth(_)) => StatusCode::BAD_REQUEST,
            Self::Bundle(_) | Self::Cart(_) | Self::Order(_) | Self::Money(_) | Self::EmptyCart => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Catalog(CatalogError::Database(_)) | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for (StatusCode, String) {
    fn from(e: StoreError) -> Self {
        let status = e.status();
        if status.is_server_error() {
            tracing::error!(error = %e, "request failed");
        }
        (status, e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(StoreError::from(CatalogError::gate_not_found(3)).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            StoreError::from(BundleError::GateTooWide { gate_id: 1, gate_width: 80.0, desired_width: 70.0 }).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(StoreError::from(BundleError::InvalidWidth(0.0)).status(), StatusCode::BAD_REQUEST);
        assert_eq!(StoreError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(StoreError::from(CartError::ItemNotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(StoreError::from(CartError::InvalidQuantity).status(), StatusCode::UNPROCESSABLE_ENTITY);
        let (status, body) = <(StatusCode, String)>::from(StoreError::OrderNotFound);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "Order not found");
    }
}
