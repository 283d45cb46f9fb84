//! HAR DESIGN Commerce
//!
//! Storefront and cash-register back-office service for a couture boutique.
//!
//! ## Features
//! - Product and couture-model catalog with a merged projection
//! - Cart pricing and the order lifecycle (pending → processing → completed)
//! - Atomic fulfillment: status flip + stock decrement + cash-ledger entry
//! - Append-only cash ledger with period summaries
//! - Custom made-to-order workflow with deposits

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

pub mod domain;
pub mod store;

#[derive(Error, Debug)]
pub enum CommerceError {
    #[error("product not found")]
    ProductNotFound,

    #[error("model not found")]
    ModelNotFound,

    #[error("order not found")]
    OrderNotFound,

    #[error("custom order not found")]
    CustomOrderNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error("status is '{actual}', transition to '{requested}' is not allowed")]
    InvalidTransition { actual: String, requested: String },

    #[error("order was already '{actual}' when the update was attempted")]
    Conflict { actual: String },

    #[error("insufficient stock for '{name}': {available} available, {requested} requested")]
    InsufficientStock {
        name: String,
        available: i32,
        requested: i32,
    },

    #[error("admin privileges required")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl CommerceError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ProductNotFound
            | Self::ModelNotFound
            | Self::OrderNotFound
            | Self::CustomOrderNotFound
            | Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::InvalidTransition { .. } | Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::InsufficientStock { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CommerceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, CommerceError>;
