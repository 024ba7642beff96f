//! Error-to-status mapping.
//!
//! Checkout and query failures are user-correctable and surface as `400`
//! with a reason; storage failures are logged here and surface as a bare
//! `500` so backend detail never leaks to a client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use shopcore::errors::{CheckoutError, QueryError, StoreError};
use tracing::error;

/// Wire-level request failure.
#[derive(Debug)]
pub enum ApiError {
    /// `404` with an empty body.
    NotFound,
    /// `400` with a reason body.
    BadRequest(String),
    /// `500` with a generic body; detail is in the logs only.
    Internal,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND.into_response(),
            Self::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, Json(ErrorBody { error: reason })).into_response()
            }
            Self::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: "internal server error".to_string(),
                }),
            )
                .into_response(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        error!(error = %err, "[server.storage_error] request failed in the storage layer");
        Self::Internal
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Store(inner) => inner.into(),
            client_fault => Self::BadRequest(client_fault.to_string()),
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        Self::BadRequest(err.to_string())
    }
}
