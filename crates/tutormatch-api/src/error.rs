//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tutormatch_core::Error as EngineError;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// The `x-actor` header is missing or unparseable.
  #[error("unauthenticated: {0}")]
  Unauthenticated(String),

  #[error(transparent)]
  Engine(#[from] EngineError),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthenticated(m) => (StatusCode::UNAUTHORIZED, m.clone()),
      ApiError::Engine(e) => match e {
        EngineError::NotFound { .. } => (StatusCode::NOT_FOUND, e.to_string()),
        EngineError::Unauthorized => (StatusCode::FORBIDDEN, e.to_string()),
        EngineError::InvalidState { .. } => (StatusCode::CONFLICT, e.to_string()),
        EngineError::NoCandidates => (StatusCode::NOT_FOUND, e.to_string()),
        EngineError::InvalidRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
        EngineError::UpstreamUnavailable(source) => {
          tracing::error!(error = %source, "request failed");
          (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_owned())
        }
      },
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
