//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use gatehouse_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("invalid release date: {0}")]
  InvalidReleaseDate(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store unavailable: {0}")]
  Unavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<CoreError> for ApiError {
  fn from(e: CoreError) -> Self {
    match e {
      CoreError::NotFound(id) => ApiError::NotFound(format!("content {id} not found")),
      CoreError::InvalidReleaseDate(m) => ApiError::InvalidReleaseDate(m),
      CoreError::Validation(m) => ApiError::BadRequest(m),
      CoreError::TransientStore(e) => ApiError::Unavailable(e),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::InvalidReleaseDate(m) => (StatusCode::UNPROCESSABLE_ENTITY, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Unavailable(e) => {
        tracing::error!(error = %e, "store unavailable");
        (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
