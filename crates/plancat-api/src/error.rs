//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error body has the shape
//! `{"error": {"code": "<CODE>", "message": "<text>"}}`.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use plancat_core::store::DomainError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// A domain failure, reported with its stable code.
  #[error("{message}")]
  Catalog { code: &'static str, message: String },

  /// The request could not be decoded.
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a backend error: domain failures keep their code, anything
  /// else becomes an opaque `OPERATION_FAILED`.
  pub fn from_store<E>(err: E) -> Self
  where
    E: std::error::Error + DomainError + Send + Sync + 'static,
  {
    match err.domain() {
      Some(domain) => domain.into(),
      None => Self::Store(Box::new(err)),
    }
  }

  pub fn code(&self) -> &'static str {
    match self {
      Self::Catalog { code, .. } => *code,
      Self::BadRequest(_) => "BAD_REQUEST",
      Self::Store(_) => "OPERATION_FAILED",
    }
  }

  fn status(&self) -> StatusCode {
    match self.code() {
      "UNIQUE_CONSTRAINT" | "CONFLICT" => StatusCode::CONFLICT,
      "VALIDATION_ERROR" => StatusCode::UNPROCESSABLE_ENTITY,
      "NOT_FOUND" => StatusCode::NOT_FOUND,
      "BAD_REQUEST" => StatusCode::BAD_REQUEST,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<&plancat_core::Error> for ApiError {
  fn from(err: &plancat_core::Error) -> Self {
    Self::Catalog { code: err.code(), message: err.to_string() }
  }
}

impl From<plancat_core::Error> for ApiError {
  fn from(err: plancat_core::Error) -> Self { Self::from(&err) }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!(error = %self, "request failed");
    }
    let body = json!({ "error": { "code": self.code(), "message": self.to_string() } });
    (status, Json(body)).into_response()
  }
}
