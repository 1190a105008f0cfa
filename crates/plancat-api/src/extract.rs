//! Extractors whose rejections render as [`ApiError`] bodies.

use axum::{
  extract::{FromRequest, FromRequestParts},
  response::{IntoResponse, Response},
};

use crate::error::ApiError;

/// `axum::Json` with malformed bodies reported as `BAD_REQUEST`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl<T: serde::Serialize> IntoResponse for ApiJson<T> {
  fn into_response(self) -> Response { axum::Json(self.0).into_response() }
}

/// `axum::extract::Path` with unparseable segments reported as
/// `BAD_REQUEST`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
