//! HTTP front end for plancat: configuration and the top-level router.

pub mod config;

use std::sync::Arc;

use axum::Router;
use plancat_core::store::CatalogStore;
use tower_http::trace::TraceLayer;

pub use crate::config::{Database, ServerConfig};

/// The full application: the JSON API under `/api`, with request tracing.
pub fn router<S>(store: Arc<S>) -> Router
where
  S: CatalogStore + 'static,
{
  Router::new()
    .nest("/api", plancat_api::api_router(store))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use plancat_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  async fn app() -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    router(Arc::new(store))
  }

  #[tokio::test]
  async fn api_is_nested_under_prefix() {
    let req = Request::builder()
      .uri("/api/tracking-plans")
      .body(Body::empty())
      .unwrap();
    let resp = app().await.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn unprefixed_routes_are_not_served() {
    let req = Request::builder().uri("/events").body(Body::empty()).unwrap();
    let resp = app().await.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
