//! JSON REST API for plancat.
//!
//! Exposes an axum [`Router`] backed by any [`plancat_core::store::CatalogStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", plancat_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod events;
pub mod extract;
pub mod properties;
pub mod tracking_plans;

use std::sync::Arc;

use axum::{Router, routing::get};
use plancat_core::store::CatalogStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: CatalogStore + 'static,
{
  Router::new()
    // Events
    .route("/events", get(events::list::<S>).post(events::create::<S>))
    .route(
      "/events/{id}",
      get(events::get_one::<S>)
        .put(events::update::<S>)
        .delete(events::delete::<S>),
    )
    // Properties
    .route("/properties", get(properties::list::<S>).post(properties::create::<S>))
    .route(
      "/properties/{id}",
      get(properties::get_one::<S>)
        .put(properties::update::<S>)
        .delete(properties::delete::<S>),
    )
    // Tracking plans
    .route(
      "/tracking-plans",
      get(tracking_plans::list::<S>).post(tracking_plans::create::<S>),
    )
    .route(
      "/tracking-plans/{id}",
      get(tracking_plans::get_one::<S>)
        .put(tracking_plans::update::<S>)
        .delete(tracking_plans::delete::<S>),
    )
    .with_state(store)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
  };
  use plancat_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  async fn app() -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    api_router(Arc::new(store))
  }

  async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
      Some(body) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  fn checkout_plan() -> Value {
    json!({
      "name": "Checkout",
      "description": "Checkout funnel",
      "events": [{
        "name": "Order Completed",
        "type": "track",
        "description": "An order was placed",
        "additionalProperties": true,
        "properties": [
          { "name": "order_id", "type": "string", "description": "Order", "required": true },
          {
            "name": "total",
            "type": "number",
            "description": "Order total",
            "validation_rules": { "min": 0 }
          }
        ]
      }]
    })
  }

  #[tokio::test]
  async fn event_crud() {
    let app = app().await;

    let (status, created) = send(
      &app,
      Method::POST,
      "/events",
      Some(json!({ "name": "Login", "type": "track", "description": "User logged in" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_owned();
    assert_eq!(created["type"], "track");

    let (status, fetched) = send(&app, Method::GET, &format!("/events/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Login");

    let (status, updated) = send(
      &app,
      Method::PUT,
      &format!("/events/{id}"),
      Some(json!({ "description": "Signed in" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["description"], "Signed in");

    let (status, _) = send(&app, Method::DELETE, &format!("/events/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::GET, &format!("/events/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
  }

  #[tokio::test]
  async fn duplicate_event_is_409_unique_constraint() {
    let app = app().await;
    let body = json!({ "name": "Login", "type": "track", "description": "A" });
    send(&app, Method::POST, "/events", Some(body.clone())).await;

    let (status, err) = send(&app, Method::POST, "/events", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"]["code"], "UNIQUE_CONSTRAINT");
    assert_eq!(
      err["error"]["message"],
      "Event 'Login' of type 'track' already exists"
    );
  }

  #[tokio::test]
  async fn invalid_rules_are_422() {
    let app = app().await;
    let (status, err) = send(
      &app,
      Method::POST,
      "/properties",
      Some(json!({
        "name": "sku",
        "type": "string",
        "description": "SKU",
        "validation_rules": { "min": "invalid" }
      })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["error"]["code"], "VALIDATION_ERROR");
  }

  #[tokio::test]
  async fn malformed_json_is_400() {
    let app = app().await;
    let req = Request::builder()
      .method(Method::POST)
      .uri("/events")
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from("{ not json"))
      .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn unparseable_id_is_400() {
    let app = app().await;
    let (status, err) = send(&app, Method::GET, "/properties/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"]["code"], "BAD_REQUEST");
  }

  #[tokio::test]
  async fn create_and_fetch_tracking_plan() {
    let app = app().await;

    let (status, created) =
      send(&app, Method::POST, "/tracking-plans", Some(checkout_plan())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Checkout");
    let event = &created["events"][0];
    assert_eq!(event["additionalProperties"], true);
    assert_eq!(event["properties"][0]["required"], true);
    assert_eq!(event["properties"][1]["required"], false);
    assert_eq!(event["properties"][1]["validation_rules"], json!({ "min": 0.0 }));

    let id = created["id"].as_str().unwrap();
    let (status, fetched) =
      send(&app, Method::GET, &format!("/tracking-plans/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (_, events) = send(&app, Method::GET, "/events", None).await;
    assert_eq!(events.as_array().unwrap().len(), 1);
    let (_, properties) = send(&app, Method::GET, "/properties", None).await;
    assert_eq!(properties.as_array().unwrap().len(), 2);

    let (_, plans) = send(&app, Method::GET, "/tracking-plans", None).await;
    assert!(plans[0].get("events").is_none());
  }

  #[tokio::test]
  async fn conflicting_plan_is_409_and_writes_nothing() {
    let app = app().await;
    send(
      &app,
      Method::POST,
      "/events",
      Some(json!({ "name": "Order Completed", "type": "track", "description": "Other" })),
    )
    .await;

    let (status, err) =
      send(&app, Method::POST, "/tracking-plans", Some(checkout_plan())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"]["code"], "CONFLICT");
    assert_eq!(
      err["error"]["message"],
      "Event 'Order Completed' of type 'track' already exists with different description"
    );

    let (_, plans) = send(&app, Method::GET, "/tracking-plans", None).await;
    assert_eq!(plans, json!([]));
    let (_, properties) = send(&app, Method::GET, "/properties", None).await;
    assert_eq!(properties, json!([]));
  }

  #[tokio::test]
  async fn update_and_delete_tracking_plan() {
    let app = app().await;
    let (_, created) =
      send(&app, Method::POST, "/tracking-plans", Some(checkout_plan())).await;
    let id = created["id"].as_str().unwrap().to_owned();

    let (status, updated) = send(
      &app,
      Method::PUT,
      &format!("/tracking-plans/{id}"),
      Some(json!({
        "description": "Shorter funnel",
        "events": [{ "name": "Cart Viewed", "type": "page", "description": "Cart" }]
      })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["description"], "Shorter funnel");
    assert_eq!(updated["events"].as_array().unwrap().len(), 1);
    assert_eq!(updated["events"][0]["additionalProperties"], false);

    let (status, _) =
      send(&app, Method::DELETE, &format!("/tracking-plans/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, &format!("/tracking-plans/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let missing = Uuid::new_v4();
    let (status, err) = send(
      &app,
      Method::PUT,
      &format!("/tracking-plans/{missing}"),
      Some(json!({ "name": "Anything" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["error"]["code"], "NOT_FOUND");
  }
}
