//! Handlers for `/events` endpoints.
//!
//! | Method   | Path           | Notes |
//! |----------|----------------|-------|
//! | `GET`    | `/events`      | Live events ordered by name, then type |
//! | `POST`   | `/events`      | Body: `{"name","type","description"}` |
//! | `GET`    | `/events/{id}` | 404 if missing or deleted |
//! | `PUT`    | `/events/{id}` | Partial update |
//! | `DELETE` | `/events/{id}` | Soft delete; 204 |

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use plancat_core::{
  EntityKind,
  event::{Event, EventUpdate, NewEvent},
  store::CatalogStore,
};
use uuid::Uuid;

use crate::{
  error::ApiError,
  extract::{ApiJson, ApiPath},
};

/// `GET /events`
pub async fn list<S: CatalogStore>(
  State(store): State<Arc<S>>,
) -> Result<ApiJson<Vec<Event>>, ApiError> {
  let events = store.list_events().await.map_err(ApiError::from_store)?;
  Ok(ApiJson(events))
}

/// `POST /events`
pub async fn create<S: CatalogStore>(
  State(store): State<Arc<S>>,
  ApiJson(body): ApiJson<NewEvent>,
) -> Result<impl IntoResponse, ApiError> {
  let event = store.create_event(body).await.map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, ApiJson(event)))
}

/// `GET /events/{id}`
pub async fn get_one<S: CatalogStore>(
  State(store): State<Arc<S>>,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiJson<Event>, ApiError> {
  let event = store
    .get_event(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or(plancat_core::Error::NotFound { entity: EntityKind::Event, id })?;
  Ok(ApiJson(event))
}

/// `PUT /events/{id}`
pub async fn update<S: CatalogStore>(
  State(store): State<Arc<S>>,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<EventUpdate>,
) -> Result<ApiJson<Event>, ApiError> {
  let event = store.update_event(id, body).await.map_err(ApiError::from_store)?;
  Ok(ApiJson(event))
}

/// `DELETE /events/{id}`
pub async fn delete<S: CatalogStore>(
  State(store): State<Arc<S>>,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
  store.delete_event(id).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}
