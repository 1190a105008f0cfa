//! Handlers for `/tracking-plans` endpoints.
//!
//! Creating or updating a plan with nested events auto-creates every event
//! and property that does not exist yet and reuses those that match
//! exactly. A mismatch aborts the whole request with `409 CONFLICT`.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use plancat_core::{
  EntityKind,
  plan::{NewTrackingPlan, TrackingPlan, TrackingPlanUpdate, TrackingPlanView},
  store::CatalogStore,
};
use uuid::Uuid;

use crate::{
  error::ApiError,
  extract::{ApiJson, ApiPath},
};

/// `GET /tracking-plans` — plan rows only, without nested events.
pub async fn list<S: CatalogStore>(
  State(store): State<Arc<S>>,
) -> Result<ApiJson<Vec<TrackingPlan>>, ApiError> {
  let plans = store.list_tracking_plans().await.map_err(ApiError::from_store)?;
  Ok(ApiJson(plans))
}

/// `POST /tracking-plans`
pub async fn create<S: CatalogStore>(
  State(store): State<Arc<S>>,
  ApiJson(body): ApiJson<NewTrackingPlan>,
) -> Result<impl IntoResponse, ApiError> {
  let view = store
    .create_tracking_plan(body)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, ApiJson(view)))
}

/// `GET /tracking-plans/{id}`
pub async fn get_one<S: CatalogStore>(
  State(store): State<Arc<S>>,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiJson<TrackingPlanView>, ApiError> {
  let view = store
    .get_tracking_plan(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or(plancat_core::Error::NotFound { entity: EntityKind::TrackingPlan, id })?;
  Ok(ApiJson(view))
}

/// `PUT /tracking-plans/{id}` — an `events` array replaces every link.
pub async fn update<S: CatalogStore>(
  State(store): State<Arc<S>>,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<TrackingPlanUpdate>,
) -> Result<ApiJson<TrackingPlanView>, ApiError> {
  let view = store
    .update_tracking_plan(id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok(ApiJson(view))
}

/// `DELETE /tracking-plans/{id}`
pub async fn delete<S: CatalogStore>(
  State(store): State<Arc<S>>,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
  store.delete_tracking_plan(id).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}
