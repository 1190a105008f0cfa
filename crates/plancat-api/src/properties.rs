//! Handlers for `/properties` endpoints.
//!
//! | Method   | Path               | Notes |
//! |----------|--------------------|-------|
//! | `GET`    | `/properties`      | Live properties ordered by name, then type |
//! | `POST`   | `/properties`      | Body: `{"name","type","description","validation_rules"?}` |
//! | `GET`    | `/properties/{id}` | 404 if missing or deleted |
//! | `PUT`    | `/properties/{id}` | Partial update; `"validation_rules": null` clears the rules |
//! | `DELETE` | `/properties/{id}` | Soft delete; 204 |

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use plancat_core::{
  EntityKind,
  property::{NewProperty, Property, PropertyUpdate},
  store::CatalogStore,
};
use uuid::Uuid;

use crate::{
  error::ApiError,
  extract::{ApiJson, ApiPath},
};

/// `GET /properties`
pub async fn list<S: CatalogStore>(
  State(store): State<Arc<S>>,
) -> Result<ApiJson<Vec<Property>>, ApiError> {
  let properties = store.list_properties().await.map_err(ApiError::from_store)?;
  Ok(ApiJson(properties))
}

/// `POST /properties`
pub async fn create<S: CatalogStore>(
  State(store): State<Arc<S>>,
  ApiJson(body): ApiJson<NewProperty>,
) -> Result<impl IntoResponse, ApiError> {
  let property = store.create_property(body).await.map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, ApiJson(property)))
}

/// `GET /properties/{id}`
pub async fn get_one<S: CatalogStore>(
  State(store): State<Arc<S>>,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiJson<Property>, ApiError> {
  let property = store
    .get_property(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or(plancat_core::Error::NotFound { entity: EntityKind::Property, id })?;
  Ok(ApiJson(property))
}

/// `PUT /properties/{id}`
pub async fn update<S: CatalogStore>(
  State(store): State<Arc<S>>,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<PropertyUpdate>,
) -> Result<ApiJson<Property>, ApiError> {
  let property = store
    .update_property(id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok(ApiJson(property))
}

/// `DELETE /properties/{id}`
pub async fn delete<S: CatalogStore>(
  State(store): State<Arc<S>>,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
  store.delete_property(id).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}
