//! Repository, unit-of-work, and service traits.
//!
//! Two layers live here:
//!
//! - The synchronous repository traits ([`EventRepository`] and friends) are
//!   implemented by a backend's transaction handle. Every call made through
//!   one handle belongs to the same unit of work, which is committed or rolled
//!   back as a whole.
//! - [`CatalogStore`] is the async service surface the API layer depends on.
//!   A backend implements it by opening a unit of work and delegating to
//!   [`crate::catalog`] and [`crate::orchestrate`].

use std::future::Future;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::{
  event::{Event, EventKind, EventUpdate, NewEvent},
  plan::{
    EventPropertyLink, NewTrackingPlan, PlanEventLink, TrackingPlan,
    TrackingPlanUpdate, TrackingPlanView,
  },
  property::{NewProperty, Property, PropertyKind, PropertyUpdate},
  resolve::NaturalKey,
};

// ─── Unit of work ────────────────────────────────────────────────────────────

/// A single open transaction.
///
/// Dropping a unit of work without calling [`UnitOfWork::commit`] must roll
/// it back.
pub trait UnitOfWork {
  type Error: std::error::Error + From<crate::Error>;

  fn commit(self) -> Result<(), Self::Error>
  where
    Self: Sized;

  fn rollback(self) -> Result<(), Self::Error>
  where
    Self: Sized;

  /// Commit if `outcome` succeeded, roll back otherwise, and hand the outcome
  /// back to the caller.
  fn finish<T>(self, outcome: Result<T, Self::Error>) -> Result<T, Self::Error>
  where
    Self: Sized,
  {
    match outcome {
      Ok(value) => {
        self.commit()?;
        Ok(value)
      }
      Err(error) => {
        warn!(%error, "rolling back unit of work");
        if let Err(rollback) = self.rollback() {
          warn!(error = %rollback, "rollback failed");
        }
        Err(error)
      }
    }
  }
}

// ─── Repositories ────────────────────────────────────────────────────────────
//
// All `find_*` methods ignore soft-deleted rows.

pub trait EventRepository: UnitOfWork {
  fn find_event(&self, id: Uuid) -> Result<Option<Event>, Self::Error>;

  fn find_event_by_key(
    &self,
    key: &NaturalKey<EventKind>,
  ) -> Result<Option<Event>, Self::Error>;

  fn find_event_by_key_excluding(
    &self,
    key: &NaturalKey<EventKind>,
    exclude: Uuid,
  ) -> Result<Option<Event>, Self::Error>;

  fn list_events(&self) -> Result<Vec<Event>, Self::Error>;

  fn insert_event(&self, event: &Event) -> Result<(), Self::Error>;

  fn update_event(&self, event: &Event) -> Result<(), Self::Error>;

  /// Returns `false` if no live row had this id.
  fn soft_delete_event(
    &self,
    id: Uuid,
    at: DateTime<Utc>,
  ) -> Result<bool, Self::Error>;
}

pub trait PropertyRepository: UnitOfWork {
  fn find_property(&self, id: Uuid) -> Result<Option<Property>, Self::Error>;

  fn find_property_by_key(
    &self,
    key: &NaturalKey<PropertyKind>,
  ) -> Result<Option<Property>, Self::Error>;

  fn find_property_by_key_excluding(
    &self,
    key: &NaturalKey<PropertyKind>,
    exclude: Uuid,
  ) -> Result<Option<Property>, Self::Error>;

  fn list_properties(&self) -> Result<Vec<Property>, Self::Error>;

  fn insert_property(&self, property: &Property) -> Result<(), Self::Error>;

  fn update_property(&self, property: &Property) -> Result<(), Self::Error>;

  fn soft_delete_property(
    &self,
    id: Uuid,
    at: DateTime<Utc>,
  ) -> Result<bool, Self::Error>;
}

pub trait TrackingPlanRepository: UnitOfWork {
  fn find_plan(&self, id: Uuid) -> Result<Option<TrackingPlan>, Self::Error>;

  fn find_plan_by_name(
    &self,
    name: &str,
  ) -> Result<Option<TrackingPlan>, Self::Error>;

  fn find_plan_by_name_excluding(
    &self,
    name: &str,
    exclude: Uuid,
  ) -> Result<Option<TrackingPlan>, Self::Error>;

  fn list_plans(&self) -> Result<Vec<TrackingPlan>, Self::Error>;

  fn insert_plan(&self, plan: &TrackingPlan) -> Result<(), Self::Error>;

  fn update_plan(&self, plan: &TrackingPlan) -> Result<(), Self::Error>;

  fn soft_delete_plan(
    &self,
    id: Uuid,
    at: DateTime<Utc>,
  ) -> Result<bool, Self::Error>;
}

/// Persistence for the two join tables.
pub trait LinkRepository: UnitOfWork {
  fn insert_plan_event(&self, link: &PlanEventLink) -> Result<(), Self::Error>;

  fn insert_event_property(
    &self,
    link: &EventPropertyLink,
  ) -> Result<(), Self::Error>;

  /// Live plan-event links of a plan, in position order, each joined to its
  /// live event.
  fn list_plan_events(
    &self,
    plan_id: Uuid,
  ) -> Result<Vec<(PlanEventLink, Event)>, Self::Error>;

  /// Live event-property links under a plan-event link, in position order,
  /// each joined to its live property.
  fn list_event_properties(
    &self,
    plan_event_id: Uuid,
  ) -> Result<Vec<(EventPropertyLink, Property)>, Self::Error>;

  /// Soft-delete every live plan-event link of a plan and every live
  /// event-property link beneath them.
  fn soft_delete_plan_links(
    &self,
    plan_id: Uuid,
    at: DateTime<Utc>,
  ) -> Result<(), Self::Error>;
}

/// Everything the catalog services need from one unit of work.
pub trait Catalog:
  EventRepository + PropertyRepository + TrackingPlanRepository + LinkRepository
{
}

impl<T> Catalog for T where
  T: EventRepository + PropertyRepository + TrackingPlanRepository + LinkRepository
{
}

// ─── Error classification ────────────────────────────────────────────────────

/// Lets callers recover the domain error inside a backend-specific error.
pub trait DomainError {
  /// `None` for infrastructure failures.
  fn domain(&self) -> Option<&crate::Error>;
}

impl DomainError for crate::Error {
  fn domain(&self) -> Option<&crate::Error> { Some(self) }
}

// ─── Service trait ───────────────────────────────────────────────────────────

/// Abstraction over a plancat catalog backend.
///
/// Every method runs as one transaction. All methods return `Send` futures so
/// the trait can be used from axum handlers on a multi-threaded runtime.
pub trait CatalogStore: Send + Sync {
  type Error: std::error::Error + DomainError + Send + Sync + 'static;

  // ── Events ────────────────────────────────────────────────────────────

  /// Fails with `UniqueConstraint` if a live event has the same name and type.
  fn create_event(
    &self,
    input: NewEvent,
  ) -> impl Future<Output = Result<Event, Self::Error>> + Send + '_;

  /// Returns `None` for missing and soft-deleted events.
  fn get_event(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Event>, Self::Error>> + Send + '_;

  fn list_events(
    &self,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + '_;

  fn update_event(
    &self,
    id: Uuid,
    update: EventUpdate,
  ) -> impl Future<Output = Result<Event, Self::Error>> + Send + '_;

  fn delete_event(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Properties ────────────────────────────────────────────────────────

  /// Validates the rule set, then fails with `UniqueConstraint` if a live
  /// property has the same name and type.
  fn create_property(
    &self,
    input: NewProperty,
  ) -> impl Future<Output = Result<Property, Self::Error>> + Send + '_;

  fn get_property(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Property>, Self::Error>> + Send + '_;

  fn list_properties(
    &self,
  ) -> impl Future<Output = Result<Vec<Property>, Self::Error>> + Send + '_;

  fn update_property(
    &self,
    id: Uuid,
    update: PropertyUpdate,
  ) -> impl Future<Output = Result<Property, Self::Error>> + Send + '_;

  fn delete_property(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Tracking plans ────────────────────────────────────────────────────

  /// Create a plan, auto-creating or reusing its events and properties.
  /// Nothing is written unless every step succeeds.
  fn create_tracking_plan(
    &self,
    input: NewTrackingPlan,
  ) -> impl Future<Output = Result<TrackingPlanView, Self::Error>> + Send + '_;

  fn get_tracking_plan(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<TrackingPlanView>, Self::Error>> + Send + '_;

  fn list_tracking_plans(
    &self,
  ) -> impl Future<Output = Result<Vec<TrackingPlan>, Self::Error>> + Send + '_;

  fn update_tracking_plan(
    &self,
    id: Uuid,
    update: TrackingPlanUpdate,
  ) -> impl Future<Output = Result<TrackingPlanView, Self::Error>> + Send + '_;

  /// Soft-delete the plan together with all of its links.
  fn delete_tracking_plan(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
