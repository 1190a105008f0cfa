//! Tracking plans and the link rows that bind them to events and properties.
//!
//! A plan owns an ordered list of plan-event links; each plan-event link owns
//! an ordered list of event-property links. The relationship flags
//! (`additional_properties`, `required`) live on the links so that the same
//! event or property can play different roles in different plans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
  event::{Event, EventKind, NewEvent},
  property::{NewProperty, Property, PropertyKind},
  rules::ValidationRules,
};

// ─── Plan ────────────────────────────────────────────────────────────────────

/// A persisted tracking plan row. `name` is globally unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingPlan {
  pub id:          Uuid,
  pub name:        String,
  pub description: String,
  pub is_deleted:  bool,
  pub deleted_at:  Option<DateTime<Utc>>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

// ─── Links ───────────────────────────────────────────────────────────────────

/// Binds one event into one plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEventLink {
  pub id:                    Uuid,
  pub plan_id:               Uuid,
  pub event_id:              Uuid,
  /// Whether the event may carry properties the plan does not declare.
  pub additional_properties: bool,
  /// Zero-based position within the plan's event list.
  pub position:              u32,
  pub is_deleted:            bool,
  pub deleted_at:            Option<DateTime<Utc>>,
  pub created_at:            DateTime<Utc>,
}

/// Binds one property to one plan-event link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPropertyLink {
  pub id:            Uuid,
  pub plan_event_id: Uuid,
  pub property_id:   Uuid,
  pub required:      bool,
  /// Zero-based position within the event's property list.
  pub position:      u32,
  pub is_deleted:    bool,
  pub deleted_at:    Option<DateTime<Utc>>,
  pub created_at:    DateTime<Utc>,
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// A property as declared under an event inside a plan submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
  pub name:             String,
  #[serde(rename = "type")]
  pub kind:             PropertyKind,
  pub description:      String,
  #[serde(default)]
  pub required:         bool,
  #[serde(default)]
  pub validation_rules: Option<Value>,
}

impl PropertyDefinition {
  pub fn candidate(&self) -> NewProperty {
    NewProperty {
      name:             self.name.clone(),
      kind:             self.kind,
      description:      self.description.clone(),
      validation_rules: self.validation_rules.clone(),
    }
  }
}

/// An event as declared inside a plan submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDefinition {
  pub name:                  String,
  #[serde(rename = "type")]
  pub kind:                  EventKind,
  pub description:           String,
  #[serde(rename = "additionalProperties", default)]
  pub additional_properties: bool,
  #[serde(default)]
  pub properties:            Vec<PropertyDefinition>,
}

impl EventDefinition {
  pub fn candidate(&self) -> NewEvent {
    NewEvent {
      name:        self.name.clone(),
      kind:        self.kind,
      description: self.description.clone(),
    }
  }
}

/// Input to [`crate::orchestrate::create_tracking_plan`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrackingPlan {
  pub name:        String,
  pub description: String,
  /// Defaults to the store's clock when absent.
  #[serde(default)]
  pub created_at:  Option<DateTime<Utc>>,
  #[serde(default)]
  pub events:      Vec<EventDefinition>,
}

/// Input to [`crate::orchestrate::update_tracking_plan`].
///
/// When `events` is present the plan's links are replaced wholesale.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackingPlanUpdate {
  pub name:        Option<String>,
  pub description: Option<String>,
  pub events:      Option<Vec<EventDefinition>>,
}

// ─── Materialised view ───────────────────────────────────────────────────────

/// A property as it appears inside a plan, with its plan-scoped flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanProperty {
  pub id:               Uuid,
  pub name:             String,
  #[serde(rename = "type")]
  pub kind:             PropertyKind,
  pub description:      String,
  pub required:         bool,
  pub validation_rules: Option<ValidationRules>,
}

impl PlanProperty {
  pub fn new(property: Property, link: &EventPropertyLink) -> Self {
    Self {
      id:               property.id,
      name:             property.name,
      kind:             property.kind,
      description:      property.description,
      required:         link.required,
      validation_rules: property.validation_rules,
    }
  }
}

/// An event as it appears inside a plan, with its plan-scoped flag and
/// properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEvent {
  pub id:                    Uuid,
  pub name:                  String,
  #[serde(rename = "type")]
  pub kind:                  EventKind,
  pub description:           String,
  #[serde(rename = "additionalProperties")]
  pub additional_properties: bool,
  pub properties:            Vec<PlanProperty>,
}

impl PlanEvent {
  pub fn new(event: Event, link: &PlanEventLink) -> Self {
    Self {
      id:                    event.id,
      name:                  event.name,
      kind:                  event.kind,
      description:           event.description,
      additional_properties: link.additional_properties,
      properties:            Vec::new(),
    }
  }
}

/// The read model for a plan — assembled from link rows, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingPlanView {
  #[serde(flatten)]
  pub plan:   TrackingPlan,
  pub events: Vec<PlanEvent>,
}
