//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, UUIDs as hyphenated lowercase
//! strings, and validation rules as compact JSON.

use chrono::{DateTime, Utc};
use plancat_core::{
  event::{Event, EventKind},
  plan::{EventPropertyLink, PlanEventLink, TrackingPlan},
  property::{Property, PropertyKind},
  rules::ValidationRules,
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Kinds ───────────────────────────────────────────────────────────────────

pub fn decode_event_kind(s: &str) -> Result<EventKind> {
  match s {
    "track" => Ok(EventKind::Track),
    "identify" => Ok(EventKind::Identify),
    "alias" => Ok(EventKind::Alias),
    "screen" => Ok(EventKind::Screen),
    "page" => Ok(EventKind::Page),
    other => Err(Error::UnknownVariant { column: "event_type", value: other.to_owned() }),
  }
}

pub fn decode_property_kind(s: &str) -> Result<PropertyKind> {
  match s {
    "string" => Ok(PropertyKind::String),
    "number" => Ok(PropertyKind::Number),
    "boolean" => Ok(PropertyKind::Boolean),
    other => Err(Error::UnknownVariant {
      column: "property_type",
      value:  other.to_owned(),
    }),
  }
}

// ─── Validation rules ────────────────────────────────────────────────────────

/// Empty rule sets are stored as `NULL`.
pub fn encode_rules(rules: Option<&ValidationRules>) -> Result<Option<String>> {
  Ok(match rules.filter(|r| !r.is_empty()) {
    Some(rules) => Some(serde_json::to_string(rules)?),
    None => None,
  })
}

pub fn decode_rules(s: Option<&str>) -> Result<Option<ValidationRules>> {
  let rules = s.map(serde_json::from_str::<ValidationRules>).transpose()?;
  Ok(ValidationRules::normalize(rules))
}

// ─── Positions ───────────────────────────────────────────────────────────────

fn decode_position(value: i64) -> Result<u32> {
  u32::try_from(value).map_err(|_| Error::OutOfRange { column: "position", value })
}

// ─── Row types ───────────────────────────────────────────────────────────────
//
// Each `read` takes the column offset the row type starts at, so joined
// queries can decode several row types from one result row.

pub const EVENT_COLUMNS: &str =
  "event_id, name, event_type, description, is_deleted, deleted_at, created_at, updated_at";

/// Raw values read directly from an `events` row.
pub struct RawEvent {
  pub event_id:    String,
  pub name:        String,
  pub event_type:  String,
  pub description: String,
  pub is_deleted:  bool,
  pub deleted_at:  Option<String>,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawEvent {
  pub fn read(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:    row.get(at)?,
      name:        row.get(at + 1)?,
      event_type:  row.get(at + 2)?,
      description: row.get(at + 3)?,
      is_deleted:  row.get(at + 4)?,
      deleted_at:  row.get(at + 5)?,
      created_at:  row.get(at + 6)?,
      updated_at:  row.get(at + 7)?,
    })
  }

  pub fn into_event(self) -> Result<Event> {
    Ok(Event {
      id:          decode_uuid(&self.event_id)?,
      name:        self.name,
      kind:        decode_event_kind(&self.event_type)?,
      description: self.description,
      is_deleted:  self.is_deleted,
      deleted_at:  decode_opt_dt(self.deleted_at)?,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

pub const PROPERTY_COLUMNS: &str = "property_id, name, property_type, description, \
   validation_rules, is_deleted, deleted_at, created_at, updated_at";

/// Raw values read directly from a `properties` row.
pub struct RawProperty {
  pub property_id:      String,
  pub name:             String,
  pub property_type:    String,
  pub description:      String,
  pub validation_rules: Option<String>,
  pub is_deleted:       bool,
  pub deleted_at:       Option<String>,
  pub created_at:       String,
  pub updated_at:       String,
}

impl RawProperty {
  pub fn read(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      property_id:      row.get(at)?,
      name:             row.get(at + 1)?,
      property_type:    row.get(at + 2)?,
      description:      row.get(at + 3)?,
      validation_rules: row.get(at + 4)?,
      is_deleted:       row.get(at + 5)?,
      deleted_at:       row.get(at + 6)?,
      created_at:       row.get(at + 7)?,
      updated_at:       row.get(at + 8)?,
    })
  }

  pub fn into_property(self) -> Result<Property> {
    Ok(Property {
      id:               decode_uuid(&self.property_id)?,
      name:             self.name,
      kind:             decode_property_kind(&self.property_type)?,
      description:      self.description,
      validation_rules: decode_rules(self.validation_rules.as_deref())?,
      is_deleted:       self.is_deleted,
      deleted_at:       decode_opt_dt(self.deleted_at)?,
      created_at:       decode_dt(&self.created_at)?,
      updated_at:       decode_dt(&self.updated_at)?,
    })
  }
}

pub const PLAN_COLUMNS: &str =
  "plan_id, name, description, is_deleted, deleted_at, created_at, updated_at";

/// Raw values read directly from a `tracking_plans` row.
pub struct RawPlan {
  pub plan_id:     String,
  pub name:        String,
  pub description: String,
  pub is_deleted:  bool,
  pub deleted_at:  Option<String>,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawPlan {
  pub fn read(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      plan_id:     row.get(at)?,
      name:        row.get(at + 1)?,
      description: row.get(at + 2)?,
      is_deleted:  row.get(at + 3)?,
      deleted_at:  row.get(at + 4)?,
      created_at:  row.get(at + 5)?,
      updated_at:  row.get(at + 6)?,
    })
  }

  pub fn into_plan(self) -> Result<TrackingPlan> {
    Ok(TrackingPlan {
      id:          decode_uuid(&self.plan_id)?,
      name:        self.name,
      description: self.description,
      is_deleted:  self.is_deleted,
      deleted_at:  decode_opt_dt(self.deleted_at)?,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from a `plan_events` row (8 columns).
pub struct RawPlanEventLink {
  pub link_id:               String,
  pub plan_id:               String,
  pub event_id:              String,
  pub additional_properties: bool,
  pub position:              i64,
  pub is_deleted:            bool,
  pub deleted_at:            Option<String>,
  pub created_at:            String,
}

impl RawPlanEventLink {
  pub fn read(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      link_id:               row.get(at)?,
      plan_id:               row.get(at + 1)?,
      event_id:              row.get(at + 2)?,
      additional_properties: row.get(at + 3)?,
      position:              row.get(at + 4)?,
      is_deleted:            row.get(at + 5)?,
      deleted_at:            row.get(at + 6)?,
      created_at:            row.get(at + 7)?,
    })
  }

  pub fn into_link(self) -> Result<PlanEventLink> {
    Ok(PlanEventLink {
      id:                    decode_uuid(&self.link_id)?,
      plan_id:               decode_uuid(&self.plan_id)?,
      event_id:              decode_uuid(&self.event_id)?,
      additional_properties: self.additional_properties,
      position:              decode_position(self.position)?,
      is_deleted:            self.is_deleted,
      deleted_at:            decode_opt_dt(self.deleted_at)?,
      created_at:            decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from an `event_properties` row (8 columns).
pub struct RawEventPropertyLink {
  pub link_id:       String,
  pub plan_event_id: String,
  pub property_id:   String,
  pub required:      bool,
  pub position:      i64,
  pub is_deleted:    bool,
  pub deleted_at:    Option<String>,
  pub created_at:    String,
}

impl RawEventPropertyLink {
  pub fn read(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      link_id:       row.get(at)?,
      plan_event_id: row.get(at + 1)?,
      property_id:   row.get(at + 2)?,
      required:      row.get(at + 3)?,
      position:      row.get(at + 4)?,
      is_deleted:    row.get(at + 5)?,
      deleted_at:    row.get(at + 6)?,
      created_at:    row.get(at + 7)?,
    })
  }

  pub fn into_link(self) -> Result<EventPropertyLink> {
    Ok(EventPropertyLink {
      id:            decode_uuid(&self.link_id)?,
      plan_event_id: decode_uuid(&self.plan_event_id)?,
      property_id:   decode_uuid(&self.property_id)?,
      required:      self.required,
      position:      decode_position(self.position)?,
      is_deleted:    self.is_deleted,
      deleted_at:    decode_opt_dt(self.deleted_at)?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}
