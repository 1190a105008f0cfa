//! Events — the named analytics calls a tracking plan expects.
//!
//! An event is identified by its `(name, type)` pair. Rows are shared across
//! every plan that references them and are never hard-deleted.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::resolve::NaturalKey;

/// The analytics call an event is sent through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
  Track,
  Identify,
  Alias,
  Screen,
  Page,
}

impl EventKind {
  /// Must match the `rename_all = "lowercase"` serde tags above.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Track => "track",
      Self::Identify => "identify",
      Self::Alias => "alias",
      Self::Screen => "screen",
      Self::Page => "page",
    }
  }
}

impl fmt::Display for EventKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A persisted event row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
  pub id:          Uuid,
  pub name:        String,
  #[serde(rename = "type")]
  pub kind:        EventKind,
  pub description: String,
  pub is_deleted:  bool,
  pub deleted_at:  Option<DateTime<Utc>>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl Event {
  /// Build a fresh, live row from a candidate definition.
  pub fn create(input: &NewEvent, now: DateTime<Utc>) -> Self {
    Self {
      id:          Uuid::new_v4(),
      name:        input.name.clone(),
      kind:        input.kind,
      description: input.description.clone(),
      is_deleted:  false,
      deleted_at:  None,
      created_at:  now,
      updated_at:  now,
    }
  }

  pub fn key(&self) -> NaturalKey<EventKind> {
    NaturalKey::new(&self.name, self.kind)
  }
}

/// A candidate event definition: the body of a direct create and the input
/// to the event identity resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
  pub name:        String,
  #[serde(rename = "type")]
  pub kind:        EventKind,
  pub description: String,
}

impl NewEvent {
  pub fn key(&self) -> NaturalKey<EventKind> {
    NaturalKey::new(&self.name, self.kind)
  }
}

/// A partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventUpdate {
  pub name:        Option<String>,
  #[serde(rename = "type")]
  pub kind:        Option<EventKind>,
  pub description: Option<String>,
}

impl EventUpdate {
  /// Apply onto `event`, returning whether the natural key changed.
  pub fn apply(self, event: &mut Event, now: DateTime<Utc>) -> bool {
    let before = event.key();
    if let Some(name) = self.name {
      event.name = name;
    }
    if let Some(kind) = self.kind {
      event.kind = kind;
    }
    if let Some(description) = self.description {
      event.description = description;
    }
    event.updated_at = now;
    event.key() != before
  }
}
