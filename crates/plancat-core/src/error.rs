//! Error types for `plancat-core`.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// The catalog entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
  Event,
  Property,
  TrackingPlan,
}

impl fmt::Display for EntityKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Event => "Event",
      Self::Property => "Property",
      Self::TrackingPlan => "Tracking plan",
    })
  }
}

/// The comparable attribute category that made a candidate differ from the
/// stored entity sharing its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difference {
  Description,
  ValidationRules,
}

impl fmt::Display for Difference {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Description => "different description",
      Self::ValidationRules => "different validation rules",
    })
  }
}

#[derive(Debug, Error)]
pub enum Error {
  /// The identity is already taken by a live row.
  #[error("{0}")]
  UniqueConstraint(String),

  /// A live row shares the candidate's identity but not its attributes.
  #[error("{entity} '{name}' of type '{kind}' already exists with {difference}")]
  Conflict {
    entity:     EntityKind,
    name:       String,
    kind:       String,
    difference: Difference,
  },

  #[error("invalid validation rules: {0}")]
  Validation(String),

  #[error("{entity} not found: {id}")]
  NotFound { entity: EntityKind, id: Uuid },

  /// A submitted list is longer than a link position can address.
  #[error("list entry {index} is beyond the last storable position")]
  PositionOverflow { index: usize },
}

impl Error {
  /// "`<entity> '<name>' of type '<kind>' already exists`", or without the
  /// type clause for tracking plans.
  pub fn already_exists(entity: EntityKind, name: &str, kind: Option<&str>) -> Self {
    match kind {
      Some(kind) => Self::UniqueConstraint(format!(
        "{entity} '{name}' of type '{kind}' already exists"
      )),
      None => Self::UniqueConstraint(format!("{entity} '{name}' already exists")),
    }
  }

  /// The stable, machine-checkable code reported to API callers.
  pub fn code(&self) -> &'static str {
    match self {
      Self::UniqueConstraint(_) => "UNIQUE_CONSTRAINT",
      Self::Conflict { .. } => "CONFLICT",
      Self::Validation(_) => "VALIDATION_ERROR",
      Self::NotFound { .. } => "NOT_FOUND",
      Self::PositionOverflow { .. } => "VALIDATION_ERROR",
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
