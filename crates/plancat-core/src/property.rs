//! Properties — the typed fields an event may carry.
//!
//! Like events, a property is identified by `(name, type)` and shared across
//! every plan and event that references it. Whether a property is required is
//! a fact about the plan, not the property, and lives on the link rows.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{Result, resolve::NaturalKey, rules::ValidationRules};

/// The value type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
  String,
  Number,
  Boolean,
}

impl PropertyKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::String => "string",
      Self::Number => "number",
      Self::Boolean => "boolean",
    }
  }
}

impl fmt::Display for PropertyKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A persisted property row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
  pub id:               Uuid,
  pub name:             String,
  #[serde(rename = "type")]
  pub kind:             PropertyKind,
  pub description:      String,
  pub validation_rules: Option<ValidationRules>,
  pub is_deleted:       bool,
  pub deleted_at:       Option<DateTime<Utc>>,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
}

impl Property {
  /// Validate the candidate's rule set and build a fresh, live row.
  pub fn create(input: &NewProperty, now: DateTime<Utc>) -> Result<Self> {
    let validation_rules = input.checked_rules()?;
    Ok(Self {
      id: Uuid::new_v4(),
      name: input.name.clone(),
      kind: input.kind,
      description: input.description.clone(),
      validation_rules,
      is_deleted: false,
      deleted_at: None,
      created_at: now,
      updated_at: now,
    })
  }

  pub fn key(&self) -> NaturalKey<PropertyKind> {
    NaturalKey::new(&self.name, self.kind)
  }
}

/// A candidate property definition.
///
/// `validation_rules` is kept as raw JSON until the property is actually
/// created; reusing an existing property only compares it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProperty {
  pub name:             String,
  #[serde(rename = "type")]
  pub kind:             PropertyKind,
  pub description:      String,
  #[serde(default)]
  pub validation_rules: Option<Value>,
}

impl NewProperty {
  pub fn key(&self) -> NaturalKey<PropertyKind> {
    NaturalKey::new(&self.name, self.kind)
  }

  /// Parse and validate the raw rule set for this property's type.
  pub fn checked_rules(&self) -> Result<Option<ValidationRules>> {
    let rules = ValidationRules::from_json(self.validation_rules.as_ref())?;
    if let Some(rules) = &rules {
      rules.validate(self.kind)?;
    }
    Ok(rules)
  }
}

/// A partial update; absent fields keep their stored value.
///
/// `validation_rules` distinguishes an absent field (keep) from an explicit
/// `null` (clear).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyUpdate {
  pub name:             Option<String>,
  #[serde(rename = "type")]
  pub kind:             Option<PropertyKind>,
  pub description:      Option<String>,
  #[serde(default, deserialize_with = "present")]
  pub validation_rules: Option<Option<Value>>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<Value>>, D::Error>
where
  D: Deserializer<'de>,
{
  Option::<Value>::deserialize(deserializer).map(Some)
}

impl PropertyUpdate {
  /// Apply onto `property`, returning whether the natural key changed.
  ///
  /// The resulting rule set is re-validated whenever the rules or the type
  /// change.
  pub fn apply(self, property: &mut Property, now: DateTime<Utc>) -> Result<bool> {
    let before = property.key();
    let retype = self.kind.is_some_and(|k| k != property.kind);

    if let Some(name) = self.name {
      property.name = name;
    }
    if let Some(kind) = self.kind {
      property.kind = kind;
    }
    if let Some(description) = self.description {
      property.description = description;
    }
    match self.validation_rules {
      Some(raw) => {
        property.validation_rules = ValidationRules::from_json(raw.as_ref())?;
        if let Some(rules) = &property.validation_rules {
          rules.validate(property.kind)?;
        }
      }
      None if retype => {
        if let Some(rules) = &property.validation_rules {
          rules.validate(property.kind)?;
        }
      }
      None => {}
    }
    property.updated_at = now;
    Ok(property.key() != before)
  }
}
