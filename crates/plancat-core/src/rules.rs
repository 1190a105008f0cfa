//! Property validation rules.
//!
//! Rule sets arrive as untyped JSON and are parsed into [`ValidationRules`], a
//! fixed record of optional typed fields. An absent rule set, a JSON `null`,
//! and an object with no fields all normalise to `None`, so comparisons never
//! distinguish between them.

use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result, property::PropertyKind};

/// The value constraints attached to a property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRules {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub regex:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub min:     Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max:     Option<f64>,
  /// Allowed values.
  #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
  pub allowed: Option<Vec<String>>,
  /// Identifier of an externally defined rule.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub custom:  Option<String>,
}

impl ValidationRules {
  pub fn is_empty(&self) -> bool {
    self.regex.is_none()
      && self.min.is_none()
      && self.max.is_none()
      && self.allowed.is_none()
      && self.custom.is_none()
  }

  /// Collapse an empty rule set to `None`.
  pub fn normalize(rules: Option<Self>) -> Option<Self> {
    rules.filter(|r| !r.is_empty())
  }

  /// Parse a raw rule set, checking the type of every field.
  ///
  /// Returns `Ok(None)` for an absent, `null` or empty rule set.
  pub fn from_json(raw: Option<&Value>) -> Result<Option<Self>> {
    let object = match raw {
      None | Some(Value::Null) => return Ok(None),
      Some(Value::Object(object)) => object,
      Some(_) => {
        return Err(Error::Validation(
          "validation rules must be an object".to_owned(),
        ));
      }
    };

    let rules = Self {
      regex:   string_field(object, "regex")?,
      min:     number_field(object, "min")?,
      max:     number_field(object, "max")?,
      allowed: sequence_field(object, "enum")?,
      custom:  string_field(object, "custom")?,
    };

    if let Some(unknown) = object
      .keys()
      .find(|k| !matches!(k.as_str(), "regex" | "min" | "max" | "enum" | "custom"))
    {
      return Err(Error::Validation(format!("unknown rule {unknown:?}")));
    }

    Ok(Self::normalize(Some(rules)))
  }

  /// Check the rule set against the declared property type. Only called
  /// before a new property is inserted.
  pub fn validate(&self, kind: PropertyKind) -> Result<()> {
    if let Some(pattern) = &self.regex {
      Regex::new(pattern).map_err(|e| {
        Error::Validation(format!("regex {pattern:?} does not compile: {e}"))
      })?;
    }

    match kind {
      PropertyKind::String | PropertyKind::Number => {
        if let (Some(min), Some(max)) = (self.min, self.max)
          && min > max
        {
          return Err(Error::Validation(format!(
            "min ({min}) is greater than max ({max}) for a {kind} property"
          )));
        }
      }
      PropertyKind::Boolean => {}
    }

    Ok(())
  }
}

// Missing and `null` fields are both treated as unset.

fn string_field(object: &Map<String, Value>, key: &str) -> Result<Option<String>> {
  match object.get(key) {
    None | Some(Value::Null) => Ok(None),
    Some(Value::String(s)) => Ok(Some(s.clone())),
    Some(other) => Err(Error::Validation(format!(
      "{key} must be a string, got {other}"
    ))),
  }
}

fn number_field(object: &Map<String, Value>, key: &str) -> Result<Option<f64>> {
  match object.get(key) {
    None | Some(Value::Null) => Ok(None),
    Some(Value::Number(n)) => n
      .as_f64()
      .map(Some)
      .ok_or_else(|| Error::Validation(format!("{key} is out of range"))),
    Some(other) => Err(Error::Validation(format!(
      "{key} must be numeric, got {other}"
    ))),
  }
}

fn sequence_field(
  object: &Map<String, Value>,
  key: &str,
) -> Result<Option<Vec<String>>> {
  match object.get(key) {
    None | Some(Value::Null) => Ok(None),
    Some(Value::Array(items)) => items
      .iter()
      .map(|item| match item {
        Value::String(s) => Ok(s.clone()),
        other => Err(Error::Validation(format!(
          "{key} must contain only strings, got {other}"
        ))),
      })
      .collect::<Result<Vec<_>>>()
      .map(Some),
    Some(other) => Err(Error::Validation(format!(
      "{key} must be a sequence, got {other}"
    ))),
  }
}
