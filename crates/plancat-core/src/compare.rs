//! Equality-for-reuse between a candidate definition and a stored entity.

use crate::{
  Difference,
  event::{Event, NewEvent},
  property::{NewProperty, Property},
  rules::ValidationRules,
};

/// `None` when the stored event can be reused for `candidate`.
pub fn event_difference(candidate: &NewEvent, existing: &Event) -> Option<Difference> {
  (candidate.description != existing.description).then_some(Difference::Description)
}

/// `None` when the stored property can be reused for `candidate`.
///
/// Descriptions are checked first. Rule sets are compared after both sides
/// are normalised, so an omitted rule set matches a stored `NULL`. A candidate
/// rule set that does not parse can never match a stored one.
pub fn property_difference(
  candidate: &NewProperty,
  existing: &Property,
) -> Option<Difference> {
  if candidate.description != existing.description {
    return Some(Difference::Description);
  }

  let stored = ValidationRules::normalize(existing.validation_rules.clone());
  match ValidationRules::from_json(candidate.validation_rules.as_ref()) {
    Ok(incoming) if incoming == stored => None,
    _ => Some(Difference::ValidationRules),
  }
}
