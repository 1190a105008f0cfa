//! The tracking plan orchestrator.
//!
//! Create and update run as one unit of work:
//!
//! 1. check plan-name uniqueness,
//! 2. write the plan row,
//! 3. for each event in order, resolve it and write its plan-event link,
//! 4. for each of that event's properties in order, resolve it and write its
//!    event-property link,
//! 5. commit, or roll back everything on the first error.
//!
//! One event resolver and one property resolver are shared across the whole
//! operation, so an identity repeated anywhere in the submission resolves to
//! a single row.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::{
  EntityKind, Error,
  event::Event,
  plan::{
    EventDefinition, EventPropertyLink, NewTrackingPlan, PlanEvent, PlanEventLink,
    PlanProperty, TrackingPlan, TrackingPlanUpdate, TrackingPlanView,
  },
  property::Property,
  resolve::IdentityResolver,
  store::Catalog,
};

/// Create a plan together with every event, property and link it declares.
pub fn create_tracking_plan<U: Catalog>(
  uow: U,
  input: NewTrackingPlan,
  now: DateTime<Utc>,
) -> Result<TrackingPlanView, U::Error> {
  let outcome = write_plan(&uow, input, now);
  let view = uow.finish(outcome)?;
  info!(
    plan_id = %view.plan.id, name = %view.plan.name, events = view.events.len(),
    "tracking plan created"
  );
  Ok(view)
}

/// Update a plan's name and description and, when `events` is supplied,
/// replace all of its links.
pub fn update_tracking_plan<U: Catalog>(
  uow: U,
  id: Uuid,
  update: TrackingPlanUpdate,
  now: DateTime<Utc>,
) -> Result<TrackingPlanView, U::Error> {
  let outcome = rewrite_plan(&uow, id, update, now);
  let view = uow.finish(outcome)?;
  info!(plan_id = %view.plan.id, name = %view.plan.name, "tracking plan updated");
  Ok(view)
}

/// Soft-delete a plan and all of its links. Events and properties stay.
pub fn delete_tracking_plan<U: Catalog>(
  uow: U,
  id: Uuid,
  now: DateTime<Utc>,
) -> Result<(), U::Error> {
  let outcome = match uow.soft_delete_plan(id, now) {
    Ok(true) => uow.soft_delete_plan_links(id, now),
    Ok(false) => Err(Error::NotFound { entity: EntityKind::TrackingPlan, id }.into()),
    Err(error) => Err(error),
  };
  uow.finish(outcome)?;
  info!(plan_id = %id, "tracking plan deleted");
  Ok(())
}

/// Materialise a live plan. Returns `None` for missing or deleted plans.
pub fn load_tracking_plan<U: Catalog>(
  uow: &U,
  id: Uuid,
) -> Result<Option<TrackingPlanView>, U::Error> {
  let Some(plan) = uow.find_plan(id)? else {
    return Ok(None);
  };
  let events = load_events(uow, id)?;
  Ok(Some(TrackingPlanView { plan, events }))
}

// ─── Steps ───────────────────────────────────────────────────────────────────

fn write_plan<U: Catalog>(
  uow: &U,
  input: NewTrackingPlan,
  now: DateTime<Utc>,
) -> Result<TrackingPlanView, U::Error> {
  if uow.find_plan_by_name(&input.name)?.is_some() {
    return Err(
      Error::already_exists(EntityKind::TrackingPlan, &input.name, None).into(),
    );
  }

  let created_at = input.created_at.unwrap_or(now);
  let plan = TrackingPlan {
    id: Uuid::new_v4(),
    name: input.name,
    description: input.description,
    is_deleted: false,
    deleted_at: None,
    created_at,
    updated_at: created_at,
  };
  uow.insert_plan(&plan)?;

  let events = write_events(uow, plan.id, &input.events, now)?;
  Ok(TrackingPlanView { plan, events })
}

fn rewrite_plan<U: Catalog>(
  uow: &U,
  id: Uuid,
  update: TrackingPlanUpdate,
  now: DateTime<Utc>,
) -> Result<TrackingPlanView, U::Error> {
  let mut plan = uow
    .find_plan(id)?
    .ok_or(Error::NotFound { entity: EntityKind::TrackingPlan, id })?;

  if let Some(name) = update.name {
    if uow.find_plan_by_name_excluding(&name, id)?.is_some() {
      return Err(Error::already_exists(EntityKind::TrackingPlan, &name, None).into());
    }
    plan.name = name;
  }
  if let Some(description) = update.description {
    plan.description = description;
  }
  plan.updated_at = now;
  uow.update_plan(&plan)?;

  let events = match update.events {
    Some(definitions) => {
      uow.soft_delete_plan_links(id, now)?;
      write_events(uow, id, &definitions, now)?
    }
    None => load_events(uow, id)?,
  };

  Ok(TrackingPlanView { plan, events })
}

fn write_events<U: Catalog>(
  uow: &U,
  plan_id: Uuid,
  definitions: &[EventDefinition],
  now: DateTime<Utc>,
) -> Result<Vec<PlanEvent>, U::Error> {
  let mut events = IdentityResolver::<Event>::new(now);
  let mut properties = IdentityResolver::<Property>::new(now);
  let mut linked_events = HashSet::new();
  let mut written = Vec::with_capacity(definitions.len());

  for (position, definition) in definitions.iter().enumerate() {
    let event = events.resolve(uow, &definition.candidate())?;
    if !linked_events.insert(event.id) {
      return Err(Error::UniqueConstraint(format!(
        "Event '{}' of type '{}' is listed more than once in the plan",
        event.name, event.kind
      ))
      .into());
    }

    let plan_event_link = PlanEventLink {
      id: Uuid::new_v4(),
      plan_id,
      event_id: event.id,
      additional_properties: definition.additional_properties,
      position: link_position(position)?,
      is_deleted: false,
      deleted_at: None,
      created_at: now,
    };
    uow.insert_plan_event(&plan_event_link)?;

    let mut plan_event = PlanEvent::new(event, &plan_event_link);
    let mut linked_properties = HashSet::new();

    for (position, property_definition) in definition.properties.iter().enumerate() {
      let property = properties.resolve(uow, &property_definition.candidate())?;
      if !linked_properties.insert(property.id) {
        return Err(Error::UniqueConstraint(format!(
          "Property '{}' of type '{}' is listed more than once under event '{}'",
          property.name, property.kind, plan_event.name
        ))
        .into());
      }

      let link = EventPropertyLink {
        id: Uuid::new_v4(),
        plan_event_id: plan_event_link.id,
        property_id: property.id,
        required: property_definition.required,
        position: link_position(position)?,
        is_deleted: false,
        deleted_at: None,
        created_at: now,
      };
      uow.insert_event_property(&link)?;
      plan_event.properties.push(PlanProperty::new(property, &link));
    }

    written.push(plan_event);
  }

  Ok(written)
}

fn load_events<U: Catalog>(uow: &U, plan_id: Uuid) -> Result<Vec<PlanEvent>, U::Error> {
  uow
    .list_plan_events(plan_id)?
    .into_iter()
    .map(|(link, event)| -> Result<PlanEvent, U::Error> {
      let mut plan_event = PlanEvent::new(event, &link);
      plan_event.properties = uow
        .list_event_properties(link.id)?
        .into_iter()
        .map(|(link, property)| PlanProperty::new(property, &link))
        .collect();
      Ok(plan_event)
    })
    .collect()
}

fn link_position(index: usize) -> Result<u32, Error> {
  u32::try_from(index).map_err(|_| Error::PositionOverflow { index })
}
