//! Single-entity services for events and properties.
//!
//! Each function consumes a unit of work and commits it on success.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::{
  EntityKind, Error,
  event::{Event, EventUpdate, NewEvent},
  property::{NewProperty, Property, PropertyUpdate},
  store::Catalog,
};

// ─── Events ──────────────────────────────────────────────────────────────────

pub fn create_event<U: Catalog>(
  uow: U,
  input: NewEvent,
  now: DateTime<Utc>,
) -> Result<Event, U::Error> {
  let outcome = (|| -> Result<Event, U::Error> {
    if uow.find_event_by_key(&input.key())?.is_some() {
      return Err(event_exists(&input.name, &input.kind.to_string()));
    }
    let event = Event::create(&input, now);
    uow.insert_event(&event)?;
    Ok(event)
  })();
  let event = uow.finish(outcome)?;
  info!(event_id = %event.id, name = %event.name, kind = %event.kind, "event created");
  Ok(event)
}

pub fn update_event<U: Catalog>(
  uow: U,
  id: Uuid,
  update: EventUpdate,
  now: DateTime<Utc>,
) -> Result<Event, U::Error> {
  let outcome = (|| -> Result<Event, U::Error> {
    let mut event = uow
      .find_event(id)?
      .ok_or(Error::NotFound { entity: EntityKind::Event, id })?;
    if update.apply(&mut event, now)
      && uow.find_event_by_key_excluding(&event.key(), id)?.is_some()
    {
      return Err(event_exists(&event.name, event.kind.as_str()));
    }
    uow.update_event(&event)?;
    Ok(event)
  })();
  uow.finish(outcome)
}

pub fn delete_event<U: Catalog>(
  uow: U,
  id: Uuid,
  now: DateTime<Utc>,
) -> Result<(), U::Error> {
  let outcome = match uow.soft_delete_event(id, now) {
    Ok(true) => Ok(()),
    Ok(false) => Err(Error::NotFound { entity: EntityKind::Event, id }.into()),
    Err(error) => Err(error),
  };
  uow.finish(outcome)?;
  info!(event_id = %id, "event deleted");
  Ok(())
}

// ─── Properties ──────────────────────────────────────────────────────────────

pub fn create_property<U: Catalog>(
  uow: U,
  input: NewProperty,
  now: DateTime<Utc>,
) -> Result<Property, U::Error> {
  let outcome = (|| -> Result<Property, U::Error> {
    let property = Property::create(&input, now)?;
    if uow.find_property_by_key(&property.key())?.is_some() {
      return Err(property_exists(&property.name, property.kind.as_str()));
    }
    uow.insert_property(&property)?;
    Ok(property)
  })();
  let property = uow.finish(outcome)?;
  info!(
    property_id = %property.id, name = %property.name, kind = %property.kind,
    "property created"
  );
  Ok(property)
}

pub fn update_property<U: Catalog>(
  uow: U,
  id: Uuid,
  update: PropertyUpdate,
  now: DateTime<Utc>,
) -> Result<Property, U::Error> {
  let outcome = (|| -> Result<Property, U::Error> {
    let mut property = uow
      .find_property(id)?
      .ok_or(Error::NotFound { entity: EntityKind::Property, id })?;
    if update.apply(&mut property, now)?
      && uow
        .find_property_by_key_excluding(&property.key(), id)?
        .is_some()
    {
      return Err(property_exists(&property.name, property.kind.as_str()));
    }
    uow.update_property(&property)?;
    Ok(property)
  })();
  uow.finish(outcome)
}

pub fn delete_property<U: Catalog>(
  uow: U,
  id: Uuid,
  now: DateTime<Utc>,
) -> Result<(), U::Error> {
  let outcome = match uow.soft_delete_property(id, now) {
    Ok(true) => Ok(()),
    Ok(false) => Err(Error::NotFound { entity: EntityKind::Property, id }.into()),
    Err(error) => Err(error),
  };
  uow.finish(outcome)?;
  info!(property_id = %id, "property deleted");
  Ok(())
}

fn event_exists<E: From<Error>>(name: &str, kind: &str) -> E {
  Error::already_exists(EntityKind::Event, name, Some(kind)).into()
}

fn property_exists<E: From<Error>>(name: &str, kind: &str) -> E {
  Error::already_exists(EntityKind::Property, name, Some(kind)).into()
}
