//! Identity resolution: reuse, create, or reject a candidate definition.
//!
//! An [`IdentityResolver`] lives exactly as long as one unit of work. It
//! remembers every identity it has resolved, so a `(name, type)` repeated
//! within one submission maps to the same row with a single lookup and at
//! most one insert.

use std::{collections::HashMap, fmt, hash::Hash};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
  Difference, EntityKind, Error,
  compare::{event_difference, property_difference},
  event::{Event, EventKind, NewEvent},
  property::{NewProperty, Property, PropertyKind},
  store::Catalog,
};

/// The `(name, type)` pair that identifies an event or property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey<K> {
  pub name: String,
  pub kind: K,
}

impl<K> NaturalKey<K> {
  pub fn new(name: &str, kind: K) -> Self {
    Self { name: name.to_owned(), kind }
  }
}

/// An entity kind the resolver can reuse or auto-create.
pub trait Resolvable: Clone + Sized {
  type Kind: Copy + Eq + Hash + fmt::Display;
  type Candidate;

  const ENTITY: EntityKind;

  fn candidate_key(candidate: &Self::Candidate) -> NaturalKey<Self::Kind>;

  fn difference(candidate: &Self::Candidate, existing: &Self) -> Option<Difference>;

  fn find<U: Catalog>(
    uow: &U,
    key: &NaturalKey<Self::Kind>,
  ) -> Result<Option<Self>, U::Error>;

  /// Validate (where applicable) and insert a new row.
  fn insert<U: Catalog>(
    uow: &U,
    candidate: &Self::Candidate,
    now: DateTime<Utc>,
  ) -> Result<Self, U::Error>;

  fn id(&self) -> uuid::Uuid;
}

impl Resolvable for Event {
  type Kind = EventKind;
  type Candidate = NewEvent;

  const ENTITY: EntityKind = EntityKind::Event;

  fn candidate_key(candidate: &NewEvent) -> NaturalKey<EventKind> { candidate.key() }

  fn difference(candidate: &NewEvent, existing: &Self) -> Option<Difference> {
    event_difference(candidate, existing)
  }

  fn find<U: Catalog>(
    uow: &U,
    key: &NaturalKey<EventKind>,
  ) -> Result<Option<Self>, U::Error> {
    uow.find_event_by_key(key)
  }

  fn insert<U: Catalog>(
    uow: &U,
    candidate: &NewEvent,
    now: DateTime<Utc>,
  ) -> Result<Self, U::Error> {
    let event = Event::create(candidate, now);
    uow.insert_event(&event)?;
    Ok(event)
  }

  fn id(&self) -> uuid::Uuid { self.id }
}

impl Resolvable for Property {
  type Kind = PropertyKind;
  type Candidate = NewProperty;

  const ENTITY: EntityKind = EntityKind::Property;

  fn candidate_key(candidate: &NewProperty) -> NaturalKey<PropertyKind> {
    candidate.key()
  }

  fn difference(candidate: &NewProperty, existing: &Self) -> Option<Difference> {
    property_difference(candidate, existing)
  }

  fn find<U: Catalog>(
    uow: &U,
    key: &NaturalKey<PropertyKind>,
  ) -> Result<Option<Self>, U::Error> {
    uow.find_property_by_key(key)
  }

  fn insert<U: Catalog>(
    uow: &U,
    candidate: &NewProperty,
    now: DateTime<Utc>,
  ) -> Result<Self, U::Error> {
    let property = Property::create(candidate, now)?;
    uow.insert_property(&property)?;
    Ok(property)
  }

  fn id(&self) -> uuid::Uuid { self.id }
}

/// Operation-scoped resolver for one entity kind.
pub struct IdentityResolver<T: Resolvable> {
  resolved: HashMap<NaturalKey<T::Kind>, T>,
  now:      DateTime<Utc>,
}

impl<T: Resolvable> IdentityResolver<T> {
  /// `now` stamps every row this resolver creates.
  pub fn new(now: DateTime<Utc>) -> Self {
    Self { resolved: HashMap::new(), now }
  }

  /// Return the live entity for `candidate`'s identity, inserting it if none
  /// exists. Fails with [`Error::Conflict`] if the entity exists with
  /// different comparable attributes, including when it was resolved earlier
  /// in the same operation.
  pub fn resolve<U: Catalog>(
    &mut self,
    uow: &U,
    candidate: &T::Candidate,
  ) -> Result<T, U::Error> {
    let key = T::candidate_key(candidate);

    if let Some(known) = self.resolved.get(&key) {
      check::<T>(&key, candidate, known)?;
      return Ok(known.clone());
    }

    let entity = match T::find(uow, &key)? {
      Some(existing) => {
        check::<T>(&key, candidate, &existing)?;
        debug!(
          entity = %T::ENTITY, name = %key.name, kind = %key.kind, id = %existing.id(),
          "reusing existing row"
        );
        existing
      }
      None => {
        let created = T::insert(uow, candidate, self.now)?;
        debug!(
          entity = %T::ENTITY, name = %key.name, kind = %key.kind, id = %created.id(),
          "auto-created row"
        );
        created
      }
    };

    self.resolved.insert(key, entity.clone());
    Ok(entity)
  }
}

fn check<T: Resolvable>(
  key: &NaturalKey<T::Kind>,
  candidate: &T::Candidate,
  existing: &T,
) -> Result<(), Error> {
  match T::difference(candidate, existing) {
    None => Ok(()),
    Some(difference) => Err(Error::Conflict {
      entity: T::ENTITY,
      name: key.name.clone(),
      kind: key.kind.to_string(),
      difference,
    }),
  }
}
