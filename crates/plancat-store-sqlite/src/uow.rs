//! [`SqliteUnitOfWork`] — one SQLite transaction exposed through the
//! plancat repository traits.

use chrono::{DateTime, Utc};
use plancat_core::{
  EntityKind,
  event::{Event, EventKind},
  plan::{EventPropertyLink, PlanEventLink, TrackingPlan},
  property::{Property, PropertyKind},
  resolve::NaturalKey,
  store::{
    EventRepository, LinkRepository, PropertyRepository, TrackingPlanRepository,
    UnitOfWork,
  },
};
use rusqlite::{OptionalExtension as _, Params, Transaction, ffi, params};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    EVENT_COLUMNS, PLAN_COLUMNS, PROPERTY_COLUMNS, RawEvent, RawEventPropertyLink,
    RawPlan, RawPlanEventLink, RawProperty, encode_dt, encode_rules, encode_uuid,
  },
};

/// Wraps an open [`rusqlite::Transaction`]. Dropping it without
/// [`UnitOfWork::commit`] rolls the transaction back.
pub struct SqliteUnitOfWork<'c> {
  tx: Transaction<'c>,
}

impl<'c> SqliteUnitOfWork<'c> {
  pub fn new(tx: Transaction<'c>) -> Self { Self { tx } }

  fn query_events<P: Params>(&self, filter: &str, params: P) -> Result<Vec<Event>> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE {filter}");
    let mut stmt = self.tx.prepare(&sql)?;
    let raws = stmt
      .query_map(params, |row| RawEvent::read(row, 0))?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    raws.into_iter().map(RawEvent::into_event).collect()
  }

  fn query_event<P: Params>(&self, filter: &str, params: P) -> Result<Option<Event>> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE {filter}");
    self
      .tx
      .query_row(&sql, params, |row| RawEvent::read(row, 0))
      .optional()?
      .map(RawEvent::into_event)
      .transpose()
  }

  fn query_properties<P: Params>(&self, filter: &str, params: P) -> Result<Vec<Property>> {
    let sql = format!("SELECT {PROPERTY_COLUMNS} FROM properties WHERE {filter}");
    let mut stmt = self.tx.prepare(&sql)?;
    let raws = stmt
      .query_map(params, |row| RawProperty::read(row, 0))?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    raws.into_iter().map(RawProperty::into_property).collect()
  }

  fn query_property<P: Params>(&self, filter: &str, params: P) -> Result<Option<Property>> {
    let sql = format!("SELECT {PROPERTY_COLUMNS} FROM properties WHERE {filter}");
    self
      .tx
      .query_row(&sql, params, |row| RawProperty::read(row, 0))
      .optional()?
      .map(RawProperty::into_property)
      .transpose()
  }

  fn query_plan<P: Params>(&self, filter: &str, params: P) -> Result<Option<TrackingPlan>> {
    let sql = format!("SELECT {PLAN_COLUMNS} FROM tracking_plans WHERE {filter}");
    self
      .tx
      .query_row(&sql, params, |row| RawPlan::read(row, 0))
      .optional()?
      .map(RawPlan::into_plan)
      .transpose()
  }
}

/// Translate a unique-index violation into the domain's `UniqueConstraint`
/// error; every other failure stays a storage error.
fn unique_violation(
  err: rusqlite::Error,
  conflict: impl FnOnce() -> plancat_core::Error,
) -> Error {
  match &err {
    rusqlite::Error::SqliteFailure(e, _)
      if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
    {
      Error::Core(conflict())
    }
    _ => Error::Sqlite(err),
  }
}

fn event_taken(event: &Event) -> plancat_core::Error {
  plancat_core::Error::already_exists(
    EntityKind::Event,
    &event.name,
    Some(event.kind.as_str()),
  )
}

fn property_taken(property: &Property) -> plancat_core::Error {
  plancat_core::Error::already_exists(
    EntityKind::Property,
    &property.name,
    Some(property.kind.as_str()),
  )
}

fn plan_taken(plan: &TrackingPlan) -> plancat_core::Error {
  plancat_core::Error::already_exists(EntityKind::TrackingPlan, &plan.name, None)
}

// ─── Unit of work ────────────────────────────────────────────────────────────

impl UnitOfWork for SqliteUnitOfWork<'_> {
  type Error = Error;

  fn commit(self) -> Result<()> {
    self.tx.commit()?;
    Ok(())
  }

  fn rollback(self) -> Result<()> {
    self.tx.rollback()?;
    Ok(())
  }
}

// ─── Events ──────────────────────────────────────────────────────────────────

impl EventRepository for SqliteUnitOfWork<'_> {
  fn find_event(&self, id: Uuid) -> Result<Option<Event>> {
    self.query_event("event_id = ?1 AND is_deleted = 0", params![encode_uuid(id)])
  }

  fn find_event_by_key(&self, key: &NaturalKey<EventKind>) -> Result<Option<Event>> {
    self.query_event(
      "name = ?1 AND event_type = ?2 AND is_deleted = 0",
      params![key.name, key.kind.as_str()],
    )
  }

  fn find_event_by_key_excluding(
    &self,
    key: &NaturalKey<EventKind>,
    exclude: Uuid,
  ) -> Result<Option<Event>> {
    self.query_event(
      "name = ?1 AND event_type = ?2 AND event_id != ?3 AND is_deleted = 0",
      params![key.name, key.kind.as_str(), encode_uuid(exclude)],
    )
  }

  fn list_events(&self) -> Result<Vec<Event>> {
    self.query_events("is_deleted = 0 ORDER BY name, event_type", [])
  }

  fn insert_event(&self, event: &Event) -> Result<()> {
    self
      .tx
      .execute(
        "INSERT INTO events (
           event_id, name, event_type, description,
           is_deleted, deleted_at, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
          encode_uuid(event.id),
          event.name,
          event.kind.as_str(),
          event.description,
          event.is_deleted,
          event.deleted_at.map(encode_dt),
          encode_dt(event.created_at),
          encode_dt(event.updated_at),
        ],
      )
      .map_err(|e| unique_violation(e, || event_taken(event)))?;
    Ok(())
  }

  fn update_event(&self, event: &Event) -> Result<()> {
    self
      .tx
      .execute(
        "UPDATE events
            SET name = ?2, event_type = ?3, description = ?4, updated_at = ?5
          WHERE event_id = ?1",
        params![
          encode_uuid(event.id),
          event.name,
          event.kind.as_str(),
          event.description,
          encode_dt(event.updated_at),
        ],
      )
      .map_err(|e| unique_violation(e, || event_taken(event)))?;
    Ok(())
  }

  fn soft_delete_event(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
    let changed = self.tx.execute(
      "UPDATE events SET is_deleted = 1, deleted_at = ?2, updated_at = ?2
        WHERE event_id = ?1 AND is_deleted = 0",
      params![encode_uuid(id), encode_dt(at)],
    )?;
    Ok(changed > 0)
  }
}

// ─── Properties ──────────────────────────────────────────────────────────────

impl PropertyRepository for SqliteUnitOfWork<'_> {
  fn find_property(&self, id: Uuid) -> Result<Option<Property>> {
    self.query_property("property_id = ?1 AND is_deleted = 0", params![encode_uuid(id)])
  }

  fn find_property_by_key(
    &self,
    key: &NaturalKey<PropertyKind>,
  ) -> Result<Option<Property>> {
    self.query_property(
      "name = ?1 AND property_type = ?2 AND is_deleted = 0",
      params![key.name, key.kind.as_str()],
    )
  }

  fn find_property_by_key_excluding(
    &self,
    key: &NaturalKey<PropertyKind>,
    exclude: Uuid,
  ) -> Result<Option<Property>> {
    self.query_property(
      "name = ?1 AND property_type = ?2 AND property_id != ?3 AND is_deleted = 0",
      params![key.name, key.kind.as_str(), encode_uuid(exclude)],
    )
  }

  fn list_properties(&self) -> Result<Vec<Property>> {
    self.query_properties("is_deleted = 0 ORDER BY name, property_type", [])
  }

  fn insert_property(&self, property: &Property) -> Result<()> {
    let rules = encode_rules(property.validation_rules.as_ref())?;
    self
      .tx
      .execute(
        "INSERT INTO properties (
           property_id, name, property_type, description, validation_rules,
           is_deleted, deleted_at, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
          encode_uuid(property.id),
          property.name,
          property.kind.as_str(),
          property.description,
          rules,
          property.is_deleted,
          property.deleted_at.map(encode_dt),
          encode_dt(property.created_at),
          encode_dt(property.updated_at),
        ],
      )
      .map_err(|e| unique_violation(e, || property_taken(property)))?;
    Ok(())
  }

  fn update_property(&self, property: &Property) -> Result<()> {
    let rules = encode_rules(property.validation_rules.as_ref())?;
    self
      .tx
      .execute(
        "UPDATE properties
            SET name = ?2, property_type = ?3, description = ?4,
                validation_rules = ?5, updated_at = ?6
          WHERE property_id = ?1",
        params![
          encode_uuid(property.id),
          property.name,
          property.kind.as_str(),
          property.description,
          rules,
          encode_dt(property.updated_at),
        ],
      )
      .map_err(|e| unique_violation(e, || property_taken(property)))?;
    Ok(())
  }

  fn soft_delete_property(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
    let changed = self.tx.execute(
      "UPDATE properties SET is_deleted = 1, deleted_at = ?2, updated_at = ?2
        WHERE property_id = ?1 AND is_deleted = 0",
      params![encode_uuid(id), encode_dt(at)],
    )?;
    Ok(changed > 0)
  }
}

// ─── Tracking plans ──────────────────────────────────────────────────────────

impl TrackingPlanRepository for SqliteUnitOfWork<'_> {
  fn find_plan(&self, id: Uuid) -> Result<Option<TrackingPlan>> {
    self.query_plan("plan_id = ?1 AND is_deleted = 0", params![encode_uuid(id)])
  }

  fn find_plan_by_name(&self, name: &str) -> Result<Option<TrackingPlan>> {
    self.query_plan("name = ?1 AND is_deleted = 0", params![name])
  }

  fn find_plan_by_name_excluding(
    &self,
    name: &str,
    exclude: Uuid,
  ) -> Result<Option<TrackingPlan>> {
    self.query_plan(
      "name = ?1 AND plan_id != ?2 AND is_deleted = 0",
      params![name, encode_uuid(exclude)],
    )
  }

  fn list_plans(&self) -> Result<Vec<TrackingPlan>> {
    let sql = format!(
      "SELECT {PLAN_COLUMNS} FROM tracking_plans WHERE is_deleted = 0 ORDER BY name"
    );
    let mut stmt = self.tx.prepare(&sql)?;
    let raws = stmt
      .query_map([], |row| RawPlan::read(row, 0))?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    raws.into_iter().map(RawPlan::into_plan).collect()
  }

  fn insert_plan(&self, plan: &TrackingPlan) -> Result<()> {
    self
      .tx
      .execute(
        "INSERT INTO tracking_plans (
           plan_id, name, description, is_deleted, deleted_at, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
          encode_uuid(plan.id),
          plan.name,
          plan.description,
          plan.is_deleted,
          plan.deleted_at.map(encode_dt),
          encode_dt(plan.created_at),
          encode_dt(plan.updated_at),
        ],
      )
      .map_err(|e| unique_violation(e, || plan_taken(plan)))?;
    Ok(())
  }

  fn update_plan(&self, plan: &TrackingPlan) -> Result<()> {
    self
      .tx
      .execute(
        "UPDATE tracking_plans
            SET name = ?2, description = ?3, updated_at = ?4
          WHERE plan_id = ?1",
        params![
          encode_uuid(plan.id),
          plan.name,
          plan.description,
          encode_dt(plan.updated_at),
        ],
      )
      .map_err(|e| unique_violation(e, || plan_taken(plan)))?;
    Ok(())
  }

  fn soft_delete_plan(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
    let changed = self.tx.execute(
      "UPDATE tracking_plans SET is_deleted = 1, deleted_at = ?2, updated_at = ?2
        WHERE plan_id = ?1 AND is_deleted = 0",
      params![encode_uuid(id), encode_dt(at)],
    )?;
    Ok(changed > 0)
  }
}

// ─── Links ───────────────────────────────────────────────────────────────────

impl LinkRepository for SqliteUnitOfWork<'_> {
  fn insert_plan_event(&self, link: &PlanEventLink) -> Result<()> {
    self
      .tx
      .execute(
        "INSERT INTO plan_events (
           link_id, plan_id, event_id, additional_properties, position,
           is_deleted, deleted_at, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
          encode_uuid(link.id),
          encode_uuid(link.plan_id),
          encode_uuid(link.event_id),
          link.additional_properties,
          link.position,
          link.is_deleted,
          link.deleted_at.map(encode_dt),
          encode_dt(link.created_at),
        ],
      )
      .map_err(|e| {
        unique_violation(e, || {
          plancat_core::Error::UniqueConstraint(format!(
            "Event {} is already linked to tracking plan {}",
            link.event_id, link.plan_id
          ))
        })
      })?;
    Ok(())
  }

  fn insert_event_property(&self, link: &EventPropertyLink) -> Result<()> {
    self
      .tx
      .execute(
        "INSERT INTO event_properties (
           link_id, plan_event_id, property_id, required, position,
           is_deleted, deleted_at, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
          encode_uuid(link.id),
          encode_uuid(link.plan_event_id),
          encode_uuid(link.property_id),
          link.required,
          link.position,
          link.is_deleted,
          link.deleted_at.map(encode_dt),
          encode_dt(link.created_at),
        ],
      )
      .map_err(|e| {
        unique_violation(e, || {
          plancat_core::Error::UniqueConstraint(format!(
            "Property {} is already linked to plan event {}",
            link.property_id, link.plan_event_id
          ))
        })
      })?;
    Ok(())
  }

  fn list_plan_events(&self, plan_id: Uuid) -> Result<Vec<(PlanEventLink, Event)>> {
    let sql = format!(
      "SELECT l.link_id, l.plan_id, l.event_id, l.additional_properties, l.position,
              l.is_deleted, l.deleted_at, l.created_at, {columns}
         FROM plan_events l
         JOIN events e ON e.event_id = l.event_id
        WHERE l.plan_id = ?1 AND l.is_deleted = 0 AND e.is_deleted = 0
        ORDER BY l.position",
      columns = prefixed("e", EVENT_COLUMNS),
    );
    let mut stmt = self.tx.prepare(&sql)?;
    let raws = stmt
      .query_map(params![encode_uuid(plan_id)], |row| {
        Ok((RawPlanEventLink::read(row, 0)?, RawEvent::read(row, 8)?))
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?;

    raws
      .into_iter()
      .map(|(link, event)| Ok((link.into_link()?, event.into_event()?)))
      .collect()
  }

  fn list_event_properties(
    &self,
    plan_event_id: Uuid,
  ) -> Result<Vec<(EventPropertyLink, Property)>> {
    let sql = format!(
      "SELECT l.link_id, l.plan_event_id, l.property_id, l.required, l.position,
              l.is_deleted, l.deleted_at, l.created_at, {columns}
         FROM event_properties l
         JOIN properties p ON p.property_id = l.property_id
        WHERE l.plan_event_id = ?1 AND l.is_deleted = 0 AND p.is_deleted = 0
        ORDER BY l.position",
      columns = prefixed("p", PROPERTY_COLUMNS),
    );
    let mut stmt = self.tx.prepare(&sql)?;
    let raws = stmt
      .query_map(params![encode_uuid(plan_event_id)], |row| {
        Ok((RawEventPropertyLink::read(row, 0)?, RawProperty::read(row, 8)?))
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?;

    raws
      .into_iter()
      .map(|(link, property)| Ok((link.into_link()?, property.into_property()?)))
      .collect()
  }

  fn soft_delete_plan_links(&self, plan_id: Uuid, at: DateTime<Utc>) -> Result<()> {
    let plan_id = encode_uuid(plan_id);
    let at = encode_dt(at);
    self.tx.execute(
      "UPDATE event_properties SET is_deleted = 1, deleted_at = ?2
        WHERE is_deleted = 0
          AND plan_event_id IN (
            SELECT link_id FROM plan_events WHERE plan_id = ?1 AND is_deleted = 0
          )",
      params![plan_id, at],
    )?;
    self.tx.execute(
      "UPDATE plan_events SET is_deleted = 1, deleted_at = ?2
        WHERE plan_id = ?1 AND is_deleted = 0",
      params![plan_id, at],
    )?;
    Ok(())
  }
}

/// `"a, b"` → `"p.a, p.b"`.
fn prefixed(alias: &str, columns: &str) -> String {
  columns
    .split(',')
    .map(|c| format!("{alias}.{}", c.trim()))
    .collect::<Vec<_>>()
    .join(", ")
}
