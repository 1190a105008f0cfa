//! [`SqliteStore`] — the SQLite implementation of [`CatalogStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::TransactionBehavior;
use tracing::debug;
use uuid::Uuid;

use plancat_core::{
  catalog,
  event::{Event, EventUpdate, NewEvent},
  orchestrate,
  plan::{NewTrackingPlan, TrackingPlan, TrackingPlanUpdate, TrackingPlanView},
  property::{NewProperty, Property, PropertyUpdate},
  store::{
    CatalogStore, EventRepository, PropertyRepository, TrackingPlanRepository,
  },
};

use crate::{Result, schema::SCHEMA, uow::SqliteUnitOfWork};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A plancat catalog backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    debug!(path = %path.as_ref().display(), "opening sqlite store");
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `work` against a write transaction on the connection thread.
  ///
  /// The write lock is taken up front so a concurrent writer fails fast
  /// instead of deadlocking on lock upgrade.
  async fn transact<T, F>(&self, work: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(SqliteUnitOfWork<'_>) -> Result<T> + Send + 'static,
  {
    self.run(TransactionBehavior::Immediate, work).await
  }

  /// Run read-only `work` against a deferred transaction, which never
  /// takes the write lock. The unit of work is dropped uncommitted.
  async fn read<T, F>(&self, work: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(SqliteUnitOfWork<'_>) -> Result<T> + Send + 'static,
  {
    self.run(TransactionBehavior::Deferred, work).await
  }

  async fn run<T, F>(&self, behavior: TransactionBehavior, work: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(SqliteUnitOfWork<'_>) -> Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(behavior)?;
        Ok(work(SqliteUnitOfWork::new(tx)))
      })
      .await?
  }

  /// Row count of `table` including soft-deleted rows.
  #[cfg(test)]
  pub(crate) async fn count_rows(&self, table: &'static str) -> Result<i64> {
    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
          row.get(0)
        })?)
      })
      .await?;
    Ok(count)
  }
}

// ─── CatalogStore impl ───────────────────────────────────────────────────────

impl CatalogStore for SqliteStore {
  type Error = crate::Error;

  // ── Events ────────────────────────────────────────────────────────────────

  async fn create_event(&self, input: NewEvent) -> Result<Event> {
    self
      .transact(move |uow| catalog::create_event(uow, input, Utc::now()))
      .await
  }

  async fn get_event(&self, id: Uuid) -> Result<Option<Event>> {
    self.read(move |uow| uow.find_event(id)).await
  }

  async fn list_events(&self) -> Result<Vec<Event>> {
    self.read(|uow| uow.list_events()).await
  }

  async fn update_event(&self, id: Uuid, update: EventUpdate) -> Result<Event> {
    self
      .transact(move |uow| catalog::update_event(uow, id, update, Utc::now()))
      .await
  }

  async fn delete_event(&self, id: Uuid) -> Result<()> {
    self
      .transact(move |uow| catalog::delete_event(uow, id, Utc::now()))
      .await
  }

  // ── Properties ────────────────────────────────────────────────────────────

  async fn create_property(&self, input: NewProperty) -> Result<Property> {
    self
      .transact(move |uow| catalog::create_property(uow, input, Utc::now()))
      .await
  }

  async fn get_property(&self, id: Uuid) -> Result<Option<Property>> {
    self.read(move |uow| uow.find_property(id)).await
  }

  async fn list_properties(&self) -> Result<Vec<Property>> {
    self.read(|uow| uow.list_properties()).await
  }

  async fn update_property(
    &self,
    id:     Uuid,
    update: PropertyUpdate,
  ) -> Result<Property> {
    self
      .transact(move |uow| catalog::update_property(uow, id, update, Utc::now()))
      .await
  }

  async fn delete_property(&self, id: Uuid) -> Result<()> {
    self
      .transact(move |uow| catalog::delete_property(uow, id, Utc::now()))
      .await
  }

  // ── Tracking plans ────────────────────────────────────────────────────────

  async fn create_tracking_plan(
    &self,
    input: NewTrackingPlan,
  ) -> Result<TrackingPlanView> {
    self
      .transact(move |uow| {
        orchestrate::create_tracking_plan(uow, input, Utc::now())
      })
      .await
  }

  async fn get_tracking_plan(&self, id: Uuid) -> Result<Option<TrackingPlanView>> {
    self
      .read(move |uow| orchestrate::load_tracking_plan(&uow, id))
      .await
  }

  async fn list_tracking_plans(&self) -> Result<Vec<TrackingPlan>> {
    self.read(|uow| uow.list_plans()).await
  }

  async fn update_tracking_plan(
    &self,
    id:     Uuid,
    update: TrackingPlanUpdate,
  ) -> Result<TrackingPlanView> {
    self
      .transact(move |uow| {
        orchestrate::update_tracking_plan(uow, id, update, Utc::now())
      })
      .await
  }

  async fn delete_tracking_plan(&self, id: Uuid) -> Result<()> {
    self
      .transact(move |uow| orchestrate::delete_tracking_plan(uow, id, Utc::now()))
      .await
  }
}
