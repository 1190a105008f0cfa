//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{TimeZone as _, Utc};
use plancat_core::{
  Difference, EntityKind,
  event::{EventKind, EventUpdate, NewEvent},
  plan::{EventDefinition, NewTrackingPlan, PropertyDefinition, TrackingPlanUpdate},
  property::{NewProperty, PropertyKind, PropertyUpdate},
  rules::ValidationRules,
  store::{CatalogStore, DomainError},
};
use serde_json::json;
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn new_event(name: &str, description: &str) -> NewEvent {
  NewEvent {
    name:        name.into(),
    kind:        EventKind::Track,
    description: description.into(),
  }
}

fn new_property(name: &str, rules: Option<serde_json::Value>) -> NewProperty {
  NewProperty {
    name:             name.into(),
    kind:             PropertyKind::String,
    description:      format!("The {name}"),
    validation_rules: rules,
  }
}

fn property(name: &str, required: bool) -> PropertyDefinition {
  PropertyDefinition {
    name: name.into(),
    kind: PropertyKind::String,
    description: format!("The {name}"),
    required,
    validation_rules: None,
  }
}

fn event(name: &str, description: &str, properties: Vec<PropertyDefinition>) -> EventDefinition {
  EventDefinition {
    name: name.into(),
    kind: EventKind::Track,
    description: description.into(),
    additional_properties: false,
    properties,
  }
}

fn plan(name: &str, events: Vec<EventDefinition>) -> NewTrackingPlan {
  NewTrackingPlan {
    name: name.into(),
    description: format!("{name} plan"),
    created_at: None,
    events,
  }
}

fn code(err: &Error) -> &'static str {
  err.domain().map(|e| e.code()).unwrap_or("OPERATION_FAILED")
}

async fn counts(s: &SqliteStore) -> [i64; 5] {
  let mut out = [0; 5];
  for (slot, table) in out.iter_mut().zip([
    "events",
    "properties",
    "tracking_plans",
    "plan_events",
    "event_properties",
  ]) {
    *slot = s.count_rows(table).await.unwrap();
  }
  out
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_event() {
  let s = store().await;

  let created = s.create_event(new_event("Login", "User logged in")).await.unwrap();
  assert_eq!(created.kind, EventKind::Track);
  assert!(!created.is_deleted);

  let fetched = s.get_event(created.id).await.unwrap().unwrap();
  assert_eq!(fetched, created);
}

#[tokio::test]
async fn get_event_missing_returns_none() {
  let s = store().await;
  assert!(s.get_event(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_event_identity_is_unique_constraint() {
  let s = store().await;
  s.create_event(new_event("Login", "A")).await.unwrap();

  let err = s.create_event(new_event("Login", "B")).await.unwrap_err();
  assert_eq!(code(&err), "UNIQUE_CONSTRAINT");
  assert!(
    err.to_string().contains("Event 'Login' of type 'track' already exists"),
    "{err}"
  );

  // Same name, different type is a different identity.
  let mut page = new_event("Login", "A");
  page.kind = EventKind::Page;
  s.create_event(page).await.unwrap();
  assert_eq!(s.list_events().await.unwrap().len(), 2);
}

#[tokio::test]
async fn deleted_event_frees_its_identity() {
  let s = store().await;
  let first = s.create_event(new_event("Login", "A")).await.unwrap();
  s.delete_event(first.id).await.unwrap();

  assert!(s.get_event(first.id).await.unwrap().is_none());
  assert!(s.list_events().await.unwrap().is_empty());

  let second = s.create_event(new_event("Login", "B")).await.unwrap();
  assert_ne!(second.id, first.id);
  // The soft-deleted row is still on disk.
  assert_eq!(s.count_rows("events").await.unwrap(), 2);
}

#[tokio::test]
async fn delete_missing_event_is_not_found() {
  let s = store().await;
  let err = s.delete_event(Uuid::new_v4()).await.unwrap_err();
  assert_eq!(code(&err), "NOT_FOUND");
}

#[tokio::test]
async fn update_event_rename_onto_taken_identity_fails() {
  let s = store().await;
  s.create_event(new_event("Login", "A")).await.unwrap();
  let other = s.create_event(new_event("Logout", "B")).await.unwrap();

  let err = s
    .update_event(other.id, EventUpdate {
      name: Some("Login".into()),
      ..Default::default()
    })
    .await
    .unwrap_err();
  assert_eq!(code(&err), "UNIQUE_CONSTRAINT");

  let unchanged = s.get_event(other.id).await.unwrap().unwrap();
  assert_eq!(unchanged.name, "Logout");
}

#[tokio::test]
async fn update_event_description_only() {
  let s = store().await;
  let created = s.create_event(new_event("Login", "A")).await.unwrap();

  let updated = s
    .update_event(created.id, EventUpdate {
      description: Some("Signed in".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(updated.name, "Login");
  assert_eq!(updated.description, "Signed in");
  assert!(updated.updated_at >= created.updated_at);
}

// ─── Properties ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn property_rules_round_trip() {
  let s = store().await;
  let created = s
    .create_property(new_property("email", Some(json!({ "regex": "^.+@.+$" }))))
    .await
    .unwrap();

  let fetched = s.get_property(created.id).await.unwrap().unwrap();
  assert_eq!(
    fetched.validation_rules,
    Some(ValidationRules { regex: Some("^.+@.+$".into()), ..Default::default() })
  );
}

#[tokio::test]
async fn empty_rules_are_stored_as_absent() {
  let s = store().await;
  let created = s.create_property(new_property("email", Some(json!({})))).await.unwrap();
  assert!(created.validation_rules.is_none());
  let fetched = s.get_property(created.id).await.unwrap().unwrap();
  assert!(fetched.validation_rules.is_none());
}

#[tokio::test]
async fn invalid_rules_are_rejected_without_writing() {
  let s = store().await;
  let err = s
    .create_property(new_property("sku", Some(json!({ "min": "invalid" }))))
    .await
    .unwrap_err();
  assert_eq!(code(&err), "VALIDATION_ERROR");
  assert_eq!(s.count_rows("properties").await.unwrap(), 0);
}

#[tokio::test]
async fn update_property_clears_rules_on_explicit_null() {
  let s = store().await;
  let created = s
    .create_property(new_property("email", Some(json!({ "regex": "@" }))))
    .await
    .unwrap();

  let kept = s
    .update_property(created.id, PropertyUpdate {
      description: Some("Email".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert!(kept.validation_rules.is_some());

  let cleared = s
    .update_property(created.id, PropertyUpdate {
      validation_rules: Some(None),
      ..Default::default()
    })
    .await
    .unwrap();
  assert!(cleared.validation_rules.is_none());
}

// ─── Tracking plans ──────────────────────────────────────────────────────────

#[tokio::test]
async fn create_plan_auto_creates_everything() {
  let s = store().await;
  let view = s
    .create_tracking_plan(plan("Checkout", vec![event(
      "Order Completed",
      "An order",
      vec![property("order_id", true), property("coupon", false)],
    )]))
    .await
    .unwrap();

  assert_eq!(counts(&s).await, [1, 2, 1, 1, 2]);
  assert_eq!(view.events.len(), 1);
  let names: Vec<_> = view.events[0].properties.iter().map(|p| p.name.as_str()).collect();
  assert_eq!(names, ["order_id", "coupon"]);

  let loaded = s.get_tracking_plan(view.plan.id).await.unwrap().unwrap();
  assert_eq!(loaded, view);
}

#[tokio::test]
async fn plan_reuses_existing_catalog_entries() {
  let s = store().await;
  let login = s.create_event(new_event("Login", "User logged in")).await.unwrap();
  let email = s.create_property(new_property("email", None)).await.unwrap();

  let view = s
    .create_tracking_plan(plan("Auth", vec![event(
      "Login",
      "User logged in",
      vec![property("email", true)],
    )]))
    .await
    .unwrap();

  assert_eq!(view.events[0].id, login.id);
  assert_eq!(view.events[0].properties[0].id, email.id);
  assert_eq!(counts(&s).await, [1, 1, 1, 1, 1]);
}

#[tokio::test]
async fn same_property_under_two_events_is_shared() {
  let s = store().await;
  let view = s
    .create_tracking_plan(plan("Shop", vec![
      event("Product Viewed", "Viewed", vec![property("product_id", true)]),
      event("Product Added", "Added", vec![property("product_id", false)]),
    ]))
    .await
    .unwrap();

  assert_eq!(s.count_rows("properties").await.unwrap(), 1);
  let first = &view.events[0].properties[0];
  let second = &view.events[1].properties[0];
  assert_eq!(first.id, second.id);
  assert!(first.required);
  assert!(!second.required);
}

#[tokio::test]
async fn conflict_leaves_no_side_effects() {
  let s = store().await;
  s.create_event(new_event("Login", "User logged in")).await.unwrap();
  let before = counts(&s).await;

  let err = s
    .create_tracking_plan(plan("Auth", vec![
      event("Signup", "New user", vec![property("email", true)]),
      event("Login", "Something else", vec![]),
    ]))
    .await
    .unwrap_err();

  assert_eq!(code(&err), "CONFLICT");
  assert!(matches!(
    err.domain(),
    Some(plancat_core::Error::Conflict {
      entity: EntityKind::Event,
      difference: Difference::Description,
      ..
    })
  ));
  assert_eq!(
    err.to_string(),
    "core error: Event 'Login' of type 'track' already exists with different description"
  );
  assert_eq!(counts(&s).await, before);
}

#[tokio::test]
async fn differing_rules_conflict() {
  let s = store().await;
  s.create_property(new_property("age", Some(json!({ "min": 0 }))))
    .await
    .unwrap();

  let mut age = property("age", true);
  age.validation_rules = Some(json!({ "min": 18 }));
  let err = s
    .create_tracking_plan(plan("Adults", vec![event("Signup", "New user", vec![age])]))
    .await
    .unwrap_err();

  assert_eq!(code(&err), "CONFLICT");
  assert!(err.to_string().contains("different validation rules"), "{err}");
  assert_eq!(s.count_rows("tracking_plans").await.unwrap(), 0);
}

#[tokio::test]
async fn plan_name_stays_taken_after_delete() {
  let s = store().await;
  let first = s.create_tracking_plan(plan("Checkout", vec![])).await.unwrap();
  let err = s.create_tracking_plan(plan("Checkout", vec![])).await.unwrap_err();
  assert_eq!(code(&err), "UNIQUE_CONSTRAINT");

  s.delete_tracking_plan(first.plan.id).await.unwrap();
  assert!(s.get_tracking_plan(first.plan.id).await.unwrap().is_none());

  let err = s.create_tracking_plan(plan("Checkout", vec![])).await.unwrap_err();
  assert_eq!(code(&err), "UNIQUE_CONSTRAINT");
}

#[tokio::test]
async fn delete_plan_keeps_events_and_properties() {
  let s = store().await;
  let view = s
    .create_tracking_plan(plan("Auth", vec![event("Login", "L", vec![property("email", true)])]))
    .await
    .unwrap();

  s.delete_tracking_plan(view.plan.id).await.unwrap();

  assert!(s.list_tracking_plans().await.unwrap().is_empty());
  assert_eq!(s.list_events().await.unwrap().len(), 1);
  assert_eq!(s.list_properties().await.unwrap().len(), 1);

  let err = s.delete_tracking_plan(view.plan.id).await.unwrap_err();
  assert_eq!(code(&err), "NOT_FOUND");
}

#[tokio::test]
async fn caller_supplied_created_at_is_persisted() {
  let s = store().await;
  let at = Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap();
  let mut input = plan("Legacy", vec![]);
  input.created_at = Some(at);

  let view = s.create_tracking_plan(input).await.unwrap();
  let loaded = s.get_tracking_plan(view.plan.id).await.unwrap().unwrap();
  assert_eq!(loaded.plan.created_at, at);
}

#[tokio::test]
async fn update_plan_replaces_links_in_order() {
  let s = store().await;
  let view = s
    .create_tracking_plan(plan("Shop", vec![
      event("Product Viewed", "Viewed", vec![property("product_id", true)]),
    ]))
    .await
    .unwrap();

  let updated = s
    .update_tracking_plan(view.plan.id, TrackingPlanUpdate {
      events: Some(vec![
        event("Cart Viewed", "Cart", vec![]),
        event("Product Viewed", "Viewed", vec![property("sku", false)]),
      ]),
      ..Default::default()
    })
    .await
    .unwrap();

  let names: Vec<_> = updated.events.iter().map(|e| e.name.as_str()).collect();
  assert_eq!(names, ["Cart Viewed", "Product Viewed"]);
  assert_eq!(updated.events[1].properties[0].name, "sku");

  // Old links stay on disk as soft-deleted rows.
  assert_eq!(s.count_rows("plan_events").await.unwrap(), 3);
  assert_eq!(s.count_rows("event_properties").await.unwrap(), 2);

  let loaded = s.get_tracking_plan(view.plan.id).await.unwrap().unwrap();
  assert_eq!(loaded.events, updated.events);
}

#[tokio::test]
async fn failed_plan_update_rolls_back() {
  let s = store().await;
  let view = s
    .create_tracking_plan(plan("Shop", vec![event("Product Viewed", "Viewed", vec![])]))
    .await
    .unwrap();
  let before = counts(&s).await;

  let err = s
    .update_tracking_plan(view.plan.id, TrackingPlanUpdate {
      name:   Some("Renamed".into()),
      events: Some(vec![event("Product Viewed", "Something else", vec![])]),
      ..Default::default()
    })
    .await
    .unwrap_err();
  assert_eq!(code(&err), "CONFLICT");

  assert_eq!(counts(&s).await, before);
  let loaded = s.get_tracking_plan(view.plan.id).await.unwrap().unwrap();
  assert_eq!(loaded, view);
}

#[tokio::test]
async fn deleted_event_is_hidden_from_plan_view() {
  let s = store().await;
  let view = s
    .create_tracking_plan(plan("Shop", vec![
      event("Product Viewed", "Viewed", vec![]),
      event("Product Added", "Added", vec![]),
    ]))
    .await
    .unwrap();

  s.delete_event(view.events[0].id).await.unwrap();

  let loaded = s.get_tracking_plan(view.plan.id).await.unwrap().unwrap();
  assert_eq!(loaded.events.len(), 1);
  assert_eq!(loaded.events[0].name, "Product Added");
}

#[tokio::test]
async fn same_event_in_two_plans_is_one_row() {
  let s = store().await;
  let first = s
    .create_tracking_plan(plan("Web", vec![event("Login", "User logged in", vec![])]))
    .await
    .unwrap();
  let second = s
    .create_tracking_plan(plan("Mobile", vec![event("Login", "User logged in", vec![])]))
    .await
    .unwrap();

  assert_eq!(first.events[0].id, second.events[0].id);
  assert_eq!(s.count_rows("events").await.unwrap(), 1);
  assert_eq!(s.count_rows("plan_events").await.unwrap(), 2);
}

#[tokio::test]
async fn null_and_absent_rules_are_equivalent() {
  let s = store().await;
  let stored = s
    .create_property(new_property("email", Some(serde_json::Value::Null)))
    .await
    .unwrap();

  // Omitted rules.
  let view = s
    .create_tracking_plan(plan("A", vec![event("Signup", "S", vec![property("email", true)])]))
    .await
    .unwrap();
  assert_eq!(view.events[0].properties[0].id, stored.id);

  // An empty rule object.
  let mut empty = property("email", false);
  empty.validation_rules = Some(json!({}));
  let view = s
    .create_tracking_plan(plan("B", vec![event("Signup", "S", vec![empty])]))
    .await
    .unwrap();
  assert_eq!(view.events[0].properties[0].id, stored.id);
  assert_eq!(s.count_rows("properties").await.unwrap(), 1);
}

#[tokio::test]
async fn type_scoped_identity() {
  let s = store().await;
  let track = s.create_event(new_event("User Action", "A")).await.unwrap();
  let mut page = new_event("User Action", "A");
  page.kind = EventKind::Page;
  let page = s.create_event(page).await.unwrap();
  assert_ne!(track.id, page.id);
}

#[tokio::test]
async fn reads_proceed_while_another_writer_holds_the_lock() {
  let path = std::env::temp_dir().join(format!("plancat-{}.db", Uuid::new_v4()));
  let s = SqliteStore::open(&path).await.unwrap();
  let created = s.create_event(new_event("Login", "L")).await.unwrap();

  let writer = rusqlite::Connection::open(&path).unwrap();
  writer.execute_batch("BEGIN IMMEDIATE").unwrap();

  assert_eq!(s.get_event(created.id).await.unwrap().unwrap().id, created.id);
  assert_eq!(s.list_events().await.unwrap().len(), 1);
  assert!(s.list_tracking_plans().await.unwrap().is_empty());

  writer.execute_batch("ROLLBACK").unwrap();
  drop(writer);
  drop(s);
  for suffix in ["", "-wal", "-shm"] {
    let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
  }
}

#[tokio::test]
async fn event_repeated_within_one_plan_is_rejected_without_writes() {
  let s = store().await;
  let err = s
    .create_tracking_plan(plan("Auth", vec![
      event("Login", "L", vec![property("method", true)]),
      event("Login", "L", vec![]),
    ]))
    .await
    .unwrap_err();
  assert_eq!(code(&err), "UNIQUE_CONSTRAINT");
  assert_eq!(counts(&s).await, [0; 5]);
}
