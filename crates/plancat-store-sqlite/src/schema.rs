//! SQL schema for the plancat SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.
//!
//! Soft-deleted rows stay in their tables. Identity uniqueness for events,
//! properties and link pairs is enforced by partial indexes over live rows
//! only, so an identity can be reused once its row is deleted. Plan names are
//! unique across all rows, deleted or not.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS events (
    event_id     TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    event_type   TEXT NOT NULL,    -- 'track' | 'identify' | 'alias' | 'screen' | 'page'
    description  TEXT NOT NULL,
    is_deleted   INTEGER NOT NULL DEFAULT 0,
    deleted_at   TEXT,
    created_at   TEXT NOT NULL,    -- ISO 8601 UTC
    updated_at   TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS events_identity_idx
    ON events(name, event_type) WHERE is_deleted = 0;

CREATE TABLE IF NOT EXISTS properties (
    property_id      TEXT PRIMARY KEY,
    name             TEXT NOT NULL,
    property_type    TEXT NOT NULL,    -- 'string' | 'number' | 'boolean'
    description      TEXT NOT NULL,
    validation_rules TEXT,             -- compact JSON or NULL for no rules
    is_deleted       INTEGER NOT NULL DEFAULT 0,
    deleted_at       TEXT,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS properties_identity_idx
    ON properties(name, property_type) WHERE is_deleted = 0;

CREATE TABLE IF NOT EXISTS tracking_plans (
    plan_id      TEXT PRIMARY KEY,
    name         TEXT NOT NULL UNIQUE,
    description  TEXT NOT NULL,
    is_deleted   INTEGER NOT NULL DEFAULT 0,
    deleted_at   TEXT,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS plan_events (
    link_id               TEXT PRIMARY KEY,
    plan_id               TEXT NOT NULL REFERENCES tracking_plans(plan_id),
    event_id              TEXT NOT NULL REFERENCES events(event_id),
    additional_properties INTEGER NOT NULL,
    position              INTEGER NOT NULL,
    is_deleted            INTEGER NOT NULL DEFAULT 0,
    deleted_at            TEXT,
    created_at            TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS plan_events_pair_idx
    ON plan_events(plan_id, event_id) WHERE is_deleted = 0;
CREATE INDEX IF NOT EXISTS plan_events_plan_idx ON plan_events(plan_id);

CREATE TABLE IF NOT EXISTS event_properties (
    link_id        TEXT PRIMARY KEY,
    plan_event_id  TEXT NOT NULL REFERENCES plan_events(link_id),
    property_id    TEXT NOT NULL REFERENCES properties(property_id),
    required       INTEGER NOT NULL,
    position       INTEGER NOT NULL,
    is_deleted     INTEGER NOT NULL DEFAULT 0,
    deleted_at     TEXT,
    created_at     TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS event_properties_pair_idx
    ON event_properties(plan_event_id, property_id) WHERE is_deleted = 0;
CREATE INDEX IF NOT EXISTS event_properties_parent_idx
    ON event_properties(plan_event_id);

PRAGMA user_version = 1;
";
