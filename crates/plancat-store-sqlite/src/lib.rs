//! SQLite backend for the plancat data catalog.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every service call opens one
//! transaction and hands it to the core services as a unit of work.

mod encode;
mod schema;
mod store;
mod uow;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
pub use uow::SqliteUnitOfWork;

#[cfg(test)]
mod tests;
