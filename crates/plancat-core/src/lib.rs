//! Core types, rules and orchestration for the plancat data catalog.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage
//! backends implement the repository traits in [`store`]; the decision logic
//! (comparison, identity resolution, tracking plan orchestration) lives here
//! and runs against any of them.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod catalog;
pub mod compare;
pub mod error;
pub mod event;
pub mod orchestrate;
pub mod plan;
pub mod property;
pub mod resolve;
pub mod rules;
pub mod store;

pub use error::{Difference, EntityKind, Error, Result};
