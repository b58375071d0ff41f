//! Generic snapshot reconciliation engine.
//!
//! Compares a provided snapshot (the desired state) against a current
//! snapshot (the observed state) and classifies every entity as ADD,
//! UPDATE, DELETE, or KEEP. Inputs are glob-filtered, matched on
//! configurable key columns across differently named schemas, and each
//! result field is resolved from its sources by priority, first non-empty
//! value wins.
//!
//! All heavy lifting happens inside an embedded SQLite database: inputs
//! are staged into scratch tables and the four classification passes run
//! as set operations, so row counts in the hundreds of thousands stay
//! cheap. [`engine::reconcile`] is the entry point.

pub mod check;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod matcher;
pub mod model;
pub mod query;
pub mod resolver;
pub mod store;

pub use config::SyncConfig;
pub use engine::reconcile;
pub use error::ReconError;
pub use model::{ReconReport, Row, SyncAction, Value};
