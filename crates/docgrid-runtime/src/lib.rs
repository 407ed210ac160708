//! Runtime facade: wires extraction, storage and query execution together.
//!
//! [`DocGrid`] owns the document pipeline, the query executor and the task
//! registry, and exposes the operations callers use.

pub mod orchestrator;
pub mod types;

pub use orchestrator::DocGrid;
pub use types::*;
