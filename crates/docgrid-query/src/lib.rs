//! DocGrid Query: routes questions about documents to a retrieval strategy,
//! runs them under a shared concurrency limit with retries, and normalizes
//! the model's answers into typed values.

pub mod entity;
pub mod executor;
pub mod literal;
pub mod normalize;
pub mod prompts;
pub mod retry;
pub mod router;
pub mod types;

pub use entity::{EntityResolver, Transformation};
pub use executor::QueryExecutor;
pub use normalize::normalize;
pub use retry::RetryPolicy;
pub use router::route;
pub use docgrid_core::TaskRegistry;
pub use types::*;
