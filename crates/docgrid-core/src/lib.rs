//! DocGrid Core: shared models, configuration, errors and concurrency primitives.

pub mod cancel;
pub mod config;
pub mod error;
pub mod limiter;
pub mod models;
pub mod tasks;

pub use cancel::CancelToken;
pub use config::{DataPaths, DocGridConfig, ExtractionSettings, QuerySettings};
pub use error::{Error, Result};
pub use limiter::{ConcurrencyLimiter, LimiterPermit};
pub use models::{
    extension_of, Chunk, Classification, Document, ExtractionUnit, Rule, RuleType, UnitMetadata,
};
pub use tasks::{TaskRegistry, TrackedTask};
