pub mod config;
pub mod duplicates;
pub mod error;
pub mod gap_fill;
pub mod outliers;
pub mod pipeline;
pub mod provider;
pub mod schema;
pub mod smoothing;
pub mod splitter;
pub mod types;

pub use config::{InsufficientDataPolicy, ReconcileConfig};
pub use error::{ReconcileError, Result};
pub use pipeline::{reconcile, ReconcileOutput, SkipReason, SkippedUnit, UnitReport};
pub use types::{Observation, Source, UnitId};
