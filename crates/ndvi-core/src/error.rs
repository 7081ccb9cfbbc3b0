// crates/ndvi-core/src/error.rs

use thiserror::Error;

use crate::config::ConfigError;
use crate::schema::SchemaError;
use crate::smoothing::SmoothingError;
use crate::types::UnitId;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("input table rejected: {0}")]
    Schema(#[from] SchemaError),

    #[error(
        "unit {unit}: dense daily series has {rows} rows but the smoothing window needs {window_length}"
    )]
    InsufficientData {
        unit: UnitId,
        rows: usize,
        window_length: usize,
    },

    #[error("unit {unit}: smoothing failed: {source}")]
    Smoothing {
        unit: UnitId,
        #[source]
        source: SmoothingError,
    },

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("failed to build unit worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
