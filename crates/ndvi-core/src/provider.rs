// crates/ndvi-core/src/provider.rs

use std::fmt;

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque identifier handed out by a provider when a request is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Succeeded,
    Failed(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("job {0} is not known to this provider")]
    UnknownJob(JobId),
    #[error("job {0} has not finished")]
    NotReady(JobId),
    #[error("job {job} failed: {reason}")]
    JobFailed { job: JobId, reason: String },
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

/// Upstream source of raw observation tables.
///
/// Submitting, polling and transport are the provider's business; the reconciliation
/// core only consumes the table returned by [`NdviProvider::fetch`].
pub trait NdviProvider: Send + Sync {
    type Request;

    fn submit(&self, request: &Self::Request) -> Result<JobId, ProviderError>;
    fn status(&self, job: &JobId) -> Result<JobStatus, ProviderError>;
    fn fetch(&self, job: &JobId) -> Result<DataFrame, ProviderError>;
}

/// Fetches the table of a job that has already reached a terminal state.
pub fn fetch_completed<P>(provider: &P, job: &JobId) -> Result<DataFrame, ProviderError>
where
    P: NdviProvider + ?Sized,
{
    let status = provider.status(job)?;
    if !status.is_terminal() {
        return Err(ProviderError::NotReady(job.clone()));
    }
    match status {
        JobStatus::Failed(reason) => Err(ProviderError::JobFailed {
            job: job.clone(),
            reason,
        }),
        _ => provider.fetch(job),
    }
}
