// crates/ndvi/src/local.rs

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use ndvi_core::provider::{JobId, JobStatus, NdviProvider, ProviderError};
use polars::prelude::DataFrame;
use tracing::debug;
use uuid::Uuid;

use crate::io::{read_table, TableFormat, TableIoError};

/// Provider backed by tables already on local disk. A submitted path is a finished
/// job as soon as it exists.
#[derive(Debug, Default)]
pub struct LocalFileProvider {
    jobs: Mutex<HashMap<JobId, PathBuf>>,
}

impl LocalFileProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn path_for(&self, job: &JobId) -> Result<PathBuf, ProviderError> {
        let jobs = self
            .jobs
            .lock()
            .map_err(|_| ProviderError::Rejected("job registry poisoned".to_string()))?;
        jobs.get(job)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownJob(job.clone()))
    }
}

impl NdviProvider for LocalFileProvider {
    type Request = PathBuf;

    fn submit(&self, request: &PathBuf) -> Result<JobId, ProviderError> {
        TableFormat::from_path(request).map_err(|err| ProviderError::Rejected(err.to_string()))?;

        let job = JobId::new(Uuid::new_v4().to_string());
        let mut jobs = self
            .jobs
            .lock()
            .map_err(|_| ProviderError::Rejected("job registry poisoned".to_string()))?;
        jobs.insert(job.clone(), request.clone());
        debug!(job = %job, path = %request.display(), "registered local table");
        Ok(job)
    }

    fn status(&self, job: &JobId) -> Result<JobStatus, ProviderError> {
        let path = self.path_for(job)?;
        if path.is_file() {
            Ok(JobStatus::Succeeded)
        } else {
            Ok(JobStatus::Failed(format!("{} does not exist", path.display())))
        }
    }

    fn fetch(&self, job: &JobId) -> Result<DataFrame, ProviderError> {
        let path = self.path_for(job)?;
        read_table(&path).map_err(|err| match err {
            TableIoError::Io { source, .. } => ProviderError::Io(source),
            TableIoError::Polars { source, .. } => ProviderError::Polars(source),
            other => ProviderError::Rejected(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndvi_core::provider::fetch_completed;

    #[test]
    fn missing_file_is_a_failed_job() {
        let dir = tempfile::tempdir().expect("tempdir");
        let provider = LocalFileProvider::new();
        let job = provider
            .submit(&dir.path().join("absent.parquet"))
            .expect("submit");

        assert!(matches!(
            provider.status(&job).expect("status"),
            JobStatus::Failed(_)
        ));
        assert!(matches!(
            fetch_completed(&provider, &job),
            Err(ProviderError::JobFailed { .. })
        ));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let provider = LocalFileProvider::new();
        let result = provider.submit(&PathBuf::from("observations.json"));
        assert!(matches!(result, Err(ProviderError::Rejected(_))));
    }
}
