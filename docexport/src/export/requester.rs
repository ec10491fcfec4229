//! Export submission.

use std::sync::Arc;
use tracing::info;

use crate::client::DocumentService;
use crate::core::{ExportFormat, ExportJob, PageRef};
use crate::errors::ExportError;

/// Submits page exports and turns the answer into an [`ExportJob`].
#[derive(Clone)]
pub struct ExportRequester {
    service: Arc<dyn DocumentService>,
}

impl ExportRequester {
    /// Creates a requester.
    #[must_use]
    pub fn new(service: Arc<dyn DocumentService>) -> Self {
        Self { service }
    }

    /// Starts an export job for `page`.
    ///
    /// The job starts Pending, or in whatever state the service reported on
    /// acceptance. Service errors are returned unchanged.
    pub async fn request_export(
        &self,
        page: &PageRef,
        format: ExportFormat,
    ) -> Result<ExportJob, ExportError> {
        page.validate()?;

        let submission = self.service.submit_export(page, format).await?;
        if submission.job_id.trim().is_empty() {
            return Err(ExportError::TransientService(
                "export submission returned no job id".to_string(),
            ));
        }

        let job = ExportJob::from_submission(submission, page.clone(), format);
        info!(
            job_id = %job.job_id(),
            page = %page,
            format = %format,
            status = %job.status(),
            "Export job created"
        );
        Ok(job)
    }
}

impl std::fmt::Debug for ExportRequester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportRequester").finish_non_exhaustive()
    }
}
