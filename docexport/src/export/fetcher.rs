//! Exported content download.

use std::sync::Arc;
use tracing::debug;

use crate::client::DocumentService;
use crate::core::{ExportJob, PageContent};
use crate::errors::ExportError;

/// Downloads the rendered text of a completed export job.
#[derive(Clone)]
pub struct ContentFetcher {
    service: Arc<dyn DocumentService>,
}

impl ContentFetcher {
    /// Creates a fetcher.
    #[must_use]
    pub fn new(service: Arc<dyn DocumentService>) -> Self {
        Self { service }
    }

    /// Retrieves the content of a Complete job.
    ///
    /// Makes exactly one download attempt. Every failure is reported as
    /// `Fetch`; an empty body is valid content.
    pub async fn fetch_content(&self, job: ExportJob) -> Result<PageContent, ExportError> {
        let Some(locator) = job.content_locator() else {
            return Err(ExportError::Fetch(format!(
                "export job {} is {}, not complete",
                job.job_id(),
                job.status()
            )));
        };

        let text = self
            .service
            .download_content(locator)
            .await
            .map_err(|e| match e {
                ExportError::Fetch(message) => ExportError::Fetch(message),
                other => ExportError::Fetch(format!(
                    "download for export job {} failed: {other}",
                    job.job_id()
                )),
            })?;

        debug!(job_id = %job.job_id(), bytes = text.len(), "Export content downloaded");
        Ok(PageContent::new(text, job.page().clone(), job.format()))
    }
}

impl std::fmt::Debug for ContentFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentFetcher").finish_non_exhaustive()
    }
}
