//! Scripted in-memory document service for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;

use crate::client::{ContentUpdate, CreatedPage, DocumentService, NewPage, UpdateReceipt};
use crate::core::{ExportFormat, ExportStatusReport, ExportSubmission, JobStatus, PageRef};
use crate::errors::ExportError;

type StatusResult = Result<ExportStatusReport, ExportError>;

/// A [`DocumentService`] that replays scripted answers and records calls.
///
/// Status answers are consumed in order; once the script runs out the
/// default status is returned (InProgress unless changed).
#[derive(Debug)]
pub struct ScriptedDocumentService {
    submissions: Mutex<VecDeque<Result<ExportSubmission, ExportError>>>,
    statuses: Mutex<VecDeque<StatusResult>>,
    default_status: Mutex<StatusResult>,
    status_latency: Mutex<Duration>,
    downloads: Mutex<HashMap<String, Result<String, ExportError>>>,
    create_result: Mutex<Option<Result<CreatedPage, ExportError>>>,
    update_result: Mutex<Option<Result<UpdateReceipt, ExportError>>>,
    calls: Mutex<Vec<String>>,
    status_offsets: Mutex<Vec<Instant>>,
    created: Mutex<Vec<(String, NewPage)>>,
    updates: Mutex<Vec<(PageRef, ContentUpdate)>>,
}

impl Default for ScriptedDocumentService {
    fn default() -> Self {
        Self {
            submissions: Mutex::new(VecDeque::new()),
            statuses: Mutex::new(VecDeque::new()),
            default_status: Mutex::new(Ok(ExportStatusReport::with_status(JobStatus::InProgress))),
            status_latency: Mutex::new(Duration::ZERO),
            downloads: Mutex::new(HashMap::new()),
            create_result: Mutex::new(None),
            update_result: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            status_offsets: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedDocumentService {
    /// Creates an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a full successful export: `in_progress` polls, then completion
    /// at `locator`, whose download returns `text`.
    #[must_use]
    pub fn with_export(job_id: &str, in_progress: usize, locator: &str, text: &str) -> Self {
        let service = Self::new();
        service.push_submission(Ok(ExportSubmission::new(job_id, JobStatus::Pending)));
        for _ in 0..in_progress {
            service.push_status(Ok(ExportStatusReport::with_status(JobStatus::InProgress)));
        }
        service.push_status(Ok(ExportStatusReport::complete(locator)));
        service.set_download(locator, Ok(text.to_string()));
        service
    }

    /// Queues an answer to `submit_export`.
    pub fn push_submission(&self, result: Result<ExportSubmission, ExportError>) {
        self.submissions.lock().push_back(result);
    }

    /// Queues an answer to `get_export_status`.
    pub fn push_status(&self, result: StatusResult) {
        self.statuses.lock().push_back(result);
    }

    /// Sets the answer used once the status script is exhausted.
    pub fn set_default_status(&self, result: StatusResult) {
        *self.default_status.lock() = result;
    }

    /// Makes every status query take `latency` before answering.
    pub fn set_status_latency(&self, latency: Duration) {
        *self.status_latency.lock() = latency;
    }

    /// Sets the answer for downloads of `locator`.
    pub fn set_download(&self, locator: &str, result: Result<String, ExportError>) {
        self.downloads.lock().insert(locator.to_string(), result);
    }

    /// Sets the answer to `create_page`.
    pub fn set_create_result(&self, result: Result<CreatedPage, ExportError>) {
        *self.create_result.lock() = Some(result);
    }

    /// Sets the answer to `update_page_content`.
    pub fn set_update_result(&self, result: Result<UpdateReceipt, ExportError>) {
        *self.update_result.lock() = Some(result);
    }

    /// Names of the operations called, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Number of `get_export_status` calls.
    #[must_use]
    pub fn status_calls(&self) -> usize {
        self.status_offsets.lock().len()
    }

    /// When each `get_export_status` call started.
    #[must_use]
    pub fn status_call_offsets(&self) -> Vec<Instant> {
        self.status_offsets.lock().clone()
    }

    /// Pages passed to `create_page`, with their document ids.
    #[must_use]
    pub fn created_pages(&self) -> Vec<(String, NewPage)> {
        self.created.lock().clone()
    }

    /// Updates passed to `update_page_content`.
    #[must_use]
    pub fn updates(&self) -> Vec<(PageRef, ContentUpdate)> {
        self.updates.lock().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().push(call.to_string());
    }
}

#[async_trait]
impl DocumentService for ScriptedDocumentService {
    async fn submit_export(
        &self,
        _page: &PageRef,
        _format: ExportFormat,
    ) -> Result<ExportSubmission, ExportError> {
        self.record("submit_export");
        self.submissions
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(ExportSubmission::new("job-1", JobStatus::Pending)))
    }

    async fn get_export_status(
        &self,
        _page: &PageRef,
        _job_id: &str,
    ) -> Result<ExportStatusReport, ExportError> {
        self.record("get_export_status");
        self.status_offsets.lock().push(Instant::now());

        let latency = *self.status_latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let scripted = self.statuses.lock().pop_front();
        scripted.unwrap_or_else(|| self.default_status.lock().clone())
    }

    async fn download_content(&self, content_locator: &str) -> Result<String, ExportError> {
        self.record("download_content");
        self.downloads
            .lock()
            .get(content_locator)
            .cloned()
            .unwrap_or_else(|| {
                Err(ExportError::NotFound(format!(
                    "no content at {content_locator}"
                )))
            })
    }

    async fn create_page(
        &self,
        document_id: &str,
        page: &NewPage,
    ) -> Result<CreatedPage, ExportError> {
        self.record("create_page");
        let result = self.create_result.lock().clone();
        let result = result.unwrap_or_else(|| {
            Ok(CreatedPage {
                id: format!("canvas-{}", self.created.lock().len() + 1),
                request_id: Some("mutate-create".to_string()),
                browser_link: None,
            })
        });
        if result.is_ok() {
            self.created
                .lock()
                .push((document_id.to_string(), page.clone()));
        }
        result
    }

    async fn update_page_content(
        &self,
        page: &PageRef,
        update: &ContentUpdate,
    ) -> Result<UpdateReceipt, ExportError> {
        self.record("update_page_content");
        let result = self.update_result.lock().clone();
        let result = result.unwrap_or_else(|| {
            Ok(UpdateReceipt {
                id: page.page_id_or_name.clone(),
                request_id: Some("mutate-update".to_string()),
            })
        });
        if result.is_ok() {
            self.updates.lock().push((page.clone(), update.clone()));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_script_then_default() {
        let service = ScriptedDocumentService::new();
        service.push_status(Ok(ExportStatusReport::complete("L1")));
        let page = PageRef::new("d", "p");

        let first = service.get_export_status(&page, "j").await.unwrap();
        let second = service.get_export_status(&page, "j").await.unwrap();

        assert_eq!(first.status, JobStatus::Complete);
        assert_eq!(second.status, JobStatus::InProgress);
        assert_eq!(service.status_calls(), 2);
    }

    #[tokio::test]
    async fn test_with_export_scripts_whole_pipeline() {
        let service = ScriptedDocumentService::with_export("j1", 1, "L1", "body");
        let page = PageRef::new("d", "p");

        let submission = service.submit_export(&page, ExportFormat::Markdown).await.unwrap();
        assert_eq!(submission.job_id, "j1");
        assert_eq!(service.download_content("L1").await.unwrap(), "body");
        assert!(service.download_content("L2").await.is_err());
        assert_eq!(
            service.calls(),
            vec!["submit_export", "download_content", "download_content"]
        );
    }
}
