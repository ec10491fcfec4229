//! Page content service.
//!
//! Runs Requester, Poller and Fetcher in sequence and layers peek, duplicate,
//! replace and append on top. Each stage failure is wrapped with the page and
//! stage but keeps its kind.

use std::sync::Arc;
use tracing::{info, warn};

use super::{ContentFetcher, ExportPoller, ExportRequester};
use crate::cancellation::CancellationToken;
use crate::client::{
    CanvasContent, ContentUpdate, CreatedPage, DocumentService, InsertionMode, NewPage,
    UpdateReceipt,
};
use crate::config::PollPolicy;
use crate::errors::ConfigError;
use crate::core::{ExportFormat, PageContent, PageRef};
use crate::errors::{ExportError, PageContentError, PipelineStage};
use crate::observability::SpanTimer;
use crate::utils::{require_non_blank, require_positive, take_lines};

/// High-level page content operations.
#[derive(Clone)]
pub struct PageContentService {
    service: Arc<dyn DocumentService>,
    requester: ExportRequester,
    poller: ExportPoller,
    fetcher: ContentFetcher,
    policy: PollPolicy,
    format: ExportFormat,
}

impl PageContentService {
    /// Creates a service exporting markdown under `policy`.
    ///
    /// Fails if the policy does not pass [`PollPolicy::validate`].
    pub fn new(service: Arc<dyn DocumentService>, policy: PollPolicy) -> Result<Self, ConfigError> {
        policy.validate()?;
        Ok(Self {
            requester: ExportRequester::new(service.clone()),
            poller: ExportPoller::new(service.clone()),
            fetcher: ContentFetcher::new(service.clone()),
            service,
            policy,
            format: ExportFormat::Markdown,
        })
    }

    /// Sets the export format.
    #[must_use]
    pub fn with_format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }

    /// The poll policy in use.
    #[must_use]
    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Exports a page and returns its text.
    ///
    /// Returns `None` when every stage succeeded but the page is empty.
    pub async fn get_full_content(
        &self,
        page: &PageRef,
        cancel: &CancellationToken,
    ) -> Result<Option<PageContent>, PageContentError> {
        let timer = SpanTimer::start("page.get_full_content");
        let stage = |stage: PipelineStage| move |e: ExportError| fail(page, stage, e);

        page.validate().map_err(stage(PipelineStage::Validate))?;
        if cancel.is_cancelled() {
            return Err(fail(page, PipelineStage::Request, caller_cancelled(cancel)));
        }

        let job = self
            .requester
            .request_export(page, self.format)
            .await
            .map_err(stage(PipelineStage::Request))?;

        let job = self
            .poller
            .await_completion(job, &self.policy, cancel)
            .await
            .map_err(stage(PipelineStage::Poll))?;

        if let Some(reason) = job.failure_reason() {
            return Err(fail(
                page,
                PipelineStage::Poll,
                ExportError::JobFailed {
                    job_id: job.job_id().to_string(),
                    reason: reason.to_string(),
                },
            ));
        }
        if cancel.is_cancelled() {
            return Err(fail(page, PipelineStage::Fetch, caller_cancelled(cancel)));
        }

        let content = self
            .fetcher
            .fetch_content(job)
            .await
            .map_err(stage(PipelineStage::Fetch))?;

        info!(
            page = %page,
            lines = content.line_count(),
            duration_ms = timer.finish(),
            "Page content exported"
        );
        Ok((!content.is_empty()).then_some(content))
    }

    /// Returns the first `num_lines` lines of a page joined with `\n`.
    pub async fn peek(
        &self,
        page: &PageRef,
        num_lines: usize,
        cancel: &CancellationToken,
    ) -> Result<String, PageContentError> {
        require_positive("numLines", num_lines)
            .map_err(|e| fail(page, PipelineStage::Validate, e))?;

        let content = self.get_full_content(page, cancel).await?;
        Ok(content
            .map(|c| take_lines(c.text(), num_lines))
            .unwrap_or_default())
    }

    /// Copies a page's content into a new page named `new_name` in the same
    /// document. Nothing is created if the content cannot be read.
    pub async fn duplicate(
        &self,
        page: &PageRef,
        new_name: &str,
        cancel: &CancellationToken,
    ) -> Result<CreatedPage, PageContentError> {
        require_non_blank("newName", new_name)
            .map_err(|e| fail(page, PipelineStage::Validate, e))?;

        let content = self.get_full_content(page, cancel).await?;
        if cancel.is_cancelled() {
            return Err(fail(
                page,
                PipelineStage::Create,
                ExportError::Cancelled("duplicate cancelled before page creation".to_string()),
            ));
        }

        let mut new_page = NewPage::new(new_name);
        if let Some(content) = content {
            new_page = new_page.with_content(CanvasContent {
                format: content.format(),
                content: content.into_text(),
            });
        }

        let created = self
            .service
            .create_page(&page.document_id, &new_page)
            .await
            .map_err(|e| fail(page, PipelineStage::Create, e))?;

        info!(page = %page, new_page_id = %created.id, "Page duplicated");
        Ok(created)
    }

    /// Creates a page, optionally with a markdown body.
    pub async fn create_page(
        &self,
        document_id: &str,
        name: &str,
        content: Option<&str>,
    ) -> Result<CreatedPage, PageContentError> {
        let target = PageRef::new(document_id, name);
        require_non_blank("docId", document_id)
            .and_then(|()| require_non_blank("name", name))
            .map_err(|e| fail(&target, PipelineStage::Validate, e))?;

        let mut new_page = NewPage::new(name);
        if let Some(content) = content {
            new_page = new_page.with_content(CanvasContent::markdown(content));
        }

        self.service
            .create_page(document_id, &new_page)
            .await
            .map_err(|e| fail(&target, PipelineStage::Create, e))
    }

    /// Replaces the body of a page.
    pub async fn replace(
        &self,
        page: &PageRef,
        content: &str,
        format: ExportFormat,
    ) -> Result<UpdateReceipt, PageContentError> {
        self.update(page, InsertionMode::Replace, content, format).await
    }

    /// Appends to the body of a page.
    pub async fn append(
        &self,
        page: &PageRef,
        content: &str,
        format: ExportFormat,
    ) -> Result<UpdateReceipt, PageContentError> {
        self.update(page, InsertionMode::Append, content, format).await
    }

    async fn update(
        &self,
        page: &PageRef,
        mode: InsertionMode,
        content: &str,
        format: ExportFormat,
    ) -> Result<UpdateReceipt, PageContentError> {
        page.validate()
            .map_err(|e| fail(page, PipelineStage::Validate, e))?;

        let update = ContentUpdate {
            mode,
            content: CanvasContent {
                format,
                content: content.to_string(),
            },
        };
        let receipt = self
            .service
            .update_page_content(page, &update)
            .await
            .map_err(|e| fail(page, PipelineStage::Update, e))?;

        info!(page = %page, mode = mode.as_str(), "Page content updated");
        Ok(receipt)
    }
}

impl std::fmt::Debug for PageContentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageContentService")
            .field("policy", &self.policy)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

fn caller_cancelled(cancel: &CancellationToken) -> ExportError {
    ExportError::Cancelled(
        cancel
            .reason()
            .unwrap_or_else(|| "cancelled by caller".to_string()),
    )
}

fn fail(page: &PageRef, stage: PipelineStage, error: ExportError) -> PageContentError {
    warn!(
        page = %page,
        stage = %stage,
        kind = %error.kind(),
        error = %error,
        "Page content operation failed"
    );
    PageContentError::new(page.clone(), stage, error)
}
