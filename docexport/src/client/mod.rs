//! The document service port.
//!
//! The export stages reach the remote service only through
//! [`DocumentService`]. [`HttpDocumentService`] talks to the real REST API;
//! tests use the scripted implementation in [`crate::testing`] or mockall
//! mocks.

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::HttpDocumentService;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{ExportFormat, ExportStatusReport, ExportSubmission, PageRef};
use crate::errors::ExportError;

/// Text body for a canvas page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasContent {
    /// Format of `content`.
    pub format: ExportFormat,
    /// The page body.
    pub content: String,
}

impl CanvasContent {
    /// Markdown canvas content.
    #[must_use]
    pub fn markdown(content: impl Into<String>) -> Self {
        Self {
            format: ExportFormat::Markdown,
            content: content.into(),
        }
    }
}

/// A page to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPage {
    /// Page name.
    pub name: String,
    /// Initial body, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<CanvasContent>,
}

impl NewPage {
    /// Creates an empty page request.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: None,
        }
    }

    /// Sets the initial body.
    #[must_use]
    pub fn with_content(mut self, content: CanvasContent) -> Self {
        self.content = Some(content);
        self
    }
}

/// Handle of a newly created page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPage {
    /// ID of the new page.
    pub id: String,
    /// Mutation request ID issued by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Browser link to the page, when returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_link: Option<String>,
}

/// How new text is merged into a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertionMode {
    /// Replace the whole body.
    Replace,
    /// Append after the existing body.
    Append,
}

impl InsertionMode {
    /// Wire name of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Append => "append",
        }
    }
}

/// A content update for an existing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUpdate {
    /// Insertion mode.
    pub mode: InsertionMode,
    /// New text.
    pub content: CanvasContent,
}

/// Acknowledgement of an accepted page update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReceipt {
    /// ID of the updated page.
    pub id: String,
    /// Mutation request ID issued by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Operations of the remote document service used by the export pipeline.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentService: Send + Sync {
    /// Starts an export of a page.
    async fn submit_export(
        &self,
        page: &PageRef,
        format: ExportFormat,
    ) -> Result<ExportSubmission, ExportError>;

    /// Queries the status of an export job.
    async fn get_export_status(
        &self,
        page: &PageRef,
        job_id: &str,
    ) -> Result<ExportStatusReport, ExportError>;

    /// Downloads exported content.
    async fn download_content(&self, content_locator: &str) -> Result<String, ExportError>;

    /// Creates a page in a document.
    async fn create_page(
        &self,
        document_id: &str,
        page: &NewPage,
    ) -> Result<CreatedPage, ExportError>;

    /// Replaces or appends to the body of a page.
    async fn update_page_content(
        &self,
        page: &PageRef,
        update: &ContentUpdate,
    ) -> Result<UpdateReceipt, ExportError>;
}
