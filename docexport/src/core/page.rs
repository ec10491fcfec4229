//! Page references, export formats and materialized page content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::errors::ExportError;
use crate::utils::{require_non_blank, split_lines};

/// Identifies a page inside a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRef {
    /// The document ID.
    pub document_id: String,
    /// The page ID or page name.
    pub page_id_or_name: String,
}

impl PageRef {
    /// Creates a new page reference.
    #[must_use]
    pub fn new(document_id: impl Into<String>, page_id_or_name: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            page_id_or_name: page_id_or_name.into(),
        }
    }

    /// Rejects blank document or page identifiers.
    pub fn validate(&self) -> Result<(), ExportError> {
        require_non_blank("document id", &self.document_id)?;
        require_non_blank("page id or name", &self.page_id_or_name)
    }
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc/{}/page/{}", self.document_id, self.page_id_or_name)
    }
}

/// Output format of a page export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Markdown text.
    #[default]
    Markdown,
    /// HTML text.
    Html,
}

impl ExportFormat {
    /// Wire name of the format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fully materialized text of a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    text: String,
    source_page: PageRef,
    format: ExportFormat,
    exported_at: DateTime<Utc>,
}

impl PageContent {
    /// Creates page content stamped with the current time.
    #[must_use]
    pub fn new(text: impl Into<String>, source_page: PageRef, format: ExportFormat) -> Self {
        Self {
            text: text.into(),
            source_page,
            format,
            exported_at: Utc::now(),
        }
    }

    /// The page text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consumes the content and returns the text.
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }

    /// The page this content was exported from.
    #[must_use]
    pub fn source_page(&self) -> &PageRef {
        &self.source_page
    }

    /// The export format of the text.
    #[must_use]
    pub fn format(&self) -> ExportFormat {
        self.format
    }

    /// When the content was materialized.
    #[must_use]
    pub fn exported_at(&self) -> DateTime<Utc> {
        self.exported_at
    }

    /// Whether the page has no text at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of lines, treating `\n` and `\r\n` as separators.
    ///
    /// A trailing terminator ends the last line; it does not start a new one.
    #[must_use]
    pub fn line_count(&self) -> usize {
        split_lines(&self.text).count() - usize::from(self.text.ends_with('\n'))
    }

    /// Hex SHA-256 of the text.
    ///
    /// Two exports of the same page get different locators; compare their
    /// fingerprints instead.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.text.as_bytes()))
    }
}
