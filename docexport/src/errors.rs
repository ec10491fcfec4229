//! Error types for the export pipeline.
//!
//! Every stage fails with the most specific [`ExportError`] it can. The page
//! content service wraps stage failures in [`PageContentError`], which adds the
//! page reference and the failed stage but never changes the error kind.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::core::{JobStatus, PageRef};

/// Errors raised by the export stages and the document service port.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    /// The document or page does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request was malformed or not authorized.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The service was unreachable or answered with a server error.
    #[error("service unavailable: {0}")]
    TransientService(String),

    /// The export job did not reach a terminal state within the poll budget.
    #[error(
        "export job {job_id} still {last_status} after {attempts} status checks ({elapsed_ms} ms)"
    )]
    PollTimeout {
        /// Job that was being polled.
        job_id: String,
        /// Last status observed before giving up.
        last_status: JobStatus,
        /// Number of status queries issued.
        attempts: usize,
        /// Time spent polling in milliseconds.
        elapsed_ms: u64,
    },

    /// The exported content could not be retrieved.
    #[error("content fetch failed: {0}")]
    Fetch(String),

    /// The remote service reported that the export failed.
    #[error("export job {job_id} failed: {reason}")]
    JobFailed {
        /// Job that failed.
        job_id: String,
        /// Failure reason reported by the service.
        reason: String,
    },

    /// The caller cancelled the operation.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// An argument was rejected before any remote call was made.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ExportError {
    /// Returns the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::TransientService(_) => ErrorKind::TransientService,
            Self::PollTimeout { .. } => ErrorKind::PollTimeout,
            Self::Fetch(_) => ErrorKind::Fetch,
            Self::JobFailed { .. } => ErrorKind::JobFailed,
            Self::Cancelled(_) => ErrorKind::Cancelled,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }

    /// Whether re-running the whole pipeline may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Copyable classification of an [`ExportError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Page or document absent.
    NotFound,
    /// Bad arguments or authorization.
    InvalidRequest,
    /// Network failure or server error.
    #[serde(rename = "transient_service_error")]
    TransientService,
    /// Poll budget exhausted.
    PollTimeout,
    /// Content locator unusable.
    #[serde(rename = "fetch_error")]
    Fetch,
    /// Export reported as failed by the service.
    JobFailed,
    /// Cancelled by the caller.
    Cancelled,
    /// Argument rejected locally.
    InvalidArgument,
}

impl ErrorKind {
    /// Stable name used in tool envelopes and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::InvalidRequest => "invalid_request",
            Self::TransientService => "transient_service_error",
            Self::PollTimeout => "poll_timeout",
            Self::Fetch => "fetch_error",
            Self::JobFailed => "job_failed",
            Self::Cancelled => "cancelled",
            Self::InvalidArgument => "invalid_argument",
        }
    }

    /// Whether a caller may retry the whole pipeline.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::TransientService | Self::PollTimeout)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The stage of the page content service where a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Argument validation, before any remote call.
    Validate,
    /// Export submission.
    Request,
    /// Export status polling.
    Poll,
    /// Content download.
    Fetch,
    /// Page creation.
    Create,
    /// Page content update.
    Update,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validate => write!(f, "validate"),
            Self::Request => write!(f, "export request"),
            Self::Poll => write!(f, "export poll"),
            Self::Fetch => write!(f, "content fetch"),
            Self::Create => write!(f, "page create"),
            Self::Update => write!(f, "page update"),
        }
    }
}

/// An [`ExportError`] with the page and stage it happened at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage} failed for {page}: {source}")]
pub struct PageContentError {
    /// Page the operation targeted.
    pub page: PageRef,
    /// Stage that failed.
    pub stage: PipelineStage,
    /// The underlying error, unchanged.
    #[source]
    pub source: ExportError,
}

impl PageContentError {
    /// Wraps an error with page and stage context.
    #[must_use]
    pub fn new(page: PageRef, stage: PipelineStage, source: ExportError) -> Self {
        Self {
            page,
            stage,
            source,
        }
    }

    /// Returns the kind of the underlying error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required setting was not provided.
    #[error("missing required setting {0}")]
    Missing(String),

    /// A setting could not be parsed.
    #[error("invalid value for {key}: {message}")]
    Invalid {
        /// Setting name.
        key: String,
        /// What was wrong with it.
        message: String,
    },
}

impl ConfigError {
    /// Creates an invalid-value error.
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_is_preserved_by_context() {
        let err = PageContentError::new(
            PageRef::new("doc1", "page1"),
            PipelineStage::Request,
            ExportError::TransientService("HTTP 503".to_string()),
        );

        assert_eq!(err.kind(), ErrorKind::TransientService);
        assert!(err.kind().is_retryable());
    }

    #[test]
    fn test_context_message_names_stage_and_page() {
        let err = PageContentError::new(
            PageRef::new("doc1", "Roadmap"),
            PipelineStage::Poll,
            ExportError::PollTimeout {
                job_id: "j1".to_string(),
                last_status: JobStatus::InProgress,
                attempts: 3,
                elapsed_ms: 1500,
            },
        );

        assert_eq!(
            err.to_string(),
            "export poll failed for doc/doc1/page/Roadmap: export job j1 still in_progress after 3 status checks (1500 ms)"
        );
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ExportError::TransientService(String::new()).is_retryable());
        assert!(!ExportError::NotFound(String::new()).is_retryable());
        assert!(!ExportError::InvalidRequest(String::new()).is_retryable());
        assert!(!ExportError::Fetch(String::new()).is_retryable());
        assert!(!ExportError::JobFailed {
            job_id: "j".to_string(),
            reason: "r".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_kind_names_are_stable() {
        assert_eq!(ErrorKind::TransientService.as_str(), "transient_service_error");
        assert_eq!(ErrorKind::PollTimeout.to_string(), "poll_timeout");
        assert_eq!(
            serde_json::to_value(ErrorKind::JobFailed).unwrap(),
            serde_json::json!("job_failed")
        );
    }
}
