//! Export job state.
//!
//! An [`ExportJob`] is a plain value owned by one invocation. Stages take it by
//! move and hand it on; it is never shared or persisted.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::page::{ExportFormat, PageRef};

/// Reason recorded when the service reports completion without a locator.
pub const MISSING_CONTENT_LOCATOR: &str = "missing content locator";

/// Reason recorded when the service reports failure without saying why.
pub const UNSPECIFIED_FAILURE: &str = "export failed without a reason";

/// Status of an export job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted but not started.
    #[default]
    Pending,
    /// Rendering in progress.
    InProgress,
    /// Rendered; content can be fetched.
    Complete,
    /// Rendering failed.
    Failed,
}

impl JobStatus {
    /// Whether no further transition can happen.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::InProgress => 1,
            Self::Complete | Self::Failed => 2,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Complete => write!(f, "complete"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One status observation returned by the document service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExportStatusReport {
    /// Reported status.
    pub status: JobStatus,
    /// Where to download the content, when complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_locator: Option<String>,
    /// Why the export failed, when failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl ExportStatusReport {
    /// A report with only a status.
    #[must_use]
    pub fn with_status(status: JobStatus) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// A complete report carrying a content locator.
    #[must_use]
    pub fn complete(content_locator: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Complete,
            content_locator: Some(content_locator.into()),
            failure_reason: None,
        }
    }

    /// A failed report carrying a reason.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            content_locator: None,
            failure_reason: Some(reason.into()),
        }
    }
}

/// The service's answer to an export submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSubmission {
    /// Job handle issued by the service.
    pub job_id: String,
    /// Initial state of the job.
    pub report: ExportStatusReport,
}

impl ExportSubmission {
    /// Creates a submission with the given initial status.
    #[must_use]
    pub fn new(job_id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            job_id: job_id.into(),
            report: ExportStatusReport::with_status(status),
        }
    }
}

/// State of an export job. Locator and reason only exist in terminal states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobState {
    /// Accepted but not started.
    Pending,
    /// Rendering in progress.
    InProgress,
    /// Rendered.
    Complete {
        /// Where to download the content.
        content_locator: String,
    },
    /// Rendering failed.
    Failed {
        /// Failure reason.
        reason: String,
    },
}

impl JobState {
    /// The status of this state.
    #[must_use]
    pub const fn status(&self) -> JobStatus {
        match self {
            Self::Pending => JobStatus::Pending,
            Self::InProgress => JobStatus::InProgress,
            Self::Complete { .. } => JobStatus::Complete,
            Self::Failed { .. } => JobStatus::Failed,
        }
    }

    fn from_report(report: ExportStatusReport) -> Self {
        match report.status {
            JobStatus::Pending => Self::Pending,
            JobStatus::InProgress => Self::InProgress,
            JobStatus::Complete => match non_blank(report.content_locator) {
                Some(content_locator) => Self::Complete { content_locator },
                None => Self::Failed {
                    reason: MISSING_CONTENT_LOCATOR.to_string(),
                },
            },
            JobStatus::Failed => Self::Failed {
                reason: non_blank(report.failure_reason)
                    .unwrap_or_else(|| UNSPECIFIED_FAILURE.to_string()),
            },
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// One export attempt for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportJob {
    job_id: String,
    page: PageRef,
    format: ExportFormat,
    state: JobState,
}

impl ExportJob {
    /// Creates a pending job.
    #[must_use]
    pub fn new(job_id: impl Into<String>, page: PageRef, format: ExportFormat) -> Self {
        Self {
            job_id: job_id.into(),
            page,
            format,
            state: JobState::Pending,
        }
    }

    /// Creates a job from the service's submission answer.
    #[must_use]
    pub fn from_submission(submission: ExportSubmission, page: PageRef, format: ExportFormat) -> Self {
        Self::new(submission.job_id, page, format).observe(submission.report)
    }

    /// Applies a status observation.
    ///
    /// Transitions only move forward along Pending, InProgress, terminal. A
    /// terminal job ignores every observation. Complete without a usable
    /// locator becomes Failed.
    #[must_use]
    pub fn observe(mut self, report: ExportStatusReport) -> Self {
        if self.is_terminal() {
            return self;
        }

        let next = JobState::from_report(report);
        if next.status().rank() >= self.state.status().rank() {
            self.state = next;
        } else {
            tracing::debug!(
                job_id = %self.job_id,
                current = %self.state.status(),
                reported = %next.status(),
                "Ignoring backwards job status"
            );
        }
        self
    }

    /// The job handle.
    #[must_use]
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// The page being exported.
    #[must_use]
    pub fn page(&self) -> &PageRef {
        &self.page
    }

    /// The requested export format.
    #[must_use]
    pub fn format(&self) -> ExportFormat {
        self.format
    }

    /// The full job state.
    #[must_use]
    pub fn state(&self) -> &JobState {
        &self.state
    }

    /// The current status.
    #[must_use]
    pub fn status(&self) -> JobStatus {
        self.state.status()
    }

    /// Whether the job is Complete or Failed.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// The content locator, present only when Complete.
    #[must_use]
    pub fn content_locator(&self) -> Option<&str> {
        match &self.state {
            JobState::Complete { content_locator } => Some(content_locator),
            _ => None,
        }
    }

    /// The failure reason, present only when Failed.
    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        match &self.state {
            JobState::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn job() -> ExportJob {
        ExportJob::new("j1", PageRef::new("doc", "page"), ExportFormat::Markdown)
    }

    #[test]
    fn test_new_job_is_pending() {
        let job = job();
        assert_eq!(job.status(), JobStatus::Pending);
        assert!(job.content_locator().is_none());
        assert!(job.failure_reason().is_none());
    }

    #[test]
    fn test_forward_transitions() {
        let job = job()
            .observe(ExportStatusReport::with_status(JobStatus::InProgress))
            .observe(ExportStatusReport::complete("L1"));

        assert_eq!(job.status(), JobStatus::Complete);
        assert_eq!(job.content_locator(), Some("L1"));
    }

    #[test]
    fn test_backwards_transition_is_ignored() {
        let job = job()
            .observe(ExportStatusReport::with_status(JobStatus::InProgress))
            .observe(ExportStatusReport::with_status(JobStatus::Pending));

        assert_eq!(job.status(), JobStatus::InProgress);
    }

    #[test]
    fn test_terminal_state_is_final() {
        let job = job()
            .observe(ExportStatusReport::failed("render error"))
            .observe(ExportStatusReport::complete("L1"));

        assert_eq!(job.status(), JobStatus::Failed);
        assert_eq!(job.failure_reason(), Some("render error"));
        assert!(job.content_locator().is_none());
    }

    #[test]
    fn test_complete_without_locator_becomes_failed() {
        let job = job().observe(ExportStatusReport::with_status(JobStatus::Complete));
        assert_eq!(job.status(), JobStatus::Failed);
        assert_eq!(job.failure_reason(), Some(MISSING_CONTENT_LOCATOR));

        let job = self::job().observe(ExportStatusReport::complete("   "));
        assert_eq!(job.failure_reason(), Some(MISSING_CONTENT_LOCATOR));
    }

    #[test]
    fn test_failed_without_reason_gets_placeholder() {
        let job = job().observe(ExportStatusReport::with_status(JobStatus::Failed));
        assert_eq!(job.failure_reason(), Some(UNSPECIFIED_FAILURE));
    }

    #[test]
    fn test_from_submission_honors_initial_status() {
        let page = PageRef::new("doc", "page");
        let accepted = ExportJob::from_submission(
            ExportSubmission::new("j1", JobStatus::InProgress),
            page.clone(),
            ExportFormat::Markdown,
        );
        assert_eq!(accepted.status(), JobStatus::InProgress);
        assert_eq!(accepted.job_id(), "j1");

        let done = ExportJob::from_submission(
            ExportSubmission {
                job_id: "j2".to_string(),
                report: ExportStatusReport::complete("L2"),
            },
            page,
            ExportFormat::Html,
        );
        assert_eq!(done.content_locator(), Some("L2"));
        assert_eq!(done.format(), ExportFormat::Html);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(JobStatus::InProgress.to_string(), "in_progress");
        assert!(JobStatus::Complete.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
    }
}
