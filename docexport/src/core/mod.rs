//! Core value types: page references, export jobs and page content.

mod job;
mod page;

pub use job::{
    ExportJob, ExportStatusReport, ExportSubmission, JobState, JobStatus,
    MISSING_CONTENT_LOCATOR, UNSPECIFIED_FAILURE,
};
pub use page::{ExportFormat, PageContent, PageRef};
