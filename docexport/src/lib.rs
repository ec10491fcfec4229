//! # docexport
//!
//! Page content retrieval for a remote document service whose page bodies are
//! only available through asynchronous server-side export jobs.
//!
//! The crate provides:
//!
//! - **Export pipeline**: submit an export job, poll it to a terminal state
//!   under a bounded backoff policy, then fetch the rendered text
//! - **Page content service**: full content, line-bounded peek, duplicate,
//!   replace and append on top of the pipeline
//! - **Cancellation**: cooperative cancellation that stops polling promptly
//! - **Tool surface**: JSON-in, envelope-out entry points for an agent tool layer
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docexport::prelude::*;
//!
//! let settings = Settings::from_env()?;
//! let client = HttpDocumentService::new(settings.api.clone())?;
//! let service = PageContentService::new(Arc::new(client), settings.poll.clone())?;
//!
//! let page = PageRef::new("AbCdEf", "Roadmap");
//! let preview = service.peek(&page, 5, &CancellationToken::new()).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod client;
pub mod config;
pub mod core;
pub mod errors;
pub mod export;
pub mod observability;
pub mod testing;
pub mod tools;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    #[cfg(feature = "http")]
    pub use crate::client::HttpDocumentService;
    pub use crate::client::{
        ContentUpdate, CreatedPage, DocumentService, InsertionMode, NewPage, UpdateReceipt,
    };
    pub use crate::config::{ApiConfig, JitterStrategy, LogConfig, PollPolicy, Settings};
    pub use crate::core::{
        ExportFormat, ExportJob, ExportStatusReport, ExportSubmission, JobState, JobStatus,
        PageContent, PageRef,
    };
    pub use crate::errors::{ErrorKind, ExportError, PageContentError, PipelineStage};
    pub use crate::export::{ContentFetcher, ExportPoller, ExportRequester, PageContentService};
    pub use crate::tools::{PageTools, ToolOutput};
}
