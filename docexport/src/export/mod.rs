//! The export pipeline.
//!
//! [`ExportRequester`] submits a job, [`ExportPoller`] waits for it to reach a
//! terminal state and [`ContentFetcher`] downloads the rendered text.
//! [`PageContentService`] composes the three.

mod fetcher;
mod poller;
mod requester;
mod service;

pub use fetcher::ContentFetcher;
pub use poller::ExportPoller;
pub use requester::ExportRequester;
pub use service::PageContentService;
