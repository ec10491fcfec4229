//! Configuration types for API access, polling and logging.

mod policy;
mod settings;

pub use policy::{Backoff, JitterStrategy, PollPolicy};
pub use settings::{ApiConfig, LogConfig, LogFormat, Settings};
