//! Cooperative cancellation for in-flight export pipelines.

mod token;

pub use token::CancellationToken;
