//! Testing utilities for the export pipeline.
//!
//! This module provides a scripted [`DocumentService`](crate::client::DocumentService)
//! that replays canned answers and records every call.

mod mocks;

pub use mocks::ScriptedDocumentService;
