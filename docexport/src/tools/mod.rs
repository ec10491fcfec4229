//! Tool-facing entry points.
//!
//! This module provides:
//! - Tool definitions with argument schemas
//! - The [`ToolOutput`] result envelope
//! - [`PageTools`], the page content tool set

mod definitions;
mod page_tools;

pub use definitions::{ToolDefinition, ToolOutput};
pub use page_tools::PageTools;
