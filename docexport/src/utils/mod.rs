//! Text and argument helpers shared by the export stages and tools.

mod text;
mod validation;

pub use text::{split_lines, take_lines};
pub use validation::{require_non_blank, require_positive};
