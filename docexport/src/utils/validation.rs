//! Argument validation helpers.

use crate::errors::ExportError;

/// Rejects an empty or whitespace-only value.
pub fn require_non_blank(field: &str, value: &str) -> Result<(), ExportError> {
    if value.trim().is_empty() {
        return Err(ExportError::InvalidArgument(format!(
            "{field} must not be empty"
        )));
    }
    Ok(())
}

/// Rejects zero.
pub fn require_positive(field: &str, value: usize) -> Result<(), ExportError> {
    if value == 0 {
        return Err(ExportError::InvalidArgument(format!(
            "{field} must be a positive integer"
        )));
    }
    Ok(())
}
