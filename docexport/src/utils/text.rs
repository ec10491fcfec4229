//! Line handling for page previews.

/// Splits text into lines, treating both `\n` and `\r\n` as separators.
///
/// Empty text has no lines. A trailing terminator yields a final empty line,
/// so joining the lines with `\n` keeps it.
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    (!text.is_empty())
        .then(|| text.split('\n'))
        .into_iter()
        .flatten()
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
}

/// Returns the first `n` lines of `text` joined with `\n`.
///
/// Text with fewer than `n` lines is returned whole, re-joined, without padding.
#[must_use]
pub fn take_lines(text: &str, n: usize) -> String {
    split_lines(text).take(n).collect::<Vec<_>>().join("\n")
}
