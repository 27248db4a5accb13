//! Minimal cleanup applied to text before it is embedded.
//!
//! Heavier rewriting loses meaning, so only whitespace is touched.

/// Substituted for input that has nothing left after trimming.
pub const EMPTY_INPUT_PLACEHOLDER: &str = "No content";

/// Normalize text for embedding.
///
/// Trims surrounding whitespace, collapses every run of three or more
/// newlines down to exactly two, and replaces empty input with
/// [`EMPTY_INPUT_PLACEHOLDER`].
pub fn normalize_input(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return EMPTY_INPUT_PLACEHOLDER.to_string();
    }

    let mut out = String::with_capacity(trimmed.len());
    let mut newline_run = 0usize;
    for ch in trimmed.chars() {
        if ch == '\n' {
            newline_run += 1;
            if newline_run <= 2 {
                out.push(ch);
            }
        } else {
            newline_run = 0;
            out.push(ch);
        }
    }
    out
}
