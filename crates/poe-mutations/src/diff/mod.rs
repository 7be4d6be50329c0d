//! Dry-run diff rendering
//!
//! Diffs are computed between the current and proposed content of a file,
//! after redaction, so they are safe to paste into logs.

pub mod redact;

use similar::TextDiff;

use crate::format::FormatKind;

pub use redact::{redact, REDACTED};

/// Lines of context around each hunk
const CONTEXT_RADIUS: usize = 3;

/// Render a redacted unified diff as a list of lines
///
/// A missing side (`None`) is treated as an empty file. Identical inputs
/// produce no lines.
#[must_use]
pub fn render_diff(
    display_path: &str,
    previous: Option<&str>,
    next: Option<&str>,
    format: Option<FormatKind>,
) -> Vec<String> {
    let previous = redact(previous.unwrap_or_default(), format);
    let next = redact(next.unwrap_or_default(), format);
    generate_unified_diff(display_path, &previous, &next)
}

/// Unified diff between two texts, without redaction
#[must_use]
pub fn generate_unified_diff(display_path: &str, old: &str, new: &str) -> Vec<String> {
    if old == new {
        return Vec::new();
    }

    let diff = TextDiff::from_lines(old, new);
    let old_header = format!("a/{display_path}");
    let new_header = format!("b/{display_path}");
    diff.unified_diff()
        .context_radius(CONTEXT_RADIUS)
        .header(&old_header, &new_header)
        .to_string()
        .lines()
        .map(str::to_string)
        .collect()
}
