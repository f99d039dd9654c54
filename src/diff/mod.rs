//! Unified diff parsing.
//!
//! Turns `git diff` output into [`Diff`] → [`ChangedFile`] → [`Chunk`] →
//! [`LineChange`] records numbered on both sides.

pub mod chunk;
pub mod file;
pub mod full;
pub mod line;

pub use chunk::Chunk;
pub use file::ChangedFile;
pub use full::Diff;
pub use line::{LineBasis, LineChange, NO_NEWLINE_AT_END_OF_FILE};

/// Lines of `text`, split on `\n` only.
///
/// Unlike [`str::lines`] a `\r` before the newline stays part of the line,
/// so CRLF files keep their line endings through a patch.
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive('\n')
        .map(|line| line.strip_suffix('\n').unwrap_or(line))
}

/// Format a git diff for user display with explicit line numbers
///
/// Additions carry their modified-file number, which is what a selection
/// refers to. Deletions carry their original-file number.
#[must_use]
pub fn format_diff(diff: &Diff) -> String {
    let mut result = String::new();

    for file in &diff.files {
        result.push_str(&file.path);
        result.push_str(":\n");

        for chunk in &file.chunks {
            for change in &chunk.changes {
                match change {
                    LineChange::Deleted {
                        content,
                        line_before,
                    } => result.push_str(&format!("  -{line_before}:\t{content}\n")),
                    LineChange::Added {
                        content,
                        line_after,
                    } => result.push_str(&format!("  +{line_after}:\t{content}\n")),
                    LineChange::Unchanged { .. } | LineChange::EndOfFileMarker { .. } => {}
                }
            }

            result.push('\n');
        }
    }

    // Remove trailing newline if present
    if result.ends_with("\n\n") {
        result.pop();
    }

    result
}
