//! Parsing for `FILE:LINES` selection syntax.
//!
//! This module handles parsing user input like `src/main.rs:10..15` into a
//! [`FileSelection`]: the file and the working-tree lines to stage.
//!
//! # Syntax
//!
//! The expected format is `FILE:LINES` where:
//! - `FILE` is a file path (cannot be empty)
//! - `LINES` is either `N` or `N..M` (1-based, inclusive, `N <= M`)
//!
//! Line numbers refer to the file as it is in the working tree, which is
//! what an editor shows. The path may itself contain colons; the last one
//! separates it from the lines.
//!
//! # Examples
//!
//! ```
//! use git_stage_lines::parse::parse_selection;
//!
//! let selection = parse_selection("flake.nix:137").unwrap();
//! assert_eq!(selection.file, "flake.nix");
//! assert_eq!((selection.range.start(), selection.range.end()), (137, 137));
//!
//! let selection = parse_selection("config.nix:10..15").unwrap();
//! assert_eq!(selection.range.lines(), 6);
//! ```

use error_set::error_set;
use std::num::NonZeroU32;

use crate::line_range::LineRange;

error_set! {
    /// Errors from parsing FILE:LINES syntax
    ParseError := {
        /// Input string does not contain a colon separator
        #[display("Invalid format '{input}': expected 'file:lines'")]
        InvalidFormat { input: String },
        /// File name portion before the colon is empty or whitespace
        #[display("Invalid format '{input}': file name cannot be empty")]
        EmptyFileName { input: String },
        /// Nothing after the colon
        #[display("No lines provided")]
        EmptyLines,
        /// Line number could not be parsed as a valid non-zero u32
        #[display("Invalid line number '{value}'")]
        InvalidLineNumber { value: String },
        /// Range has start greater than end
        #[display("Invalid range {start}..{end}: start must be <= end")]
        InvalidRange { start: u32, end: u32 },
    }
}

/// A file and the lines of it to stage.
#[derive(Debug, Clone, PartialEq)]
pub struct FileSelection {
    /// The file path, relative to the repository root
    pub file: String,
    /// Working-tree lines, 1-based and inclusive
    pub range: LineRange,
}

/// Parse a `FILE:LINES` string into a [`FileSelection`].
///
/// # Errors
///
/// Returns [`ParseError`] if:
/// - Input doesn't contain `:` separator
/// - File name is empty or whitespace
/// - No lines provided
/// - Line numbers are invalid or the range is inverted
pub fn parse_selection(input: &str) -> Result<FileSelection, ParseError> {
    let Some((file, lines)) = input.rsplit_once(':') else {
        return Err(ParseError::InvalidFormat {
            input: input.to_string(),
        });
    };

    let file = file.trim();
    if file.is_empty() {
        return Err(ParseError::EmptyFileName {
            input: input.to_string(),
        });
    }

    Ok(FileSelection {
        file: file.to_string(),
        range: parse_lines(lines.trim())?,
    })
}

/// Parse the lines part (after the colon): `N` or `N..M`
fn parse_lines(input: &str) -> Result<LineRange, ParseError> {
    if input.is_empty() {
        return Err(ParseError::EmptyLines);
    }

    let (start, end) = match input.split_once("..") {
        Some((start, end)) => (parse_line_number(start)?, parse_line_number(end)?),
        None => {
            let line = parse_line_number(input)?;
            (line, line)
        }
    };

    if start > end {
        return Err(ParseError::InvalidRange {
            start: start.get(),
            end: end.get(),
        });
    }

    Ok(LineRange::new(start.get().into(), end.get().into()))
}

fn parse_line_number(input: &str) -> Result<NonZeroU32, ParseError> {
    input
        .trim()
        .parse::<NonZeroU32>()
        .map_err(|_| ParseError::InvalidLineNumber {
            value: input.to_string(),
        })
}
