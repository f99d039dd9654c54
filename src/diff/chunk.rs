use std::fmt;

use nom::{
    IResult, Parser,
    bytes::complete::tag,
    character::complete::{char, u32 as line_number},
    combinator::opt,
    sequence::preceded,
};

use super::line::LineChange;
use super::split_lines;
use crate::change_set::ChangeSet;
use crate::line_range::LineRange;

/// One `@@` block of a unified diff with its numbered records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Extent in the original file.
    pub from: LineRange,
    /// Extent in the modified file.
    pub to: LineRange,
    /// Text after the closing `@@` (usually the enclosing function).
    pub context: String,
    pub changes: Vec<LineChange>,
}

/// `start[,lines]`; git leaves out the count when it is 1.
fn header_range(input: &str) -> IResult<&str, (u32, u32)> {
    let (input, (start, lines)) = (line_number, opt(preceded(char(','), line_number))).parse(input)?;
    Ok((input, (start, lines.unwrap_or(1))))
}

/// `@@ -a[,b] +c[,d] @@`, leaving the trailing context unparsed.
fn header(input: &str) -> IResult<&str, ((u32, u32), (u32, u32))> {
    let (input, _) = tag("@@ -").parse(input)?;
    let (input, old) = header_range(input)?;
    let (input, _) = tag(" +").parse(input)?;
    let (input, new) = header_range(input)?;
    let (input, _) = tag(" @@").parse(input)?;
    Ok((input, (old, new)))
}

impl Chunk {
    /// Parse a chunk from diff text (header + body lines).
    ///
    /// The body ends once both header counts are used up, so text after the
    /// chunk is ignored. A `\` notice right after the last line is kept.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let mut lines = split_lines(text);
        let (rest, ((old_start, old_lines), (new_start, new_lines))) =
            header(lines.next()?).ok()?;
        let context = rest
            .strip_prefix(' ')
            .unwrap_or(rest)
            .trim_end_matches('\r')
            .to_string();

        let mut before = old_start;
        let mut after = new_start;
        let mut old_left = old_lines;
        let mut new_left = new_lines;
        let mut changes = Vec::new();

        for line in lines {
            if let Some(notice) = line.strip_prefix('\\') {
                changes.push(LineChange::EndOfFileMarker {
                    content: notice.trim_start().to_string(),
                });
                continue;
            }
            if old_left == 0 && new_left == 0 {
                break;
            }
            match line.as_bytes().first() {
                // Some tools strip the single space off empty context lines
                Some(b' ') | None => {
                    changes.push(LineChange::unchanged(line.get(1..).unwrap_or(""), before, after));
                    before += 1;
                    after += 1;
                    old_left = old_left.saturating_sub(1);
                    new_left = new_left.saturating_sub(1);
                }
                Some(b'-') => {
                    changes.push(LineChange::deleted(&line[1..], before));
                    before += 1;
                    old_left = old_left.saturating_sub(1);
                }
                Some(b'+') => {
                    changes.push(LineChange::added(&line[1..], after));
                    after += 1;
                    new_left = new_left.saturating_sub(1);
                }
                Some(_) => break,
            }
        }

        Some(Chunk {
            from: LineRange::from_start_with_lines(old_start.into(), old_lines.into()),
            to: LineRange::from_start_with_lines(new_start.into(), new_lines.into()),
            context,
            changes,
        })
    }

    /// The `@@ -from +to @@ context` line.
    #[must_use]
    pub fn header(&self) -> String {
        if self.context.is_empty() {
            format!("@@ -{} +{} @@", self.from, self.to)
        } else {
            format!("@@ -{} +{} @@ {}", self.from, self.to, self.context)
        }
    }

    #[must_use]
    pub fn change_set(&self) -> ChangeSet {
        ChangeSet::new(self.changes.clone())
    }

    /// After-file lines a selection has to touch to reach this chunk.
    ///
    /// Starts at the modified-side start and spans the larger of the two
    /// side counts, so a chunk of pure deletions still occupies lines.
    #[must_use]
    pub fn selection_range(&self) -> LineRange {
        LineRange::from_start_with_lines(
            self.to.start().max(1),
            self.from.lines().max(self.to.lines()),
        )
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header())?;
        for change in &self.changes {
            writeln!(f, "{}", change.to_patch_line())?;
        }
        Ok(())
    }
}
