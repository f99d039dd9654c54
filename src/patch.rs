//! Rendering change sets as unified-diff patch text.
//!
//! [`PatchFromChunk`] renders one hunk with its file header;
//! [`PatchBuilder`] joins several hunks of the same file into one patch,
//! shifting each after-anchor by the net line count of the hunks before it.

use error_set::error_set;

use crate::change_set::ChangeSet;
use crate::line_range::LineRange;

error_set! {
    /// Errors from turning a selection into a patch
    PatchError := NothingToStage || InconsistentState

    /// The selection is valid but there is nothing in it to stage
    NothingToStage := {
        #[display("The selection does not include any changes")]
        FileNotFound,
        #[display("The selection does not overlap any chunk")]
        ChunkNotFound,
        #[display("Chunk does not overlap selection {range}")]
        NoOverlap { range: LineRange },
        #[display("Selection {range} contains no added or removed lines")]
        NoModifiedLines { range: LineRange },
        #[display("No hunks to stage")]
        NoHunks,
        #[display("The selection is empty")]
        EmptySelection,
    }

    /// The pieces of a hunk do not fit together into a patch git can apply
    InconsistentState := {
        #[display("Hunk has no before-file anchor")]
        MissingBeforeAnchor,
        #[display("Hunk has no after-file anchor")]
        MissingAfterAnchor,
        #[display("Modified run has no source boundaries")]
        UndefinedRunBoundary,
        #[display("Expected {expected} lines but got {actual}")]
        LineCountMismatch { expected: usize, actual: usize },
        /// Only a replacement can add lines after the old file's last line
        #[display("Line {line} ends the original file without a newline; select it along with the lines added after it")]
        UnterminatedContextLine { line: u32 },
    }
}

impl PatchError {
    /// `true` for the informational outcomes: nothing is wrong, there is
    /// just nothing to stage.
    #[must_use]
    pub fn is_nothing_to_stage(&self) -> bool {
        matches!(
            self,
            PatchError::FileNotFound
                | PatchError::ChunkNotFound
                | PatchError::NoOverlap { .. }
                | PatchError::NoModifiedLines { .. }
                | PatchError::NoHunks
                | PatchError::EmptySelection
        )
    }
}

/// A single-hunk patch for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchFromChunk {
    from_file: String,
    to_file: String,
    from_range: Option<LineRange>,
    to_range: Option<LineRange>,
    context: String,
    change_set: ChangeSet,
    omit_a_prefix: bool,
}

impl PatchFromChunk {
    /// Patch of `change_set` against `path` on both sides.
    #[must_use]
    pub fn new(path: impl Into<String>, change_set: ChangeSet) -> Self {
        let path = path.into();
        Self {
            from_file: path.clone(),
            to_file: path,
            from_range: None,
            to_range: None,
            context: String::new(),
            change_set,
            omit_a_prefix: false,
        }
    }

    #[must_use]
    pub fn with_from_file(mut self, from_file: impl Into<String>) -> Self {
        self.from_file = from_file.into();
        self
    }

    /// Explicit anchors instead of the change set's own extents.
    #[must_use]
    pub fn with_ranges(mut self, from: LineRange, to: LineRange) -> Self {
        self.from_range = Some(from);
        self.to_range = Some(to);
        self
    }

    /// Text appended after the closing `@@`.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Print the from-file without `a/` (for `/dev/null`).
    #[must_use]
    pub fn without_a_prefix(mut self) -> Self {
        self.omit_a_prefix = true;
        self
    }

    #[must_use]
    pub fn change_set(&self) -> &ChangeSet {
        &self.change_set
    }

    pub fn from_range(&self) -> Result<LineRange, InconsistentState> {
        self.from_range
            .or_else(|| self.change_set.before_line_range())
            .ok_or(InconsistentState::MissingBeforeAnchor)
    }

    pub fn to_range(&self) -> Result<LineRange, InconsistentState> {
        self.to_range
            .or_else(|| self.change_set.after_line_range())
            .ok_or(InconsistentState::MissingAfterAnchor)
    }

    #[must_use]
    pub fn before_lines(&self) -> usize {
        self.change_set.before_line_count()
    }

    #[must_use]
    pub fn after_lines(&self) -> usize {
        self.change_set.after_line_count()
    }

    fn file_header(&self) -> [String; 2] {
        let from = if self.omit_a_prefix {
            format!("--- {}", self.from_file)
        } else {
            format!("--- a/{}", self.from_file)
        };
        [from, format!("+++ b/{}", self.to_file)]
    }

    /// The `@@` line with the after-anchor shifted by `after_offset`.
    fn hunk_header(&self, after_offset: i64) -> Result<String, InconsistentState> {
        let from = self.from_range()?;
        let to = self.to_range()?.offset(after_offset);
        Ok(if self.context.is_empty() {
            format!("@@ -{from} +{to} @@")
        } else {
            format!("@@ -{from} +{to} @@ {}", self.context)
        })
    }

    fn hunk_lines(&self, after_offset: i64) -> Result<Vec<String>, InconsistentState> {
        let mut lines = vec![self.hunk_header(after_offset)?];
        lines.extend(self.change_set.to_patch_lines());
        Ok(lines)
    }

    /// File header, hunk header and body, newline-terminated.
    pub fn render(&self) -> Result<String, InconsistentState> {
        let mut lines = self.file_header().to_vec();
        lines.extend(self.hunk_lines(0)?);
        Ok(join_lines(&lines))
    }
}

/// Collects the hunks of one file into a multi-hunk patch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchBuilder {
    hunks: Vec<PatchFromChunk>,
}

impl PatchBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hunk: PatchFromChunk) {
        self.hunks.push(hunk);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Render every hunk under one file header.
    ///
    /// Each hunk's after-anchor moves by the summed
    /// `after_lines - before_lines` of all hunks before it.
    pub fn build(&self) -> Result<String, PatchError> {
        match self.hunks.as_slice() {
            [] => Err(NothingToStage::NoHunks.into()),
            [single] => Ok(single.render()?),
            [first, ..] => {
                let mut lines = first.file_header().to_vec();
                let mut offset: i64 = 0;
                for hunk in &self.hunks {
                    lines.extend(hunk.hunk_lines(offset)?);
                    offset += to_offset(hunk.after_lines()) - to_offset(hunk.before_lines());
                }
                Ok(join_lines(&lines))
            }
        }
    }
}

impl FromIterator<PatchFromChunk> for PatchBuilder {
    fn from_iter<T: IntoIterator<Item = PatchFromChunk>>(iter: T) -> Self {
        Self {
            hunks: iter.into_iter().collect(),
        }
    }
}

fn to_offset(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

fn join_lines(lines: &[String]) -> String {
    let mut text = lines.join("\n");
    text.push('\n');
    text
}
