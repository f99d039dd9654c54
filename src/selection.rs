//! Turning a line selection into an applicable patch.
//!
//! For tracked files the selection is matched against the chunks of a parsed
//! diff: each overlapping chunk contributes the run of modifications the
//! selection touches, padded with context, and the resulting hunks are
//! joined into one patch for the index. Untracked files have no diff; their
//! selected lines become a patch that creates the file.

use tracing::{debug, trace};

use crate::change_set::{ChangeSet, Direction};
use crate::diff::{ChangedFile, Chunk, Diff, LineChange};
use crate::line_range::LineRange;
use crate::patch::{InconsistentState, NothingToStage, PatchBuilder, PatchError, PatchFromChunk};

/// Context lines placed around each selected run.
pub const DEFAULT_CONTEXT_LINES: usize = 3;

/// Patch for the lines of `diff` selected by `selection`.
///
/// `selection` is in modified-file (working tree) coordinates.
pub fn make_patch_from_selection(diff: &Diff, selection: LineRange) -> Result<String, PatchError> {
    PatchFromSelection::new(diff, selection).build()
}

/// Builds a patch from a selection over one diff.
#[derive(Debug, Clone)]
pub struct PatchFromSelection<'a> {
    file: Option<&'a ChangedFile>,
    chunks: Vec<&'a Chunk>,
    selection: LineRange,
    context_lines: usize,
}

impl<'a> PatchFromSelection<'a> {
    /// Pick the first file of `diff` with a chunk overlapping `selection`.
    #[must_use]
    pub fn new(diff: &'a Diff, selection: LineRange) -> Self {
        let (file, chunks) = diff
            .files
            .iter()
            .find_map(|file| {
                let chunks = file.overlapping_chunks(&selection);
                (!chunks.is_empty()).then_some((Some(file), chunks))
            })
            .unwrap_or((None, Vec::new()));

        Self {
            file,
            chunks,
            selection,
            context_lines: DEFAULT_CONTEXT_LINES,
        }
    }

    #[must_use]
    pub fn with_context_lines(mut self, context_lines: usize) -> Self {
        self.context_lines = context_lines;
        self
    }

    #[must_use]
    pub fn file(&self) -> Option<&'a ChangedFile> {
        self.file
    }

    #[must_use]
    pub fn chunks(&self) -> &[&'a Chunk] {
        &self.chunks
    }

    /// Hunk for the part of `chunk` covered by the selection.
    fn hunk_for_chunk(&self, path: &str, chunk: &Chunk) -> Result<PatchFromChunk, PatchError> {
        let range = chunk
            .selection_range()
            .overlap(&self.selection)
            .ok_or(NothingToStage::NoOverlap {
                range: self.selection,
            })?;

        let source = chunk.change_set();
        let run = source.extract_modified_run_at(chunk.to.start(), range.start(), range.end(), true);
        if run.is_empty() {
            return Err(NothingToStage::NoModifiedLines { range }.into());
        }
        let span = run.span().ok_or(InconsistentState::UndefinedRunBoundary)?;

        let has_before = |change: &LineChange| change.line_before().is_some();
        let header = match span.start.checked_sub(1) {
            Some(index) => {
                source.slice_by_index(index, Direction::Backward, self.context_lines, has_before)
            }
            None => ChangeSet::default(),
        };
        let footer =
            source.slice_by_index(span.end + 1, Direction::Forward, self.context_lines, has_before);
        if let Some(line) = [header.span(), footer.span()]
            .into_iter()
            .flatten()
            .find_map(|padding| source.unterminated_line_in(padding))
        {
            return Err(InconsistentState::UnterminatedContextLine { line }.into());
        }

        let body = header
            .convert_deleted_to_unchanged()
            .concat([&run, &footer.convert_deleted_to_unchanged()]);
        // Against an empty original there is nothing to anchor on but the header.
        let (from, to) = body
            .before_line_range()
            .zip(body.after_line_range_for_patch())
            .unwrap_or_else(|| {
                let added = i64::try_from(body.after_line_count()).unwrap_or(i64::MAX);
                (
                    chunk.from,
                    LineRange::from_start_with_lines(chunk.from.start() + 1, added),
                )
            });

        debug!(
            chunk = %chunk.header(),
            %range,
            from = %from,
            to = %to,
            records = body.len(),
            "assembled hunk"
        );
        for line in body.to_patch_lines() {
            trace!("{line}");
        }

        Ok(PatchFromChunk::new(path, body)
            .with_ranges(from, to)
            .with_context(chunk.context.as_str()))
    }

    /// Render the patch.
    ///
    /// Chunks whose overlap holds no modification are skipped; any other
    /// failure aborts the whole patch.
    pub fn build(&self) -> Result<String, PatchError> {
        let file = self.file.ok_or(NothingToStage::FileNotFound)?;
        if self.chunks.is_empty() {
            return Err(NothingToStage::ChunkNotFound.into());
        }
        debug!(path = %file.path, chunks = self.chunks.len(), selection = %self.selection, "selected file");

        let mut builder = PatchBuilder::new();
        for chunk in &self.chunks {
            match self.hunk_for_chunk(&file.path, chunk) {
                Ok(hunk) => builder.push(hunk),
                Err(err) if err.is_nothing_to_stage() => {
                    debug!(chunk = %chunk.header(), "skipping chunk: {err}");
                }
                Err(err) => return Err(err),
            }
        }
        builder.build()
    }
}

/// Patch creating an untracked file from some of its lines.
#[derive(Debug, Clone)]
pub struct UntrackedFilePatch<'a, S> {
    path: &'a str,
    range: LineRange,
    lines: &'a [S],
    missing_final_newline: bool,
}

impl<'a, S: AsRef<str>> UntrackedFilePatch<'a, S> {
    /// `range` is 0-based over the file buffer; `lines` holds exactly the
    /// lines it covers.
    #[must_use]
    pub fn new(path: &'a str, range: LineRange, lines: &'a [S]) -> Self {
        Self {
            path,
            range,
            lines,
            missing_final_newline: false,
        }
    }

    /// Mark the last selected line as the file's unterminated last line.
    #[must_use]
    pub fn missing_final_newline(mut self, missing: bool) -> Self {
        self.missing_final_newline = missing;
        self
    }

    pub fn build(&self) -> Result<String, PatchError> {
        let expected = usize::try_from(self.range.lines()).unwrap_or(0);
        if expected == 0 || self.lines.is_empty() {
            return Err(NothingToStage::EmptySelection.into());
        }
        if expected != self.lines.len() {
            return Err(InconsistentState::LineCountMismatch {
                expected,
                actual: self.lines.len(),
            }
            .into());
        }

        let first_line = self.range.start() + 1;
        let mut changes: Vec<LineChange> = self
            .lines
            .iter()
            .zip(first_line..)
            .map(|(line, number)| {
                LineChange::added(line.as_ref(), u32::try_from(number).unwrap_or(u32::MAX))
            })
            .collect();
        if self.missing_final_newline {
            changes.push(LineChange::no_newline_marker());
        }

        // The index has no such file yet, so the hunk starts at its line 1.
        let count = i64::try_from(self.lines.len()).unwrap_or(i64::MAX);
        Ok(PatchFromChunk::new(self.path, ChangeSet::new(changes))
            .with_from_file("/dev/null")
            .without_a_prefix()
            .with_ranges(
                LineRange::anchor(0),
                LineRange::from_start_with_lines(1, count),
            )
            .render()?)
    }
}
