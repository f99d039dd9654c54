//! Stage an arbitrary selection of changed lines into the git index.
//!
//! The selection is given in working-tree line numbers. The unstaged diff of
//! the file is parsed, the modifications the selection touches are cut out
//! with enough context to apply cleanly, and the resulting patch is applied
//! to the index with `git apply --cached`.

use error_set::error_set;
use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

pub mod change_set;
pub mod diff;
pub mod line_range;
pub mod parse;
pub mod patch;
pub mod selection;

pub use change_set::{ChangeSet, Direction, IndexSpan};
pub use diff::{ChangedFile, Chunk, Diff, LineBasis, LineChange, format_diff};
pub use line_range::LineRange;
pub use parse::{FileSelection, ParseError};
pub use patch::{InconsistentState, NothingToStage, PatchBuilder, PatchError, PatchFromChunk};
pub use selection::{
    DEFAULT_CONTEXT_LINES, PatchFromSelection, UntrackedFilePatch, make_patch_from_selection,
};

error_set! {
    /// Top-level error for line staging operations
    StageError := {
        #[display("Failed to read {file}: {message}")]
        ReadFailed { file: String, message: String },
        ParseError(ParseError),
        PatchError(PatchError),
    } || GitCommandError

    /// Errors from git command execution
    GitCommandError := {
        #[display("Failed to run git diff: {message}")]
        DiffFailed { message: String },
        #[display("git diff failed: {stderr}")]
        DiffExitError { stderr: String },
        #[display("Invalid UTF-8 in git diff output: {message}")]
        InvalidUtf8 { message: String },
        #[display("Failed to run git ls-files: {message}")]
        LsFilesFailed { message: String },
        #[display("Failed to spawn git apply: {message}")]
        ApplySpawnFailed { message: String },
        #[display("Failed to get stdin handle for git apply")]
        ApplyStdinFailed,
        #[display("Failed to write patch to git apply: {message}")]
        ApplyWriteFailed { message: String },
        #[display("Failed to wait for git apply: {message}")]
        ApplyWaitFailed { message: String },
        #[display("git apply failed: {stderr}")]
        ApplyExitError { stderr: String },
    }
}

impl StageError {
    /// `true` when the selection simply had nothing to stage.
    #[must_use]
    pub fn is_nothing_to_stage(&self) -> bool {
        matches!(self, StageError::PatchError(err) if err.is_nothing_to_stage())
    }
}

/// Main interface for line staging operations
#[derive(Debug, Clone)]
pub struct LineStager<'a> {
    repo_path: &'a str,
    context_lines: usize,
}

impl<'a> LineStager<'a> {
    /// Create a new LineStager for the given repository path
    #[must_use]
    pub fn new(repo_path: &'a str) -> Self {
        Self {
            repo_path,
            context_lines: DEFAULT_CONTEXT_LINES,
        }
    }

    /// Context lines around each staged run (and passed to `git diff -U`)
    #[must_use]
    pub fn with_context_lines(mut self, context_lines: usize) -> Self {
        self.context_lines = context_lines;
        self
    }

    /// Stage specific lines from a file
    ///
    /// # Examples
    /// ```no_run
    /// # use git_stage_lines::LineStager;
    /// let stager = LineStager::new(".");
    /// stager.stage("flake.nix:137").unwrap();
    /// stager.stage("src/main.rs:10..15").unwrap();
    /// ```
    pub fn stage(&self, selection: &str) -> Result<(), StageError> {
        self.stage_selection(&parse::parse_selection(selection)?)
    }

    /// Stage a parsed selection
    pub fn stage_selection(&self, selection: &FileSelection) -> Result<(), StageError> {
        let patch = self.patch_for(selection)?;
        self.apply_patch(&patch)?;
        info!(file = %selection.file, range = %selection.range, "staged selection");
        Ok(())
    }

    /// The patch `stage` would apply, without applying it
    pub fn patch(&self, selection: &str) -> Result<String, StageError> {
        self.patch_for(&parse::parse_selection(selection)?)
    }

    /// Build the patch for a parsed selection
    pub fn patch_for(&self, selection: &FileSelection) -> Result<String, StageError> {
        if self.is_tracked(&selection.file)? {
            let diff = Diff::parse(&self.get_raw_diff(std::slice::from_ref(&selection.file))?);
            Ok(PatchFromSelection::new(&diff, selection.range)
                .with_context_lines(self.context_lines)
                .build()?)
        } else {
            self.untracked_patch(selection)
        }
    }

    /// Get formatted diff output for specified files (or all files if empty)
    ///
    /// Returns diff output formatted with explicit line numbers for easy staging.
    ///
    /// # Examples
    /// ```no_run
    /// # use git_stage_lines::LineStager;
    /// let stager = LineStager::new(".");
    /// let diff = stager.diff(&[]).unwrap(); // all files
    /// let diff = stager.diff(&["flake.nix".to_string()]).unwrap(); // specific file
    /// ```
    pub fn diff(&self, files: &[String]) -> Result<String, StageError> {
        Ok(format_diff(&Diff::parse(&self.get_raw_diff(files)?)))
    }

    /// Whether git knows the file (in the index or HEAD)
    pub fn is_tracked(&self, file: &str) -> Result<bool, GitCommandError> {
        let output = Command::new("git")
            .args([
                "-C",
                self.repo_path,
                "ls-files",
                "--error-unmatch",
                "--",
                file,
            ])
            .output()
            .map_err(|e| GitCommandError::LsFilesFailed {
                message: e.to_string(),
            })?;
        Ok(output.status.success())
    }

    /// Patch creating an untracked file with only the selected lines
    fn untracked_patch(&self, selection: &FileSelection) -> Result<String, StageError> {
        let path = Path::new(self.repo_path).join(&selection.file);
        let content = std::fs::read_to_string(&path).map_err(|e| StageError::ReadFailed {
            file: selection.file.clone(),
            message: e.to_string(),
        })?;

        let lines: Vec<&str> = diff::split_lines(&content).collect();
        // Selection is 1-based, the buffer 0-based; clamp to the file
        let last_index = i64::try_from(lines.len()).unwrap_or(i64::MAX) - 1;
        let start = (selection.range.start() - 1).max(0);
        let end = (selection.range.end() - 1).min(last_index);
        let (Ok(first), Ok(last)) = (usize::try_from(start), usize::try_from(end)) else {
            return Err(PatchError::from(NothingToStage::EmptySelection).into());
        };
        if first > last {
            return Err(PatchError::from(NothingToStage::EmptySelection).into());
        }

        let selected = &lines[first..=last];
        let missing_final_newline = end == last_index && !content.ends_with('\n');
        debug!(file = %selection.file, start, end, missing_final_newline, "untracked file");

        Ok(
            UntrackedFilePatch::new(&selection.file, LineRange::new(start, end), selected)
                .missing_final_newline(missing_final_newline)
                .build()?,
        )
    }

    /// Get raw git diff output
    fn get_raw_diff(&self, files: &[String]) -> Result<String, GitCommandError> {
        let unified = format!("-U{}", self.context_lines);
        // Non-ASCII paths unquoted, as `+++ b/<path>` expects them
        let mut args = vec![
            "-C",
            self.repo_path,
            "-c",
            "core.quotePath=false",
            "diff",
            "--no-ext-diff",
            "--no-color",
            unified.as_str(),
            "--",
        ];

        args.extend(files.iter().map(|s| s.as_str()));
        debug!(?args, "running git");

        let output =
            Command::new("git")
                .args(&args)
                .output()
                .map_err(|e| GitCommandError::DiffFailed {
                    message: e.to_string(),
                })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitCommandError::DiffExitError {
                stderr: stderr.into_owned(),
            });
        }

        String::from_utf8(output.stdout).map_err(|e| GitCommandError::InvalidUtf8 {
            message: e.to_string(),
        })
    }

    /// Apply a patch to the git index
    fn apply_patch(&self, patch: &str) -> Result<(), GitCommandError> {
        use std::io::Write;

        let mut args = vec!["-C", self.repo_path, "apply", "--cached"];
        if self.context_lines == 0 {
            args.push("--unidiff-zero");
        }
        args.push("-");
        debug!(?args, "running git");

        let mut child = Command::new("git")
            .args(&args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| GitCommandError::ApplySpawnFailed {
                message: e.to_string(),
            })?;

        child
            .stdin
            .take()
            .ok_or(GitCommandError::ApplyStdinFailed)?
            .write_all(patch.as_bytes())
            .map_err(|e| GitCommandError::ApplyWriteFailed {
                message: e.to_string(),
            })?;

        let output = child
            .wait_with_output()
            .map_err(|e| GitCommandError::ApplyWaitFailed {
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitCommandError::ApplyExitError {
                stderr: stderr.into_owned(),
            });
        }

        Ok(())
    }
}
