/// Text git prints after `\ ` when a side of the diff lacks a final newline.
pub const NO_NEWLINE_AT_END_OF_FILE: &str = "No newline at end of file";

/// Which side of a diff a line number refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineBasis {
    /// The original (index) file.
    Before,
    /// The modified (working tree) file.
    After,
}

/// One record of a chunk body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineChange {
    /// Context line present in both versions.
    Unchanged {
        content: String,
        line_before: u32,
        line_after: u32,
    },
    /// Line removed from the original file.
    Deleted { content: String, line_before: u32 },
    /// Line introduced in the modified file.
    Added { content: String, line_after: u32 },
    /// The `\ No newline at end of file` notice; carries no line number.
    EndOfFileMarker { content: String },
}

impl LineChange {
    #[must_use]
    pub fn unchanged(content: impl Into<String>, line_before: u32, line_after: u32) -> Self {
        Self::Unchanged {
            content: content.into(),
            line_before,
            line_after,
        }
    }

    #[must_use]
    pub fn deleted(content: impl Into<String>, line_before: u32) -> Self {
        Self::Deleted {
            content: content.into(),
            line_before,
        }
    }

    #[must_use]
    pub fn added(content: impl Into<String>, line_after: u32) -> Self {
        Self::Added {
            content: content.into(),
            line_after,
        }
    }

    #[must_use]
    pub fn no_newline_marker() -> Self {
        Self::EndOfFileMarker {
            content: NO_NEWLINE_AT_END_OF_FILE.to_string(),
        }
    }

    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::Unchanged { content, .. }
            | Self::Deleted { content, .. }
            | Self::Added { content, .. }
            | Self::EndOfFileMarker { content } => content,
        }
    }

    #[must_use]
    pub fn line_before(&self) -> Option<u32> {
        match self {
            Self::Unchanged { line_before, .. } | Self::Deleted { line_before, .. } => {
                Some(*line_before)
            }
            Self::Added { .. } | Self::EndOfFileMarker { .. } => None,
        }
    }

    #[must_use]
    pub fn line_after(&self) -> Option<u32> {
        match self {
            Self::Unchanged { line_after, .. } | Self::Added { line_after, .. } => {
                Some(*line_after)
            }
            Self::Deleted { .. } | Self::EndOfFileMarker { .. } => None,
        }
    }

    #[must_use]
    pub fn line(&self, basis: LineBasis) -> Option<u32> {
        match basis {
            LineBasis::Before => self.line_before(),
            LineBasis::After => self.line_after(),
        }
    }

    /// Added or deleted, as opposed to context or marker.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        matches!(self, Self::Added { .. } | Self::Deleted { .. })
    }

    #[must_use]
    pub fn is_end_of_file_marker(&self) -> bool {
        matches!(self, Self::EndOfFileMarker { .. })
    }

    /// Turn a deletion into context at its original position.
    ///
    /// Deleted lines that end up around a hunk (instead of inside it) still
    /// exist in the index, so the patch must carry them as context.
    #[must_use]
    pub fn into_unchanged(self) -> Self {
        match self {
            Self::Deleted {
                content,
                line_before,
            } => Self::Unchanged {
                content,
                line_before,
                line_after: line_before,
            },
            other => other,
        }
    }

    /// Render the record as a patch body line.
    #[must_use]
    pub fn to_patch_line(&self) -> String {
        match self {
            Self::Unchanged { content, .. } => format!(" {content}"),
            Self::Deleted { content, .. } => format!("-{content}"),
            Self::Added { content, .. } => format!("+{content}"),
            Self::EndOfFileMarker { content } => format!("\\ {content}"),
        }
    }
}
