use super::file::ChangedFile;
use super::split_lines;

/// A complete git diff containing changes for multiple files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    pub files: Vec<ChangedFile>,
}

impl Diff {
    /// Parse a complete git diff output into per-file changes
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut files = Vec::new();
        let mut current_file_text = String::new();

        for line in split_lines(text) {
            if line.starts_with("diff --git ") {
                // Start of new file diff - save previous if exists
                if !current_file_text.is_empty()
                    && let Some(file) = ChangedFile::parse(&current_file_text)
                {
                    files.push(file);
                }
                current_file_text = line.to_string();
                current_file_text.push('\n');
            } else if !current_file_text.is_empty() {
                current_file_text.push_str(line);
                current_file_text.push('\n');
            }
        }

        if !current_file_text.is_empty()
            && let Some(file) = ChangedFile::parse(&current_file_text)
        {
            files.push(file);
        }

        Diff { files }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.iter().all(|file| file.chunks.is_empty())
    }

    /// Find a file by path
    #[must_use]
    pub fn file(&self, path: &str) -> Option<&ChangedFile> {
        self.files.iter().find(|file| file.path == path)
    }
}

impl std::fmt::Display for Diff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for file in &self.files {
            write!(f, "{file}")?;
        }
        Ok(())
    }
}
