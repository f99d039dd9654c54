use std::fmt;

use super::chunk::Chunk;
use crate::line_range::LineRange;

/// All chunks git reported for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    /// File path (from the `+++ b/path` header, or `--- a/path` for deletions)
    pub path: String,
    pub chunks: Vec<Chunk>,
}

impl ChangedFile {
    /// Parse a single-file diff from git diff output.
    ///
    /// Expects input starting with `diff --git`. Returns `None` if the path
    /// cannot be extracted or the file has no chunks (binary files, mode-only
    /// changes).
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        // Find first chunk marker; the path must come from the header before it
        let first_chunk_pos = text.find("\n@@ ").map(|i| i + 1)?;
        let header = &text[..first_chunk_pos];

        let path = header_path(header, "+++ ", "b/")
            .or_else(|| header_path(header, "--- ", "a/"))
            .filter(|p| !p.is_empty())?;

        let mut indices = vec![first_chunk_pos];
        let mut search_start = first_chunk_pos + 1;

        while let Some(pos) = text[search_start..].find("\n@@ ") {
            let abs_pos = search_start + pos + 1; // +1 to skip the newline
            indices.push(abs_pos);
            search_start = abs_pos + 1;
        }

        let chunks = indices
            .iter()
            .enumerate()
            .filter_map(|(i, &start)| {
                let end = indices.get(i + 1).copied().unwrap_or(text.len());
                Chunk::parse(&text[start..end])
            })
            .collect();

        Some(ChangedFile { path, chunks })
    }

    /// Chunks whose [`Chunk::selection_range`] shares a line with `selection`.
    #[must_use]
    pub fn overlapping_chunks(&self, selection: &LineRange) -> Vec<&Chunk> {
        self.chunks
            .iter()
            .filter(|chunk| chunk.selection_range().overlap(selection).is_some())
            .collect()
    }
}

/// Path on one side of the `---`/`+++` header pair, without its `a/`/`b/`
/// prefix. `/dev/null` yields `None`.
fn header_path(header: &str, marker: &str, side: &str) -> Option<String> {
    header.lines().find_map(|line| {
        let name = unquote(line.strip_prefix(marker)?)?;
        name.strip_prefix(side).map(str::to_string)
    })
}

/// Undo git's C-style quoting of a header file name.
///
/// git quotes names holding control characters, quotes or backslashes, and
/// non-ASCII bytes unless `core.quotePath` is off. Names containing a space
/// get a trailing tab instead.
fn unquote(raw: &str) -> Option<String> {
    let raw = raw.trim_end_matches('\t');
    let Some(quoted) = raw.strip_prefix('"') else {
        return Some(raw.to_string());
    };
    let inner = quoted.strip_suffix('"')?;

    let mut bytes = Vec::with_capacity(inner.len());
    let mut rest = inner.bytes();
    while let Some(byte) = rest.next() {
        if byte != b'\\' {
            bytes.push(byte);
            continue;
        }
        let unescaped = match rest.next()? {
            b'a' => 0x07,
            b'b' => 0x08,
            b't' => b'\t',
            b'n' => b'\n',
            b'v' => 0x0b,
            b'f' => 0x0c,
            b'r' => b'\r',
            b'"' => b'"',
            b'\\' => b'\\',
            lead @ b'0'..=b'3' => {
                let mut value = lead - b'0';
                for _ in 0..2 {
                    let digit = rest.next().filter(|d| (b'0'..=b'7').contains(d))?;
                    value = value * 8 + (digit - b'0');
                }
                value
            }
            _ => return None,
        };
        bytes.push(unescaped);
    }
    String::from_utf8(bytes).ok()
}

impl fmt::Display for ChangedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- a/{}", self.path)?;
        writeln!(f, "+++ b/{}", self.path)?;
        for chunk in &self.chunks {
            write!(f, "{chunk}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::diff::line::LineChange;
    use similar_asserts::assert_eq;

    const TWO_CHUNKS: &str = "diff --git a/src/app.rs b/src/app.rs
index 1111111..2222222 100644
--- a/src/app.rs
+++ b/src/app.rs
@@ -1,4 +1,4 @@
 use std::fmt;
-use std::io;
+use std::io::Write;

 fn main() {
@@ -20,3 +20,4 @@ fn main() {
     run();
+    flush();
 }

";

    #[test]
    fn parse_path_and_chunks() {
        let file = ChangedFile::parse(TWO_CHUNKS).unwrap();
        assert_eq!(file.path, "src/app.rs");
        assert_eq!(file.chunks.len(), 2);
        assert_eq!(file.chunks[1].context, "fn main() {");
        assert_eq!(file.chunks[1].changes[1], LineChange::added("    flush();", 21));
    }

    #[test]
    fn parse_deleted_file_uses_old_path() {
        let text = "diff --git a/gone.txt b/gone.txt
deleted file mode 100644
index 3333333..0000000
--- a/gone.txt
+++ /dev/null
@@ -1,2 +0,0 @@
-first
-second
";
        let file = ChangedFile::parse(text).unwrap();
        assert_eq!(file.path, "gone.txt");
        assert_eq!(file.chunks[0].to.to_string(), "0,0");
    }

    #[test]
    fn parse_quoted_non_ascii_path() {
        let text = "diff --git \"a/\\346\\227\\245\\350\\250\\230.txt\" \"b/\\346\\227\\245\\350\\250\\230.txt\"
index 1111111..2222222 100644
--- \"a/\\346\\227\\245\\350\\250\\230.txt\"
+++ \"b/\\346\\227\\245\\350\\250\\230.txt\"
@@ -1 +1 @@
-old
+new
";
        let file = ChangedFile::parse(text).unwrap();
        assert_eq!(file.path, "日記.txt");
    }

    #[test]
    fn parse_path_with_escapes_and_space() {
        assert_eq!(unquote(r#""b/say \"hi\"\tnow.txt""#).as_deref(), Some("b/say \"hi\"\tnow.txt"));
        assert_eq!(unquote("b/two words.txt\t").as_deref(), Some("b/two words.txt"));
        assert_eq!(unquote(r#""b/bad\9""#), None);
    }

    #[test]
    fn parse_binary_file_is_skipped() {
        let text = "diff --git a/logo.png b/logo.png
index 4444444..5555555 100644
Binary files a/logo.png and b/logo.png differ
";
        assert_eq!(ChangedFile::parse(text), None);
    }

    #[test]
    fn overlapping_chunks_by_selection() {
        let file = ChangedFile::parse(TWO_CHUNKS).unwrap();
        assert_eq!(file.overlapping_chunks(&LineRange::new(2, 2)).len(), 1);
        assert_eq!(file.overlapping_chunks(&LineRange::new(3, 21)).len(), 2);
        assert!(file.overlapping_chunks(&LineRange::new(8, 12)).is_empty());
    }

    #[test]
    fn display_restores_headers() {
        let file = ChangedFile::parse(TWO_CHUNKS).unwrap();
        let rendered = file.to_string();
        assert!(rendered.starts_with("--- a/src/app.rs\n+++ b/src/app.rs\n@@ -1,4 +1,4 @@\n"));
        assert!(rendered.ends_with("@@ -20,3 +20,4 @@ fn main() {\n     run();\n+    flush();\n }\n \n"));
    }
}
