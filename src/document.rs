use anyhow::{Context, Result, anyhow};
use std::fs;
use std::ops::Range;
use std::path::Path;

const BOM: char = '\u{feff}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Ascii,
    Utf8,
    Latin1,
}

/// Line buffer shared by every pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    lines: Vec<String>,
    encoding: SourceEncoding,
}

impl Document {
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            encoding: SourceEncoding::Utf8,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(anyhow!("specified file '{}' not found", path.display()));
        }
        let bytes =
            fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let (text, encoding) = decode(&bytes);
        Ok(Self {
            lines: split_lines(&text),
            encoding,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut text = String::new();
        for line in &self.lines {
            text.push_str(line);
            text.push('\n');
        }
        let bytes = match self.encoding {
            SourceEncoding::Latin1 => {
                let (encoded, _, _) = encoding_rs::WINDOWS_1252.encode(&text);
                encoded.into_owned()
            }
            SourceEncoding::Ascii | SourceEncoding::Utf8 => text.into_bytes(),
        };
        fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
    }

    pub fn encoding(&self) -> SourceEncoding {
        self.encoding
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn slice(&self, range: Range<usize>) -> &[String] {
        &self.lines[range]
    }

    pub fn set_line(&mut self, index: usize, text: impl Into<String>) -> Result<()> {
        let len = self.lines.len();
        let slot = self
            .lines
            .get_mut(index)
            .ok_or_else(|| anyhow!("line {} out of range ({} lines)", index, len))?;
        *slot = text.into();
        Ok(())
    }

    /// Swaps in a new line sequence, keeping the source encoding.
    pub fn replace_lines(&mut self, lines: Vec<String>) {
        self.lines = lines;
    }
}

fn decode(bytes: &[u8]) -> (String, SourceEncoding) {
    if bytes.is_ascii() {
        // ASCII is valid UTF-8.
        return (
            String::from_utf8_lossy(bytes).into_owned(),
            SourceEncoding::Ascii,
        );
    }
    if let Some(text) = encoding_rs::UTF_8.decode_without_bom_handling_and_without_replacement(bytes)
    {
        let text: &str = &text;
        let text = text.strip_prefix(BOM).unwrap_or(text).to_string();
        return (text, SourceEncoding::Utf8);
    }
    let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
    (text.into_owned(), SourceEncoding::Latin1)
}

fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let body = text.strip_suffix('\n').unwrap_or(text);
    body.split('\n')
        .map(|line| line.trim_end().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_strips_trailing_whitespace_and_final_newline() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("book.txt");
        fs::write(&path, "one  \r\ntwo\t\n\nthree\n").expect("write");
        let doc = Document::load(&path).expect("load");
        assert_eq!(doc.lines(), &["one", "two", "", "three"]);
        assert_eq!(doc.encoding(), SourceEncoding::Ascii);
    }

    #[test]
    fn load_drops_utf8_bom() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("book.txt");
        fs::write(&path, "\u{feff}Caf\u{e9}\nna\u{ef}ve\n").expect("write");
        let doc = Document::load(&path).expect("load");
        assert_eq!(doc.lines(), &["Caf\u{e9}", "na\u{ef}ve"]);
        assert_eq!(doc.encoding(), SourceEncoding::Utf8);
    }

    #[test]
    fn load_falls_back_to_latin1() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("book.txt");
        fs::write(&path, b"caf\xe9\n").expect("write");
        let doc = Document::load(&path).expect("load");
        assert_eq!(doc.lines(), &["caf\u{e9}"]);
        assert_eq!(doc.encoding(), SourceEncoding::Latin1);

        let out = dir.path().join("out.txt");
        doc.save(&out).expect("save");
        assert_eq!(fs::read(&out).expect("read"), b"caf\xe9\n");
    }

    #[test]
    fn load_missing_file_is_fatal() {
        let dir = tempdir().expect("tempdir");
        let err = Document::load(&dir.path().join("nope.txt")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn save_terminates_every_line() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("out.txt");
        Document::from_lines(["a", "", "b"]).save(&path).expect("save");
        assert_eq!(fs::read_to_string(&path).expect("read"), "a\n\nb\n");
    }

    #[test]
    fn set_line_out_of_range_errors() {
        let mut doc = Document::from_lines(["a"]);
        assert!(doc.set_line(3, "x").is_err());
        doc.set_line(0, "b").expect("set");
        assert_eq!(doc.line(0), Some("b"));
    }
}
