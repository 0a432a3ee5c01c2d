//! Scan-page tracking.
//!
//! Proofed texts carry markers naming the page scan the following text came
//! from. Three shapes are recognized:
//!
//! - `// 005.png` (page comment)
//! - `.bn 005.png` (bookmark directive)
//! - `-----File: 005.png---------` (proofing file separator)

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

#[derive(Debug, Default, Clone)]
pub struct ScanPageTracker {
    current: Option<String>,
}

impl ScanPageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the next line in scan order. Returns the new page when the line is a marker.
    pub fn observe(&mut self, line: &str) -> Option<&str> {
        let page = page_from_marker(line)?;
        self.current = Some(page);
        self.current.as_deref()
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }
}

pub fn page_from_marker(line: &str) -> Option<String> {
    if let Some(rest) = line.strip_prefix("// ") {
        return numeric_file_name(rest.trim_start());
    }
    if let Some(rest) = line.strip_prefix(".bn ") {
        return numeric_file_name(rest.trim_start());
    }
    if let Some(rest) = line.strip_prefix("-----File:") {
        return numeric_file_name(rest.trim_start());
    }
    None
}

/// Matches `<digits>.<image ext>` at the start of `text`, returning the digits.
fn numeric_file_name(text: &str) -> Option<String> {
    let digits_len = text.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    let (digits, rest) = text.split_at(digits_len);
    let ext = rest.strip_prefix('.')?;
    let ext_len = ext.bytes().take_while(u8::is_ascii_alphabetic).count();
    let ext = &ext[..ext_len];
    if IMAGE_EXTENSIONS
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(ext))
    {
        Some(digits.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_all_marker_shapes() {
        assert_eq!(page_from_marker("// 005.png"), Some("005".to_string()));
        assert_eq!(page_from_marker(".bn 012.jpg"), Some("012".to_string()));
        assert_eq!(
            page_from_marker("-----File: 0123.png---\\Proofer\\-----"),
            Some("0123".to_string())
        );
        assert_eq!(page_from_marker("// 7.JPEG"), Some("7".to_string()));
    }

    #[test]
    fn ignores_non_markers() {
        assert_eq!(page_from_marker("// a comment"), None);
        assert_eq!(page_from_marker("// 005.txt"), None);
        assert_eq!(page_from_marker("//005.png"), None);
        assert_eq!(page_from_marker("text // 005.png"), None);
        assert_eq!(page_from_marker(".bn"), None);
    }

    #[test]
    fn current_page_persists_until_next_marker() {
        let mut tracker = ScanPageTracker::new();
        assert_eq!(tracker.current(), None);
        assert_eq!(tracker.observe("// 001.png"), Some("001"));
        assert_eq!(tracker.observe("Some prose."), None);
        assert_eq!(tracker.current(), Some("001"));
        tracker.observe(".bn 002.png");
        assert_eq!(tracker.current(), Some("002"));
    }
}
