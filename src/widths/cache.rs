use anyhow::{Context, Result, anyhow};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use tracing::info;

const TARGET_WIDTH_KEY: &str = "targetWidth";

/// `images.json`: image path -> `{"targetWidth": ...}`.
///
/// Entries are kept as raw JSON so fields this tool does not know survive a rewrite.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WidthCache {
    entries: BTreeMap<String, Value>,
}

impl WidthCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the cache; a missing file is an empty cache.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(
                    "width cache '{}' not found, starting empty",
                    path.display()
                );
                return Ok(Self::new());
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read width cache: {}", path.display()));
            }
        };
        let entries: BTreeMap<String, Value> = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse width cache: {}", path.display()))?;
        info!("loaded width cache '{}'", path.display());
        Ok(Self { entries })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create directory: {}", dir.display()))?;
        }
        let content = serde_json::to_string_pretty(&self.entries)?;
        fs::write(path, content)
            .with_context(|| format!("failed to write width cache: {}", path.display()))
    }

    /// Records a target width, keeping any other fields of an existing entry.
    pub fn set_target_width(&mut self, key: &str, width: u64) {
        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(fields) = entry {
            fields.insert(TARGET_WIDTH_KEY.to_string(), Value::from(width));
        }
    }

    /// The stored target width, rendered as text whether stored as a number or a string.
    pub fn target_width(&self, key: &str) -> Option<String> {
        match self.entries.get(key)?.get(TARGET_WIDTH_KEY)? {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    }

    pub fn require_target_width(&self, key: &str) -> Result<String> {
        self.target_width(key)
            .ok_or_else(|| anyhow!("no targetWidth recorded for '{}'", key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempdir().expect("tempdir");
        let cache = WidthCache::load(&dir.path().join("images.json")).expect("load");
        assert!(cache.is_empty());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("images.json");
        fs::write(&path, "{not json").expect("write");
        assert!(WidthCache::load(&path).is_err());
    }

    #[test]
    fn merge_preserves_unrelated_entries_and_fields() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("images.json");
        fs::write(
            &path,
            r#"{"images/i_001.jpg": {"targetWidth": "320", "note": "keep"},
                "images/i_002.jpg": {"targetWidth": 100}}"#,
        )
        .expect("write");

        let mut cache = WidthCache::load(&path).expect("load");
        cache.set_target_width("images/i_001.jpg", 400);
        cache.set_target_width("images/i_003.jpg", 200);
        cache.save(&path).expect("save");

        let reloaded = WidthCache::load(&path).expect("reload");
        assert_eq!(reloaded.len(), 3);
        assert_eq!(reloaded.target_width("images/i_001.jpg").as_deref(), Some("400"));
        assert_eq!(reloaded.target_width("images/i_002.jpg").as_deref(), Some("100"));
        assert_eq!(reloaded.target_width("images/i_003.jpg").as_deref(), Some("200"));

        let raw: Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
        assert_eq!(raw["images/i_001.jpg"]["note"], "keep");
    }

    #[test]
    fn string_widths_are_returned_verbatim() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("images.json");
        fs::write(&path, r#"{"images/i_001.jpg": {"targetWidth": "320"}}"#).expect("write");
        let cache = WidthCache::load(&path).expect("load");
        assert_eq!(
            cache.require_target_width("images/i_001.jpg").expect("width"),
            "320"
        );
        assert!(cache.require_target_width("images/i_404.jpg").is_err());
    }
}
