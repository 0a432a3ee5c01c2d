use anyhow::{Context, Result, anyhow};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};

use crate::diagnostics::{DiagnosticKind, Diagnostics};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub id: String,
    pub file_name: String,
    pub page_number: String,
    pub width: u32,
    pub height: u32,
    pub file_size: u64,
    pub usage_count: u32,
}

impl ImageAsset {
    pub fn new(file_name: &str, width: u32, height: u32) -> Self {
        Self {
            id: id_from_filename(file_name),
            file_name: file_name.to_string(),
            page_number: page_number_from_filename(file_name),
            width,
            height,
            file_size: 0,
            usage_count: 0,
        }
    }

    pub fn with_file_size(mut self, file_size: u64) -> Self {
        self.file_size = file_size;
        self
    }
}

/// Image assets keyed by id.
#[derive(Debug, Default, Clone)]
pub struct Inventory {
    assets: BTreeMap<String, ImageAsset>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans `dir` for decodable images.
    pub fn scan(dir: &Path, exempt: &[String], diags: &mut Diagnostics) -> Result<Self> {
        info!("taking inventory of {}", dir.display());
        let entries = fs::read_dir(dir)
            .with_context(|| format!("failed to list image directory: {}", dir.display()))?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry
                .with_context(|| format!("failed to read entry in {}", dir.display()))?;
            let path = entry.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut inventory = Self::new();
        for path in paths {
            let Some(file_name) = path.file_name().and_then(|value| value.to_str()) else {
                diags.push(
                    DiagnosticKind::UnloadableImage,
                    format!("skipping non UTF-8 file name {}", path.display()),
                );
                continue;
            };
            let (width, height) = match image::image_dimensions(&path) {
                Ok(dimensions) => dimensions,
                Err(image::ImageError::IoError(err)) if !is_decode_failure(&err) => {
                    return Err(anyhow!("failed to read {}: {}", path.display(), err));
                }
                Err(err) => {
                    diags.push(
                        DiagnosticKind::UnloadableImage,
                        format!("error loading '{}' ({}); skipping", path.display(), err),
                    );
                    continue;
                }
            };
            let file_size = fs::metadata(&path)
                .with_context(|| format!("failed to read metadata: {}", path.display()))?
                .len();
            debug!(
                "found image fn='{}' size={}x{} bytes={}",
                file_name, width, height, file_size
            );
            if !matches_naming_convention(file_name) && !is_exempt(file_name, exempt) {
                diags.push(
                    DiagnosticKind::NamingConvention,
                    format!(
                        "file '{}' does not match expected naming convention (i_001, i_001a)",
                        file_name
                    ),
                );
            }
            let asset = ImageAsset::new(file_name, width, height).with_file_size(file_size);
            inventory.insert_reporting(asset, diags);
        }
        info!("found {} images", inventory.len());
        Ok(inventory)
    }

    pub fn from_assets(assets: impl IntoIterator<Item = ImageAsset>) -> Self {
        let mut inventory = Self::new();
        for asset in assets {
            inventory.insert(asset);
        }
        inventory
    }

    /// Inserts an asset; a colliding id is replaced.
    pub fn insert(&mut self, asset: ImageAsset) -> Option<ImageAsset> {
        self.assets.insert(asset.id.clone(), asset)
    }

    fn insert_reporting(&mut self, asset: ImageAsset, diags: &mut Diagnostics) {
        let file_name = asset.file_name.clone();
        if let Some(previous) = self.insert(asset) {
            diags.push(
                DiagnosticKind::DuplicateAssetId,
                format!(
                    "'{}' replaces '{}' (same id '{}')",
                    file_name, previous.file_name, previous.id
                ),
            );
        }
    }

    pub fn get(&self, id: &str) -> Option<&ImageAsset> {
        self.assets.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.assets.contains_key(id)
    }

    pub fn record_use(&mut self, id: &str) -> Result<u32> {
        let asset = self
            .assets
            .get_mut(id)
            .ok_or_else(|| anyhow!("image '{}' is not in the inventory", id))?;
        asset.usage_count += 1;
        Ok(asset.usage_count)
    }

    /// Assets in file-name order.
    pub fn assets(&self) -> impl Iterator<Item = &ImageAsset> {
        let mut assets: Vec<&ImageAsset> = self.assets.values().collect();
        assets.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        assets.into_iter()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

fn is_decode_failure(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData
    )
}

pub fn is_exempt(file_name: &str, exempt: &[String]) -> bool {
    exempt.iter().any(|name| name == file_name)
}

/// Basename with its extension stripped.
pub fn id_from_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rfind('.') {
        Some(dot) if dot > 0 => base[..dot].to_string(),
        _ => base.to_string(),
    }
}

pub fn id_from_page_number(page: &str) -> String {
    format!("i_{}", page)
}

pub fn page_number_from_filename(name: &str) -> String {
    name.chars().filter(char::is_ascii_digit).collect()
}

/// `i_<3-4 digits><optional a-z>.<ext>`
pub fn matches_naming_convention(name: &str) -> bool {
    let Some(rest) = name.strip_prefix("i_") else {
        return false;
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if !(3..=4).contains(&digits) {
        return false;
    }
    let mut rest = &rest[digits..];
    if let Some(first) = rest.bytes().next()
        && first.is_ascii_lowercase()
    {
        rest = &rest[1..];
    }
    rest.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::write_image;
    use proptest::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn naming_convention() {
        assert!(matches_naming_convention("i_001.jpg"));
        assert!(matches_naming_convention("i_0012b.png"));
        assert!(!matches_naming_convention("i_01.jpg"));
        assert!(!matches_naming_convention("i_00123.jpg"));
        assert!(!matches_naming_convention("i_001ab.jpg"));
        assert!(!matches_naming_convention("cover.jpg"));
        assert!(!matches_naming_convention("i_001"));
    }

    #[test]
    fn ids_and_page_numbers() {
        assert_eq!(id_from_filename("images/i_005.jpg"), "i_005");
        assert_eq!(id_from_filename("i_005a.large.png"), "i_005a.large");
        assert_eq!(id_from_filename("noext"), "noext");
        assert_eq!(id_from_page_number("010"), "i_010");
        assert_eq!(page_number_from_filename("i_010a.jpg"), "010");
    }

    proptest! {
        #[test]
        fn id_strips_only_the_extension(
            digits in "[0-9]{3,4}",
            letter in proptest::option::of("[a-z]"),
            ext in "(jpg|jpeg|png|gif)",
        ) {
            let stem = format!("i_{}{}", digits, letter.unwrap_or_default());
            let name = format!("{}.{}", stem, ext);
            prop_assert!(matches_naming_convention(&name));
            prop_assert_eq!(id_from_filename(&name), stem);
        }
    }

    #[test]
    fn scan_reads_dimensions_and_skips_unloadable_files() {
        let dir = tempdir().expect("tempdir");
        write_image(dir.path(), "i_005.png", 60, 80);
        write_image(dir.path(), "plate.png", 10, 10);
        write_image(dir.path(), "cover.png", 12, 12);
        fs::write(dir.path().join("notes.txt"), "not an image").expect("write txt");

        let mut diags = Diagnostics::new();
        let exempt = vec!["cover.png".to_string()];
        let inventory = Inventory::scan(dir.path(), &exempt, &mut diags).expect("scan");

        assert_eq!(inventory.len(), 3);
        let asset = inventory.get("i_005").expect("i_005");
        assert_eq!((asset.width, asset.height), (60, 80));
        assert_eq!(asset.page_number, "005");
        assert_eq!(asset.usage_count, 0);
        assert!(asset.file_size > 0);
        assert_eq!(diags.count(DiagnosticKind::UnloadableImage), 1);
        assert_eq!(diags.count(DiagnosticKind::NamingConvention), 1);
        let names: Vec<&str> = inventory.assets().map(|a| a.file_name.as_str()).collect();
        assert_eq!(names, vec!["cover.png", "i_005.png", "plate.png"]);
    }

    #[test]
    fn scan_missing_directory_is_fatal() {
        let dir = tempdir().expect("tempdir");
        let mut diags = Diagnostics::new();
        assert!(Inventory::scan(&dir.path().join("images"), &[], &mut diags).is_err());
    }

    #[test]
    fn duplicate_ids_are_last_wins() {
        let dir = tempdir().expect("tempdir");
        write_image(dir.path(), "i_001.jpg", 5, 5);
        write_image(dir.path(), "i_001.png", 7, 7);
        let mut diags = Diagnostics::new();
        let inventory = Inventory::scan(dir.path(), &[], &mut diags).expect("scan");
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory.get("i_001").expect("asset").file_name, "i_001.png");
        assert_eq!(diags.count(DiagnosticKind::DuplicateAssetId), 1);
    }

    #[test]
    fn record_use_counts() {
        let mut inventory = Inventory::from_assets([ImageAsset::new("i_001.jpg", 1, 1)]);
        assert_eq!(inventory.record_use("i_001").expect("use"), 1);
        assert_eq!(inventory.record_use("i_001").expect("use"), 2);
        assert!(inventory.record_use("i_002").is_err());
    }
}
