use std::collections::HashSet;
use tracing::info;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::directive::Directive;
use crate::document::Document;
use crate::inventory::{Inventory, is_exempt};
use crate::widths::parse_pixels;

#[derive(Debug, Clone)]
pub struct Guidelines {
    /// Largest allowed width or height, in pixels.
    pub max_dimension: u32,
    /// Largest allowed file size, in bytes.
    pub max_file_size: u64,
    /// File names never reported as unused or misnamed.
    pub exempt: Vec<String>,
}

impl Default for Guidelines {
    fn default() -> Self {
        Self {
            max_dimension: 5000,
            max_file_size: 1024 * 1024,
            exempt: vec!["cover.jpg".to_string(), "cover.png".to_string()],
        }
    }
}

/// Cross-checks images against directives. Never fails; returns the number of findings.
pub fn check_consistency(
    doc: &Document,
    directives: &[Directive],
    inventory: &Inventory,
    guidelines: &Guidelines,
    diags: &mut Diagnostics,
) -> usize {
    info!("checking illustrations against image files");
    let before = diags.len();
    let referenced: HashSet<&str> = directives.iter().map(|d| d.id.as_str()).collect();

    for asset in inventory.assets() {
        if asset.usage_count == 0
            && !referenced.contains(asset.id.as_str())
            && !is_exempt(&asset.file_name, &guidelines.exempt)
        {
            diags.push(
                DiagnosticKind::UnusedImage,
                format!("'{}' is not used by any illustration", asset.file_name),
            );
        }
        if asset.width > guidelines.max_dimension || asset.height > guidelines.max_dimension {
            diags.push(
                DiagnosticKind::OversizedDimensions,
                format!(
                    "'{}' is {}x{}px; limit is {}px",
                    asset.file_name, asset.width, asset.height, guidelines.max_dimension
                ),
            );
        }
        if asset.file_size > guidelines.max_file_size {
            diags.push(
                DiagnosticKind::OversizedFile,
                format!(
                    "'{}' is {} bytes; limit is {} bytes",
                    asset.file_name, asset.file_size, guidelines.max_file_size
                ),
            );
        }
    }

    for directive in directives {
        let start = directive.start_line();
        let Some(asset) = inventory.get(&directive.id) else {
            diags.push_at(
                DiagnosticKind::MissingImage,
                start,
                format!("'{}' has no image file", directive.file_name()),
            );
            continue;
        };
        let Some(declared) = directive.params.get("w").and_then(parse_pixels) else {
            continue;
        };
        if declared != asset.width {
            diags.push_at(
                DiagnosticKind::WidthMismatch,
                start,
                format!(
                    "w={}px but '{}' is {}px wide: {}",
                    declared,
                    asset.file_name,
                    asset.width,
                    doc.line(start).unwrap_or_default()
                ),
            );
        }
    }

    let findings = diags.len() - before;
    info!("found {} illustration issues", findings);
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::parse_directives;
    use crate::inventory::ImageAsset;

    fn check(lines: &[&str], inventory: &Inventory) -> Diagnostics {
        let doc = Document::from_lines(lines.iter().copied());
        let mut diags = Diagnostics::new();
        let directives = parse_directives(&doc, &mut diags).expect("parse");
        check_consistency(&doc, &directives, inventory, &Guidelines::default(), &mut diags);
        diags
    }

    #[test]
    fn clean_book_has_no_findings() {
        let inv = Inventory::from_assets([
            ImageAsset::new("i_001.jpg", 600, 800),
            ImageAsset::new("cover.jpg", 600, 800),
        ]);
        let diags = check(&[".il fn=i_001.jpg w=600px"], &inv);
        assert!(diags.is_empty(), "{:?}", diags);
    }

    #[test]
    fn missing_and_oversized_images() {
        let inv = Inventory::from_assets([
            ImageAsset::new("i_001.jpg", 6000, 800).with_file_size(2 * 1024 * 1024),
        ]);
        let diags = check(&[".il fn=i_001.jpg w=50%", ".il fn=i_002.jpg"], &inv);
        assert_eq!(diags.count(DiagnosticKind::OversizedDimensions), 1);
        assert_eq!(diags.count(DiagnosticKind::OversizedFile), 1);
        let missing: Vec<_> = diags.of_kind(DiagnosticKind::MissingImage).collect();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].line, Some(1));
        assert_eq!(diags.count(DiagnosticKind::UnusedImage), 0);
    }

    #[test]
    fn converted_images_are_not_unused() {
        let mut inv = Inventory::from_assets([ImageAsset::new("i_003.jpg", 10, 10)]);
        inv.record_use("i_003").expect("use");
        let diags = check(&["no directives here"], &inv);
        assert!(diags.is_empty());
    }
}
