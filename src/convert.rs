//! Conversion of `[Illustration: ...]` tags into `.il`/`.ca` directives.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::directive::Caption;
use crate::document::Document;
use crate::id_resolver;
use crate::inventory::Inventory;
use crate::scan_page::ScanPageTracker;

const TAG_OPEN: &str = "[Illustration";
const ASTERISK_TAG_OPEN: &str = "*[Illustration";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConversionReport {
    pub tags: usize,
    /// `*[Illustration]` tags; these still need moving to a paragraph break by hand.
    pub asterisk_tags: usize,
}

/// Replaces every raw illustration tag in `doc` with directive lines.
///
/// `doc` is left untouched when an illustration cannot be matched to an image.
pub fn convert_raw_markup(
    doc: &mut Document,
    inventory: &mut Inventory,
    diags: &mut Diagnostics,
) -> Result<ConversionReport> {
    info!("converting [Illustration] tags");
    let lines = doc.lines();
    let mut out = Vec::with_capacity(lines.len());
    let mut tracker = ScanPageTracker::new();
    let mut report = ConversionReport::default();
    let mut asterisk_lines = Vec::new();
    let mut index = 0;

    while index < lines.len() {
        let line = &lines[index];
        tracker.observe(line);

        let asterisk = line.starts_with(ASTERISK_TAG_OPEN);
        if !asterisk && !line.starts_with(TAG_OPEN) {
            out.push(line.clone());
            index += 1;
            continue;
        }

        let start = index;
        let end = match lines[start..].iter().position(|line| line.ends_with(']')) {
            Some(offset) => start + offset,
            None => {
                diags.push_at(
                    DiagnosticKind::UnterminatedTag,
                    start,
                    "illustration tag is never closed with ']'; consuming to end of file",
                );
                lines.len() - 1
            }
        };
        let tag = &lines[start..=end];

        if asterisk {
            report.asterisk_tags += 1;
            asterisk_lines.push((start + 1).to_string());
        } else {
            report.tags += 1;
        }

        let resolution = id_resolver::resolve(tracker.current(), inventory)
            .with_context(|| format!("line {}: cannot place illustration", start + 1))?;
        if resolution.reused {
            diags.push_at(
                DiagnosticKind::AssetReused,
                start,
                format!(
                    "every image for scan page {} is already used; reusing '{}'",
                    tracker.current().unwrap_or_default(),
                    resolution.id
                ),
            );
        }
        let asset = inventory
            .get(&resolution.id)
            .context("resolved image missing from inventory")?;
        out.push(format!(
            ".il id={} fn={} w={}px alt=''",
            resolution.id, asset.file_name, asset.width
        ));
        let caption = Caption::from_lines(tag.iter().map(|line| strip_tag(line)).collect());
        out.extend(caption.to_directive_lines());
        inventory.record_use(&resolution.id)?;

        debug!(
            "line {}: scan page {}: converted {:?}",
            start + 1,
            tracker.current().unwrap_or_default(),
            tag
        );
        index = end + 1;
    }

    info!("processed {} [Illustration] tags", report.tags);
    if report.asterisk_tags > 0 {
        diags.push(
            DiagnosticKind::RepositionRequired,
            format!(
                "found {} *[Illustration] tags (lines {}); .il/.ca statements have been generated, \
                 but relocation to a paragraph break must be performed manually",
                report.asterisk_tags,
                asterisk_lines.join(", ")
            ),
        );
    }

    doc.replace_lines(out);
    Ok(report)
}

/// Removes tag delimiters, leaving only caption text.
fn strip_tag(line: &str) -> String {
    let mut text = line;
    if let Some(rest) = text
        .strip_prefix(ASTERISK_TAG_OPEN)
        .or_else(|| text.strip_prefix(TAG_OPEN))
    {
        text = rest.strip_prefix(':').unwrap_or(rest).trim_start();
    }
    text.strip_suffix(']').unwrap_or(text).to_string()
}
