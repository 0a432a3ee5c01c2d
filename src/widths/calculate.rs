use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, info};

use super::cache::WidthCache;
use super::parse_percentage;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::directive::Directive;
use crate::inventory::Inventory;

#[derive(Debug, Clone, Copy)]
pub struct WidthOptions<'a> {
    /// Widest the rendered page may be, in pixels.
    pub max_width: u32,
    /// Prefix for cache keys, e.g. `images`.
    pub images_dir: &'a str,
    /// Share of `max_width` given to images no directive mentions.
    pub fallback_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetWidth {
    pub key: String,
    pub width: u64,
}

/// Computes target widths and merges them into `cache`.
pub fn calculate_widths(
    directives: &[Directive],
    inventory: &Inventory,
    options: WidthOptions<'_>,
    cache: &mut WidthCache,
    diags: &mut Diagnostics,
) -> Vec<TargetWidth> {
    info!("calculating widths for max width {}px", options.max_width);
    let mut targets = Vec::new();
    let mut covered = HashSet::new();

    for directive in directives {
        covered.insert(directive.id.as_str());
        let scale = match directive_percentage(directive) {
            Some(percent) => percent / 100.0,
            None => {
                diags.push_at(
                    DiagnosticKind::MissingPercentage,
                    directive.start_line(),
                    format!(
                        "w or ew must be expressed in % to calculate a width for '{}'",
                        directive.file_name()
                    ),
                );
                0.0
            }
        };
        targets.push(TargetWidth {
            key: cache_key(options.images_dir, directive.file_name()),
            width: scaled(scale, options.max_width),
        });
    }

    for asset in inventory.assets() {
        if covered.contains(asset.id.as_str()) {
            continue;
        }
        targets.push(TargetWidth {
            key: cache_key(options.images_dir, &asset.file_name),
            width: scaled(options.fallback_percent / 100.0, options.max_width),
        });
    }

    for target in &targets {
        debug!("key: {}, calculated width: {}", target.key, target.width);
        cache.set_target_width(&target.key, target.width);
    }
    targets
}

fn directive_percentage(directive: &Directive) -> Option<f64> {
    ["w", "ew"]
        .iter()
        .filter_map(|key| directive.params.get(key))
        .find_map(parse_percentage)
}

fn scaled(scale: f64, max_width: u32) -> u64 {
    (scale * f64::from(max_width)).round().max(0.0) as u64
}

pub fn cache_key(images_dir: &str, file_name: &str) -> String {
    let dir = images_dir.trim_end_matches('/');
    if dir.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", dir, file_name)
    }
}

/// Bumps the modification time of every file in `dir` so the resize step
/// regenerates the images from their masters. Returns the number of files touched.
pub fn touch_masters(dir: &Path, diags: &mut Diagnostics) -> Result<usize> {
    if !dir.is_dir() {
        diags.push(
            DiagnosticKind::MastersUnavailable,
            format!(
                "master image directory '{}' not found; nothing to touch",
                dir.display()
            ),
        );
        return Ok(0);
    }
    let now = SystemTime::now();
    let mut touched = 0;
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?;
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to read entry in {}", dir.display()))?
            .path();
        if !path.is_file() {
            continue;
        }
        let file = fs::File::options()
            .write(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        file.set_modified(now)
            .with_context(|| format!("failed to touch {}", path.display()))?;
        touched += 1;
    }
    info!("touched {} master images in {}", touched, dir.display());
    Ok(touched)
}
