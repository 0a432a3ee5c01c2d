use anyhow::Result;
use tracing::{debug, info};

use super::is_percentage;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::directive::{Directive, serialize};
use crate::document::Document;
use crate::inventory::Inventory;

/// Rewrites each `.il` line so `w` is the image's pixel width.
///
/// A percentage `w` moves to `ew` first. Caption lines are not touched. Every
/// directive is updated, including several that share one image.
/// Returns the number of lines whose text changed.
pub fn reconcile_widths(
    doc: &mut Document,
    directives: &[Directive],
    inventory: &Inventory,
    diags: &mut Diagnostics,
) -> Result<usize> {
    info!("modifying .il statements to match image file widths");
    let mut changed = 0;
    for directive in directives {
        let start = directive.start_line();
        let Some(asset) = inventory.get(&directive.id) else {
            diags.push_at(
                DiagnosticKind::MissingImage,
                start,
                format!(
                    "no image file for '{}'; .il left unchanged",
                    directive.file_name()
                ),
            );
            continue;
        };

        let mut params = directive.params.clone();
        if let Some(width) = params.get("w").map(str::to_string)
            && is_percentage(&width)
        {
            params.insert("ew", width);
        }
        params.insert("w", format!("{}px", asset.width));

        let statement = serialize(&params);
        if doc.line(start) != Some(statement.as_str()) {
            debug!("original .il: {}", doc.line(start).unwrap_or_default());
            debug!("modified .il: {}", statement);
            doc.set_line(start, statement)?;
            changed += 1;
        }
    }
    info!("updated {} .il statements", changed);
    Ok(changed)
}
