use anyhow::{Result, anyhow};

use crate::inventory::{Inventory, id_from_page_number};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub id: String,
    /// The page's base image was already used and is being attached again.
    pub reused: bool,
}

/// Picks the image for an illustration found on `scan_page`.
///
/// Candidates are `i_<page>`, then `i_<page>a` through `i_<page>z`; the first
/// unused one wins. When every candidate is taken the base image is reused.
pub fn resolve(scan_page: Option<&str>, inventory: &Inventory) -> Result<Resolution> {
    let page = scan_page
        .ok_or_else(|| anyhow!("illustration found before any scan page marker"))?;
    let base = id_from_page_number(page);

    if is_unused(&base, inventory) {
        return Ok(Resolution {
            id: base,
            reused: false,
        });
    }
    for letter in b'a'..=b'z' {
        let candidate = format!("{}{}", base, letter as char);
        if is_unused(&candidate, inventory) {
            return Ok(Resolution {
                id: candidate,
                reused: false,
            });
        }
    }
    if inventory.contains(&base) {
        return Ok(Resolution {
            id: base,
            reused: true,
        });
    }
    Err(anyhow!(
        "no image file for illustration located on scan page {} (expected {} or {}a..{}z)",
        page,
        base,
        base,
        base
    ))
}

fn is_unused(id: &str, inventory: &Inventory) -> bool {
    inventory
        .get(id)
        .map(|asset| asset.usage_count == 0)
        .unwrap_or(false)
}
