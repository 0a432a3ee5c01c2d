mod cache;
mod calculate;
mod reconcile;

pub use cache::WidthCache;
pub use calculate::{TargetWidth, WidthOptions, cache_key, calculate_widths, touch_masters};
pub use reconcile::reconcile_widths;

pub(crate) fn is_percentage(value: &str) -> bool {
    value.contains('%')
}

/// `"50%"` -> `50.0`.
pub(crate) fn parse_percentage(value: &str) -> Option<f64> {
    value.trim().strip_suffix('%')?.trim().parse::<f64>().ok()
}

/// `"600px"` -> `600`.
pub(crate) fn parse_pixels(value: &str) -> Option<u32> {
    value.trim().strip_suffix("px")?.trim().parse::<u32>().ok()
}
