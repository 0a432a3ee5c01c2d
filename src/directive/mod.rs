//! `.il` / `.ca` illustration directives.

mod params;
mod parser;
mod serializer;

pub use params::Params;
pub use parser::{LineKind, classify, parse_directives, parse_params};
pub use serializer::{PRIORITY_KEYS, format_value, serialize};

use std::ops::Range;

pub const DIRECTIVE_MARKER: &str = ".il";
pub const CAPTION_MARKER: &str = ".ca";
pub const CAPTION_END_MARKER: &str = ".ca-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caption {
    None,
    Line(String),
    Block(Vec<String>),
}

impl Caption {
    /// Builds the caption form for a list of caption text lines.
    pub fn from_lines(lines: Vec<String>) -> Self {
        match lines.len() {
            0 => Caption::None,
            1 if lines[0].is_empty() => Caption::None,
            1 => Caption::Line(lines.into_iter().next().unwrap_or_default()),
            _ => Caption::Block(lines),
        }
    }

    /// Renders the caption as directive lines.
    pub fn to_directive_lines(&self) -> Vec<String> {
        match self {
            Caption::None => Vec::new(),
            Caption::Line(text) => vec![format!("{} {}", CAPTION_MARKER, text)],
            Caption::Block(lines) => {
                let mut out = Vec::with_capacity(lines.len() + 2);
                out.push(CAPTION_MARKER.to_string());
                out.extend(lines.iter().cloned());
                out.push(CAPTION_END_MARKER.to_string());
                out
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// `fn` with its extension stripped.
    pub id: String,
    pub params: Params,
    pub caption: Caption,
    /// Half-open buffer range covering the `.il` line and any caption lines.
    pub line_span: Range<usize>,
    pub scan_page: Option<String>,
}

impl Directive {
    pub fn file_name(&self) -> &str {
        self.params.get("fn").unwrap_or_default()
    }

    pub fn start_line(&self) -> usize {
        self.line_span.start
    }
}
