//! HTML boilerplate generation.
//!
//! The directives are rendered once by an external renderer. Its CSS rules
//! become `.de` lines at the top of the document, and each `.il`/`.ca` block is
//! wrapped so text output keeps the directive while HTML output gets the
//! rendered markup verbatim:
//!
//! ```text
//! .if t
//! <original .il/.ca block>
//! .if-
//! .if h
//! .li
//! <rendered html>
//! .li-
//! .if-
//! ```

mod extract;
mod ppgen;

pub use extract::{extract_css, extract_fragments};
pub use ppgen::PpgenRenderer;

use anyhow::Result;
use std::collections::HashMap;
use tracing::info;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::directive::Directive;
use crate::document::Document;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    /// Directive id -> rendered HTML fragment.
    pub fragments: HashMap<String, String>,
    pub css: Vec<String>,
}

pub trait Renderer {
    /// Renders a directive-only source document.
    fn render(&self, source: &[String]) -> Result<RenderOutput>;
}

/// Every directive block, each followed by a blank line.
pub fn directive_source(doc: &Document, directives: &[Directive]) -> Vec<String> {
    let mut source = Vec::new();
    for directive in directives {
        source.extend(doc.slice(directive.line_span.clone()).iter().cloned());
        source.push(String::new());
    }
    source
}

pub fn generate_boilerplate<R: Renderer>(
    doc: &mut Document,
    directives: &[Directive],
    renderer: &R,
    diags: &mut Diagnostics,
) -> Result<()> {
    info!("generating HTML boilerplate");
    let source = directive_source(doc, directives);
    let rendered = renderer.render(&source)?;
    let merged = merge_boilerplate(doc, directives, &rendered, diags);
    doc.replace_lines(merged);
    Ok(())
}

/// Splices rendered CSS and HTML into a copy of the document's lines.
pub fn merge_boilerplate(
    doc: &Document,
    directives: &[Directive],
    rendered: &RenderOutput,
    diags: &mut Diagnostics,
) -> Vec<String> {
    info!("adding {} css rules", rendered.css.len());
    let mut out: Vec<String> = rendered.css.iter().map(|rule| format!(".de {}", rule)).collect();

    let by_start: HashMap<usize, &Directive> = directives
        .iter()
        .map(|directive| (directive.start_line(), directive))
        .collect();
    let mut first_line: HashMap<&str, usize> = HashMap::new();
    for directive in directives {
        first_line
            .entry(directive.id.as_str())
            .or_insert(directive.start_line());
    }

    info!("adding html");
    let mut index = 0;
    while index < doc.len() {
        let Some(directive) = by_start.get(&index) else {
            out.extend(doc.line(index).map(str::to_string));
            index += 1;
            continue;
        };
        if first_line.get(directive.id.as_str()) != Some(&index) {
            diags.push_at(
                DiagnosticKind::UnexpectedLine,
                index,
                format!("illustration id='{}' found on unexpected line", directive.id),
            );
        }
        let block = doc.slice(directive.line_span.clone());
        match rendered.fragments.get(&directive.id) {
            Some(html) => {
                out.push(".if t".to_string());
                out.extend(block.iter().cloned());
                out.push(".if-".to_string());
                out.push(".if h".to_string());
                out.push(".li".to_string());
                out.extend(html.lines().map(str::to_string));
                out.push(".li-".to_string());
                out.push(".if-".to_string());
            }
            None => {
                diags.push_at(
                    DiagnosticKind::MissingFragment,
                    index,
                    format!("renderer produced no HTML for '{}'; block kept as is", directive.id),
                );
                out.extend(block.iter().cloned());
            }
        }
        index = directive.line_span.end;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::parse_directives;
    use std::cell::RefCell;

    struct FakeRenderer {
        seen: RefCell<Vec<String>>,
    }

    impl Renderer for FakeRenderer {
        fn render(&self, source: &[String]) -> Result<RenderOutput> {
            *self.seen.borrow_mut() = source.to_vec();
            let mut fragments = HashMap::new();
            fragments.insert(
                "i_001".to_string(),
                "<div id='i_001'>\n<img src='images/i_001.jpg' />\n</div>".to_string(),
            );
            Ok(RenderOutput {
                fragments,
                css: vec![".figcenter { text-align: center; }".to_string()],
            })
        }
    }

    #[test]
    fn wraps_blocks_and_prepends_css() {
        let mut doc = Document::from_lines([
            "Prose.",
            ".il fn=i_001.jpg w=600px",
            ".ca A DOG.",
            "More prose.",
            ".il fn=i_002.jpg w=100px",
        ]);
        let mut diags = Diagnostics::new();
        let directives = parse_directives(&doc, &mut diags).expect("parse");
        let renderer = FakeRenderer {
            seen: RefCell::new(Vec::new()),
        };
        generate_boilerplate(&mut doc, &directives, &renderer, &mut diags).expect("generate");

        assert_eq!(
            renderer.seen.borrow().as_slice(),
            &[
                ".il fn=i_001.jpg w=600px",
                ".ca A DOG.",
                "",
                ".il fn=i_002.jpg w=100px",
                "",
            ]
        );
        insta::assert_snapshot!(doc.lines().join("\n"), @r"
        .de .figcenter { text-align: center; }
        Prose.
        .if t
        .il fn=i_001.jpg w=600px
        .ca A DOG.
        .if-
        .if h
        .li
        <div id='i_001'>
        <img src='images/i_001.jpg' />
        </div>
        .li-
        .if-
        More prose.
        .il fn=i_002.jpg w=100px
        ");
        assert_eq!(diags.count(DiagnosticKind::MissingFragment), 1);
    }

    #[test]
    fn repeated_image_is_flagged_on_later_lines() {
        let doc = Document::from_lines([".il fn=i_001.jpg", "", ".il fn=i_001.jpg"]);
        let mut diags = Diagnostics::new();
        let directives = parse_directives(&doc, &mut diags).expect("parse");
        let mut rendered = RenderOutput::default();
        rendered
            .fragments
            .insert("i_001".to_string(), "<div></div>".to_string());
        let merged = merge_boilerplate(&doc, &directives, &rendered, &mut diags);
        let unexpected: Vec<_> = diags.of_kind(DiagnosticKind::UnexpectedLine).collect();
        assert_eq!(unexpected.len(), 1);
        assert_eq!(unexpected[0].line, Some(2));
        assert_eq!(merged.iter().filter(|line| *line == ".li").count(), 2);
    }
}
