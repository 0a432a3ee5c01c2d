use std::collections::HashMap;

use crate::inventory::id_from_filename;

const FIGURE_CLASSES: &[&str] = &[".figleft", ".figright", ".figcenter"];
const NUMBERED_CLASS_PREFIXES: &[char] = &['c', 'd', 'g'];

/// Keeps the stylesheet lines that style illustrations and captions.
///
/// Matches `.ic001 {`, `.id001 {`, `.ig001 {` (also inside `@media` blocks) and
/// the `.figleft` / `.figright` / `.figcenter` float classes.
pub fn extract_css<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    let mut rules = Vec::new();
    for line in lines {
        let line: &str = line.as_ref();
        if has_numbered_class(line) || FIGURE_CLASSES.iter().any(|class| line.contains(class)) {
            rules.push(strip_indentation(line));
        }
    }
    rules
}

fn has_numbered_class(line: &str) -> bool {
    line.match_indices(".i").any(|(pos, _)| {
        let rest = &line[pos + 2..];
        let mut chars = rest.chars();
        let Some(kind) = chars.next() else {
            return false;
        };
        if !NUMBERED_CLASS_PREFIXES.contains(&kind) {
            return false;
        }
        let after_kind = &rest[kind.len_utf8()..];
        let digits = after_kind.bytes().take_while(u8::is_ascii_digit).count();
        digits > 0 && after_kind[digits..].starts_with(" {")
    })
}

/// Drops tabs and runs of two or more whitespace characters; single spaces stay.
fn strip_indentation(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut run = String::new();
    let flush = |run: &mut String, out: &mut String| {
        if run.chars().count() == 1 && !run.contains('\t') {
            out.push_str(run);
        }
        run.clear();
    };
    for ch in line.chars() {
        if ch.is_whitespace() {
            run.push(ch);
        } else {
            flush(&mut run, &mut out);
            out.push(ch);
        }
    }
    flush(&mut run, &mut out);
    out
}

/// Maps directive id -> the rendered `<div id=...>` holding that image.
///
/// The first matching div for an image wins.
pub fn extract_fragments(html: &str) -> HashMap<String, String> {
    use kuchiki::traits::*;

    let document = kuchiki::parse_html().one(html);
    let mut fragments = HashMap::new();
    for node in document.descendants() {
        let Some(element) = node.as_element() else {
            continue;
        };
        if element.name.local.as_ref() != "div" || !element.attributes.borrow().contains("id") {
            continue;
        }
        let src = node.descendants().find_map(|child| {
            let child = child.as_element()?;
            if child.name.local.as_ref() != "img" {
                return None;
            }
            child.attributes.borrow().get("src").map(str::to_string)
        });
        let Some(src) = src else {
            continue;
        };
        fragments
            .entry(id_from_filename(&src))
            .or_insert_with(|| node.to_string());
    }
    fragments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_illustration_rules() {
        let css = [
            "<style>",
            "    body { margin: 0; }",
            "    .ic001 {",
            "\t.id002 { width: 50%; }",
            "@media handheld { .ig003 {",
            "    .figcenter   { text-align: center; }",
            "    .icon {",
            "</style>",
        ];
        assert_eq!(
            extract_css(&css),
            vec![
                ".ic001 {",
                ".id002 { width: 50%; }",
                "@media handheld { .ig003 {",
                ".figcenter{ text-align: center; }",
            ]
        );
    }

    #[test]
    fn fragments_are_keyed_by_image_id() {
        let html = r#"<html><body>
<p>intro</p>
<div class='figcenter id001' id='i_001'>
<img src='images/i_001.jpg' alt='' class='ig001' />
<div class='ic001'><p>A DOG.</p></div>
</div>
<div id='nav'><p>no image</p></div>
</body></html>"#;
        let fragments = extract_fragments(html);
        assert_eq!(fragments.len(), 1);
        let fragment = &fragments["i_001"];
        assert!(fragment.starts_with("<div"));
        assert!(fragment.contains("images/i_001.jpg"));
        assert!(fragment.contains("A DOG."));
    }
}
