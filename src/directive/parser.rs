use anyhow::{Result, bail};
use std::collections::HashSet;
use tracing::{debug, info};

use super::{CAPTION_END_MARKER, CAPTION_MARKER, Caption, DIRECTIVE_MARKER, Directive, Params};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::document::Document;
use crate::inventory::id_from_filename;
use crate::scan_page::ScanPageTracker;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    Directive,
    CaptionInline(&'a str),
    CaptionOpen,
    CaptionClose,
    Other,
}

pub fn classify(line: &str) -> LineKind<'_> {
    if line == DIRECTIVE_MARKER || line.starts_with(".il ") {
        return LineKind::Directive;
    }
    if line.starts_with(CAPTION_END_MARKER) {
        return LineKind::CaptionClose;
    }
    if line == CAPTION_MARKER {
        return LineKind::CaptionOpen;
    }
    if let Some(rest) = line.strip_prefix(".ca ") {
        let text = rest.trim_start();
        if text.is_empty() {
            return LineKind::CaptionOpen;
        }
        return LineKind::CaptionInline(text);
    }
    LineKind::Other
}

enum State {
    Scanning,
    InsideDirective(Directive),
    InsideCaptionBlock(Directive, Vec<String>),
}

/// Extracts every directive block from `doc` in document order.
pub fn parse_directives(doc: &Document, diags: &mut Diagnostics) -> Result<Vec<Directive>> {
    info!("parsing .il/.ca statements");
    let mut tracker = ScanPageTracker::new();
    let mut directives = Vec::new();
    let mut seen_ids = HashSet::new();
    let mut state = State::Scanning;

    for (index, line) in doc.lines().iter().enumerate() {
        tracker.observe(line);
        let kind = classify(line);
        state = match state {
            State::Scanning => {
                if kind == LineKind::Directive {
                    State::InsideDirective(open_directive(line, index, &tracker, diags)?)
                } else {
                    State::Scanning
                }
            }
            State::InsideDirective(mut directive) => match kind {
                LineKind::CaptionInline(text) => {
                    directive.caption = Caption::Line(text.to_string());
                    directive.line_span.end = index + 1;
                    finish(directive, &mut directives, &mut seen_ids, diags);
                    State::Scanning
                }
                LineKind::CaptionOpen => State::InsideCaptionBlock(directive, Vec::new()),
                LineKind::Directive => {
                    finish(directive, &mut directives, &mut seen_ids, diags);
                    State::InsideDirective(open_directive(line, index, &tracker, diags)?)
                }
                _ => {
                    finish(directive, &mut directives, &mut seen_ids, diags);
                    State::Scanning
                }
            },
            State::InsideCaptionBlock(mut directive, mut lines) => {
                if kind == LineKind::CaptionClose {
                    directive.caption = Caption::Block(lines);
                    directive.line_span.end = index + 1;
                    finish(directive, &mut directives, &mut seen_ids, diags);
                    State::Scanning
                } else {
                    lines.push(line.clone());
                    State::InsideCaptionBlock(directive, lines)
                }
            }
        };
    }

    match state {
        State::Scanning => {}
        State::InsideDirective(directive) => {
            finish(directive, &mut directives, &mut seen_ids, diags);
        }
        State::InsideCaptionBlock(directive, _) => {
            bail!(
                "caption block for '{}' opened at line {} is never closed with {}",
                directive.id,
                directive.start_line() + 1,
                CAPTION_END_MARKER
            );
        }
    }

    info!("found {} .il statements", directives.len());
    Ok(directives)
}

fn open_directive(
    line: &str,
    index: usize,
    tracker: &ScanPageTracker,
    diags: &mut Diagnostics,
) -> Result<Directive> {
    debug!("line {}: found .il '{}'", index + 1, line);
    let (params, rejected) = parse_params(line);
    for token in rejected {
        diags.push_at(
            DiagnosticKind::MalformedParameter,
            index,
            format!("ignoring malformed parameter '{}'", token),
        );
    }
    let Some(file_name) = params.get("fn") else {
        bail!(
            "line {}: .il statement has no fn= parameter: '{}'",
            index + 1,
            line
        );
    };
    Ok(Directive {
        id: id_from_filename(file_name),
        params,
        caption: Caption::None,
        line_span: index..index + 1,
        scan_page: tracker.current().map(str::to_string),
    })
}

fn finish(
    directive: Directive,
    directives: &mut Vec<Directive>,
    seen_ids: &mut HashSet<String>,
    diags: &mut Diagnostics,
) {
    if !seen_ids.insert(directive.id.clone()) {
        diags.push_at(
            DiagnosticKind::SharedFilename,
            directive.start_line(),
            format!(
                "'{}' is referenced by more than one .il statement",
                directive.file_name()
            ),
        );
    }
    directives.push(directive);
}

struct Token {
    text: String,
    quoted: bool,
}

/// Splits a directive line into `key=value` parameters.
///
/// Returns the parameters plus any tokens that could not be read as one.
pub fn parse_params(line: &str) -> (Params, Vec<String>) {
    let mut params = Params::new();
    let mut rejected = Vec::new();
    for token in tokenize(line).into_iter().skip(1) {
        let Some((key, value)) = token.text.split_once('=') else {
            rejected.push(token.text);
            continue;
        };
        if key.is_empty() || (!token.quoted && value.contains('=')) {
            rejected.push(token.text);
            continue;
        }
        params.insert(key, value);
    }
    (params, rejected)
}

fn tokenize(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;
    let mut quote: Option<char> = None;

    for ch in line.chars() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => current.push(ch),
            None if ch == '\'' || ch == '"' => {
                quote = Some(ch);
                quoted = true;
                in_token = true;
            }
            None if ch.is_whitespace() => {
                if in_token {
                    tokens.push(Token {
                        text: std::mem::take(&mut current),
                        quoted,
                    });
                    in_token = false;
                    quoted = false;
                }
            }
            None => {
                current.push(ch);
                in_token = true;
            }
        }
    }
    if in_token {
        tokens.push(Token {
            text: current,
            quoted,
        });
    }
    tokens
}
