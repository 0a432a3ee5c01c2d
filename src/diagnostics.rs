use std::fmt;

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    NamingConvention,
    UnloadableImage,
    DuplicateAssetId,
    RepositionRequired,
    UnterminatedTag,
    AssetReused,
    MalformedParameter,
    SharedFilename,
    UnexpectedLine,
    MissingFragment,
    UnusedImage,
    MissingImage,
    OversizedDimensions,
    OversizedFile,
    WidthMismatch,
    MissingPercentage,
    MastersUnavailable,
}

impl DiagnosticKind {
    pub fn label(self) -> &'static str {
        match self {
            DiagnosticKind::NamingConvention => "naming convention",
            DiagnosticKind::UnloadableImage => "unloadable image",
            DiagnosticKind::DuplicateAssetId => "duplicate image id",
            DiagnosticKind::RepositionRequired => "manual relocation",
            DiagnosticKind::UnterminatedTag => "unterminated tag",
            DiagnosticKind::AssetReused => "image reused",
            DiagnosticKind::MalformedParameter => "malformed parameter",
            DiagnosticKind::SharedFilename => "shared filename",
            DiagnosticKind::UnexpectedLine => "unexpected line",
            DiagnosticKind::MissingFragment => "missing fragment",
            DiagnosticKind::UnusedImage => "unused image",
            DiagnosticKind::MissingImage => "missing image",
            DiagnosticKind::OversizedDimensions => "oversized dimensions",
            DiagnosticKind::OversizedFile => "oversized file",
            DiagnosticKind::WidthMismatch => "width mismatch",
            DiagnosticKind::MissingPercentage => "missing percentage",
            DiagnosticKind::MastersUnavailable => "masters unavailable",
        }
    }
}

/// A recoverable finding. Fatal conditions are returned as errors instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// 0-based buffer line the finding refers to, when there is one.
    pub line: Option<usize>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}: {}", line + 1, self.kind.label(), self.message),
            None => write!(f, "{}: {}", self.kind.label(), self.message),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        self.entries.push(Diagnostic {
            kind,
            line: None,
            message: message.into(),
        });
    }

    pub fn push_at(&mut self, kind: DiagnosticKind, line: usize, message: impl Into<String>) {
        self.entries.push(Diagnostic {
            kind,
            line: Some(line),
            message: message.into(),
        });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|entry| entry.kind == kind).count()
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |entry| entry.kind == kind)
    }

    /// Logs every finding at warn level.
    pub fn report(&self) {
        for entry in &self.entries {
            warn!("{}", entry);
        }
    }
}
