use anyhow::{Context, Result, anyhow};
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tracing::info;

use super::extract::{extract_css, extract_fragments};
use super::{RenderOutput, Renderer};
use crate::document::Document;

const TEMP_SOURCE_NAME: &str = "ppimgtempsrc";

/// Runs the ppgen executable on a scratch copy of the directives.
#[derive(Debug, Clone)]
pub struct PpgenRenderer {
    command: String,
    args: Vec<String>,
}

impl PpgenRenderer {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

impl Renderer for PpgenRenderer {
    fn render(&self, source: &[String]) -> Result<RenderOutput> {
        let dir = tempfile::Builder::new()
            .prefix("ppimg")
            .tempdir()
            .with_context(|| "failed to create temporary directory")?;
        let source_path = dir.path().join(TEMP_SOURCE_NAME);
        let mut content = source.join("\n");
        content.push('\n');
        fs::write(&source_path, content)
            .with_context(|| format!("failed to write {}", source_path.display()))?;

        info!("running {} against temporary source file", self.command);
        let output = Command::new(&self.command)
            .args(&self.args)
            .arg(&source_path)
            .current_dir(dir.path())
            .output()
            .with_context(|| format!("failed to run {} (is it installed?)", self.command))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "{} failed ({}): {}",
                self.command,
                output.status,
                stderr.trim()
            ));
        }

        let html_path = html_output_path(&source_path);
        info!("parsing generated HTML {}", html_path.display());
        let html = Document::load(&html_path)
            .with_context(|| format!("{} produced no HTML output", self.command))?;
        Ok(RenderOutput {
            css: extract_css(html.lines()),
            fragments: extract_fragments(&html.lines().join("\n")),
        })
    }
}

fn html_output_path(source: &std::path::Path) -> PathBuf {
    let mut name = OsString::from(source.as_os_str());
    name.push(".html");
    PathBuf::from(name)
}
