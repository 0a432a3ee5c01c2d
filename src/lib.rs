use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use tracing::info;

pub mod boilerplate;
pub mod check;
pub mod convert;
pub mod diagnostics;
pub mod directive;
pub mod document;
pub mod id_resolver;
pub mod inventory;
pub mod logging;
pub mod scan_page;
pub mod settings;
#[cfg(test)]
mod test_util;
pub mod widths;

pub use boilerplate::{PpgenRenderer, RenderOutput, Renderer};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use document::Document;
pub use inventory::Inventory;
pub use settings::Settings;

use directive::parse_directives;
use widths::{WidthCache, WidthOptions};

const USAGE_HINT: &str =
    "no operation selected; use -i, -b, -w, -c, --calcimagewidths or --gettargetwidth (see --help)";

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub infile: Option<PathBuf>,
    pub outfile: Option<PathBuf>,
    pub illustrations: bool,
    pub boilerplate: bool,
    pub update_widths: bool,
    pub calc_widths: bool,
    pub check: bool,
    pub dry_run: bool,
    pub max_width: Option<u32>,
    pub target_width_of: Option<String>,
    pub settings_path: Option<PathBuf>,
}

/// The single document-rewriting pass an invocation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Illustrations,
    Boilerplate,
    UpdateWidths,
    CalcWidths,
}

impl Config {
    /// Highest-precedence mode requested, if any.
    pub fn mode(&self) -> Option<Mode> {
        if self.illustrations {
            Some(Mode::Illustrations)
        } else if self.boilerplate {
            Some(Mode::Boilerplate)
        } else if self.update_widths {
            Some(Mode::UpdateWidths)
        } else if self.calc_widths {
            Some(Mode::CalcWidths)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionOutput {
    /// Line for stdout; empty when there is nothing to print.
    pub text: String,
    pub diagnostics: Diagnostics,
    /// Where the document was written, if it was.
    pub written: Option<PathBuf>,
}

pub fn run(config: Config) -> Result<String> {
    let settings = settings::load_settings(config.settings_path.as_deref())?;
    let renderer = PpgenRenderer::new(
        settings.renderer_command.clone(),
        settings.renderer_args.clone(),
    );
    let mut diags = Diagnostics::new();
    let result = execute(&config, &settings, &renderer, &mut diags);
    // Also reported when the run fails.
    diags.report();
    let (text, _) = result?;
    Ok(text)
}

/// Runs one invocation against already-loaded settings and a renderer.
pub fn run_with<R: Renderer>(
    config: &Config,
    settings: &Settings,
    renderer: &R,
) -> Result<ExecutionOutput> {
    let mut diags = Diagnostics::new();
    let (text, written) = execute(config, settings, renderer, &mut diags)?;
    Ok(ExecutionOutput {
        text,
        diagnostics: diags,
        written,
    })
}

/// Like [`run_with`], but findings land in `diags` even when the run fails.
///
/// Returns the stdout text and the path the document was written to.
pub fn execute<R: Renderer>(
    config: &Config,
    settings: &Settings,
    renderer: &R,
    diags: &mut Diagnostics,
) -> Result<(String, Option<PathBuf>)> {
    if let Some(key) = config.target_width_of.as_deref() {
        return Ok((target_width(settings, key)?, None));
    }

    let mode = config.mode();
    if mode.is_none() && !config.check {
        return Err(anyhow!(USAGE_HINT));
    }
    let infile = config
        .infile
        .as_deref()
        .ok_or_else(|| anyhow!("an input file is required"))?;
    let base = base_dir(infile);
    let images_dir = resolve_path(base, &settings.images_dir);

    let mut doc = Document::load(infile)?;
    info!("loaded {} lines from {}", doc.len(), infile.display());
    // Boilerplate generation never looks at the image files.
    let needs_inventory = config.check
        || matches!(
            mode,
            Some(Mode::Illustrations | Mode::UpdateWidths | Mode::CalcWidths)
        );
    let mut inventory = if needs_inventory {
        Inventory::scan(&images_dir, &settings.guidelines.exempt, diags)?
    } else {
        Inventory::new()
    };

    let mut text = String::new();
    let mut rewritten = false;
    match mode {
        Some(Mode::Illustrations) => {
            let report = convert::convert_raw_markup(&mut doc, &mut inventory, diags)?;
            info!(
                "converted {} illustration tags ({} marked '*')",
                report.tags, report.asterisk_tags
            );
            rewritten = true;
        }
        Some(Mode::Boilerplate) => {
            let directives = parse_directives(&doc, diags)?;
            boilerplate::generate_boilerplate(&mut doc, &directives, renderer, diags)?;
            rewritten = true;
        }
        Some(Mode::UpdateWidths) => {
            let directives = parse_directives(&doc, diags)?;
            widths::reconcile_widths(&mut doc, &directives, &inventory, diags)?;
            rewritten = true;
        }
        Some(Mode::CalcWidths) => {
            text = calc_widths(config, settings, base, &doc, &inventory, diags)?;
        }
        None => {}
    }

    if config.check {
        let directives = parse_directives(&doc, diags)?;
        check::check_consistency(&doc, &directives, &inventory, &settings.guidelines, diags);
    }

    let mut written = None;
    if rewritten {
        let outfile = config
            .outfile
            .clone()
            .unwrap_or_else(|| default_output_path(infile));
        if config.dry_run {
            info!("dry run: {} not written", outfile.display());
        } else {
            doc.save(&outfile)?;
            info!("wrote {}", outfile.display());
            written = Some(outfile);
        }
    }

    Ok((text, written))
}

fn calc_widths(
    config: &Config,
    settings: &Settings,
    base: &Path,
    doc: &Document,
    inventory: &Inventory,
    diags: &mut Diagnostics,
) -> Result<String> {
    let max_width = config.max_width.unwrap_or(settings.max_width);
    if max_width == 0 {
        return Err(anyhow!("--maxwidth must be greater than 0"));
    }
    let directives = parse_directives(doc, diags)?;
    let cache_path = resolve_path(base, &settings.width_cache);
    let mut cache = WidthCache::load(&cache_path)?;
    let options = WidthOptions {
        max_width,
        images_dir: &settings.images_dir,
        fallback_percent: settings.fallback_percent,
    };
    let targets = widths::calculate_widths(&directives, inventory, options, &mut cache, diags);
    if config.dry_run {
        return Ok(format!(
            "dry run: {} target widths calculated, {} not written",
            targets.len(),
            cache_path.display()
        ));
    }
    cache.save(&cache_path)?;
    widths::touch_masters(&resolve_path(base, &settings.masters_dir), diags)?;
    info!("********************************************************************");
    info!("* Target widths recorded. Rerun the image resize step, then run   *");
    info!("* ppimg-rust -w to update the .il statements with the new widths. *");
    info!("********************************************************************");
    Ok(format!(
        "{} target widths written to {}",
        targets.len(),
        cache_path.display()
    ))
}

/// `book.txt` -> `book-out.txt`, next to the input.
pub fn default_output_path(infile: &Path) -> PathBuf {
    let stem = infile
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    infile.with_file_name(format!("{}-out.txt", stem))
}

fn base_dir(infile: &Path) -> &Path {
    match infile.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn resolve_path(base: &Path, configured: &str) -> PathBuf {
    let path = Path::new(configured);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Reads `path` from the width cache configured in `settings`.
pub fn target_width(settings: &Settings, key: &str) -> Result<String> {
    let cache = WidthCache::load(Path::new(&settings.width_cache))
        .with_context(|| format!("cannot look up target width for {}", key))?;
    cache.require_target_width(key)
}
