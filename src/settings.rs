use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::check::Guidelines;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub images_dir: String,
    pub masters_dir: String,
    pub width_cache: String,
    pub renderer_command: String,
    pub renderer_args: Vec<String>,
    pub fallback_percent: f64,
    pub max_width: u32,
    pub guidelines: Guidelines,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            images_dir: "images".to_string(),
            masters_dir: "originals/illustrations".to_string(),
            width_cache: "images.json".to_string(),
            renderer_command: "ppgen".to_string(),
            renderer_args: vec!["-i".to_string()],
            fallback_percent: 40.0,
            max_width: 800,
            guidelines: Guidelines::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    paths: Option<PathSettings>,
    renderer: Option<RendererSettings>,
    widths: Option<WidthSettings>,
    check: Option<CheckSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct PathSettings {
    images: Option<String>,
    masters: Option<String>,
    width_cache: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RendererSettings {
    command: Option<String>,
    args: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct WidthSettings {
    fallback_percent: Option<f64>,
    max_width: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct CheckSettings {
    max_dimension: Option<u32>,
    max_file_size: Option<u64>,
    exempt: Option<Vec<String>>,
}

/// Embedded defaults, then `ppimg.toml`, `ppimg.local.toml`, the home settings
/// file and finally `extra_path`. Later layers override earlier ones key by key.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut ordered_paths = vec![PathBuf::from("ppimg.toml"), PathBuf::from("ppimg.local.toml")];
    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
    }
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }
    load_layers(&ordered_paths)
}

fn load_layers(paths: &[PathBuf]) -> Result<Settings> {
    let mut settings = Settings::default();
    let embedded: SettingsFile =
        toml::from_str(DEFAULT_SETTINGS_TOML).context("failed to parse embedded settings")?;
    settings.merge(embedded);

    for path in paths {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }
    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(paths) = incoming.paths {
            merge_text(&mut self.images_dir, paths.images);
            merge_text(&mut self.masters_dir, paths.masters);
            merge_text(&mut self.width_cache, paths.width_cache);
        }
        if let Some(renderer) = incoming.renderer {
            merge_text(&mut self.renderer_command, renderer.command);
            if let Some(args) = renderer.args {
                self.renderer_args = args;
            }
        }
        if let Some(widths) = incoming.widths {
            if let Some(percent) = widths.fallback_percent
                && percent >= 0.0
            {
                self.fallback_percent = percent;
            }
            if let Some(max_width) = widths.max_width
                && max_width > 0
            {
                self.max_width = max_width;
            }
        }
        if let Some(check) = incoming.check {
            if let Some(limit) = check.max_dimension
                && limit > 0
            {
                self.guidelines.max_dimension = limit;
            }
            if let Some(limit) = check.max_file_size
                && limit > 0
            {
                self.guidelines.max_file_size = limit;
            }
            if let Some(exempt) = check.exempt {
                self.guidelines.exempt = exempt;
            }
        }
    }
}

fn merge_text(slot: &mut String, value: Option<String>) {
    if let Some(value) = value
        && !value.trim().is_empty()
    {
        *slot = value;
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".ppimg-rust"))
        }
    })
}
