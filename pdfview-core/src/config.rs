//! Viewer settings read from `config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::Rgba;
use crate::layout::{VerticalStack, DEFAULT_SPACING};
use crate::render::RenderStyle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Vertical gap between pages, in document units.
    pub spacing: f64,
    pub zoom: f64,
    /// Margin kept around a highlighted match when scrolling to it.
    pub clamp_margin: f64,
    pub scroll_step: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub background: Rgba,
    pub page_background: Rgba,
    pub match_highlight: Rgba,
    pub current_match_highlight: Rgba,
    /// Pixels per PDF unit used when rasterising pages for printing.
    pub print_scale: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let style = RenderStyle::default();
        Self {
            spacing: DEFAULT_SPACING,
            zoom: 1.0,
            clamp_margin: 10.0,
            scroll_step: 20.0,
            viewport_width: 800.0,
            viewport_height: 600.0,
            background: style.background,
            page_background: style.page_background,
            match_highlight: style.match_highlight,
            current_match_highlight: style.current_match_highlight,
            print_scale: 2.0,
        }
    }
}

impl ViewerConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source).context("invalid viewer configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        let config = Self::from_toml_str(&source)
            .with_context(|| format!("failed to load config file {:?}", path))?;
        debug!(?path, "configuration loaded");
        Ok(config)
    }

    /// `<config dir>/config.toml` for the current platform.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("net", "pdfview", "pdfview")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// An explicit path must exist. Without one the platform default is used
    /// when present, and built-in defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn render_style(&self) -> RenderStyle {
        RenderStyle {
            background: self.background,
            page_background: self.page_background,
            match_highlight: self.match_highlight,
            current_match_highlight: self.current_match_highlight,
        }
    }

    pub fn layout_policy(&self) -> VerticalStack {
        VerticalStack {
            spacing: self.spacing,
        }
    }

    fn validate(&self) -> Result<()> {
        if !(self.zoom.is_finite() && self.zoom > 0.0) {
            bail!("zoom must be greater than zero, got {}", self.zoom);
        }
        if !(self.print_scale.is_finite() && self.print_scale > 0.0) {
            bail!("print_scale must be greater than zero, got {}", self.print_scale);
        }
        if self.spacing < 0.0 || self.clamp_margin < 0.0 || self.scroll_step < 0.0 {
            bail!("spacing, clamp_margin and scroll_step must not be negative");
        }
        if self.viewport_width < 0.0 || self.viewport_height < 0.0 {
            bail!("viewport size must not be negative");
        }
        Ok(())
    }
}
