use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::zscale::ZScaleParams;
use crate::model::{Colormap, LegendLoc};

static CONFIG_DIR: OnceLock<PathBuf> = OnceLock::new();

const CONFIG_FILENAME: &str = "astroplot_config.json";
const ENV_PREFIX: &str = "ASTROPLOT";

/// Session-wide plotting defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub figure_width: u32,
    pub figure_height: u32,
    pub colormap: Colormap,
    /// Anchor used when a legend is requested without one.
    pub legend_loc: LegendLoc,
    /// Length of the blank label list applied when ticks are hidden.
    pub blank_tick_count: usize,
    /// Where `show` drops its preview renders. Defaults to the temp dir.
    pub preview_dir: Option<PathBuf>,
    pub zscale: ZScaleParams,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            figure_width: 800,
            figure_height: 600,
            colormap: Colormap::Gray,
            legend_loc: LegendLoc::UpperRight,
            blank_tick_count: 20,
            preview_dir: None,
            zscale: ZScaleParams::default(),
        }
    }
}

impl PlotConfig {
    pub fn figure_size(&self) -> (u32, u32) {
        (self.figure_width, self.figure_height)
    }

    pub fn preview_dir(&self) -> PathBuf {
        self.preview_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("astroplot"))
    }
}

pub fn init_config_dir(dir: &Path) {
    let _ = std::fs::create_dir_all(dir);
    let _ = CONFIG_DIR.set(dir.to_path_buf());
}

pub fn config_path() -> PathBuf {
    CONFIG_DIR
        .get()
        .cloned()
        .unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("astroplot")
        })
        .join(CONFIG_FILENAME)
}

/// Loads the configuration file (if any) with `ASTROPLOT_*` environment
/// overrides on top. Nested keys use `__`, e.g. `ASTROPLOT_ZSCALE__CONTRAST`.
pub fn load_config_from(path: &Path) -> Result<PlotConfig> {
    let settings = config::Config::builder()
        .add_source(
            config::File::from(path)
                .format(config::FileFormat::Json)
                .required(false),
        )
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("Failed to load config from {:?}", path))?;
    settings
        .try_deserialize()
        .with_context(|| format!("Invalid plot configuration in {:?}", path))
}

pub fn load_config() -> PlotConfig {
    let path = config_path();
    match load_config_from(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            log::warn!("falling back to default plot config: {:#}", e);
            PlotConfig::default()
        }
    }
}

pub fn save_config_to(config: &PlotConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir: {:?}", parent))?;
    }
    let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write config to {:?}", path))?;
    Ok(())
}

pub fn save_config(config: &PlotConfig) -> Result<()> {
    save_config_to(config, &config_path())
}
