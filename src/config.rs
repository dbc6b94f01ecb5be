use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::fs;
use std::time::Duration;
use anyhow::{Context, Result, bail};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub table: TableConfig,
    #[serde(default)]
    pub icons: IconConfig,
    #[serde(default)]
    pub colors: ColorConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub data_csv: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_delimiter() -> char {
    ';'
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub center: [f64; 2],
    pub zoom: u8,
    pub mobile_zoom: u8,
    pub max_cluster_radius: u32,
    /// Degrees within which a click resolves to the nearest location group.
    pub click_tolerance: f64,
    pub resize_debounce_ms: u64,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            center: [51.1657, 10.4515],
            zoom: 6,
            mobile_zoom: 5,
            max_cluster_radius: 50,
            click_tolerance: 0.01,
            resize_debounce_ms: 250,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FilterConfig {
    pub debounce_ms: u64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig { debounce_ms: 300 }
    }
}

impl FilterConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct TableConfig {
    /// Above this many rows the table switches to the truncated view.
    pub row_limit: usize,
    pub truncated_rows: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig { row_limit: 1000, truncated_rows: 500 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct IconPreset {
    pub min_size: f64,
    pub max_size: f64,
    pub scale: f64,
}

impl IconPreset {
    pub const COMPACT: IconPreset = IconPreset { min_size: 28.0, max_size: 65.0, scale: 5.0 };
    pub const STANDARD: IconPreset = IconPreset { min_size: 32.0, max_size: 75.0, scale: 6.0 };
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct IconConfig {
    pub compact: IconPreset,
    pub standard: IconPreset,
}

impl Default for IconConfig {
    fn default() -> Self {
        IconConfig { compact: IconPreset::COMPACT, standard: IconPreset::STANDARD }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ColorConfig {
    pub types: HashMap<String, String>, // type name -> hex code
    pub fallback: String,
}

impl Default for ColorConfig {
    fn default() -> Self {
        let types = [
            ("Startup", "#2563eb"),
            ("Accelerator", "#16a34a"),
            ("Incubator", "#f59e0b"),
            ("Investor", "#9333ea"),
            ("Research", "#dc2626"),
            ("Corporate", "#0891b2"),
        ]
        .into_iter()
        .map(|(name, color)| (name.to_string(), color.to_string()))
        .collect();
        ColorConfig { types, fallback: "#6b7280".to_string() }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig { dir: PathBuf::from("dist") }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig { port: 8080 }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.input.delimiter.is_ascii() {
            bail!("Delimiter must be a single ASCII character, got {:?}", self.input.delimiter);
        }
        if self.table.truncated_rows > self.table.row_limit {
            bail!(
                "table.truncated_rows ({}) must not exceed table.row_limit ({})",
                self.table.truncated_rows,
                self.table.row_limit
            );
        }
        for (name, preset) in [("compact", &self.icons.compact), ("standard", &self.icons.standard)] {
            if preset.min_size <= 0.0 || preset.min_size > preset.max_size {
                bail!("icons.{}: min_size must be positive and not exceed max_size", name);
            }
        }
        Ok(())
    }

    pub fn delimiter_byte(&self) -> u8 {
        self.input.delimiter as u8
    }
}
