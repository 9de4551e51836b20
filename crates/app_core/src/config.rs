//! Application configuration

use crate::triage::SortMode;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Smallest and largest grid column counts
pub const MIN_COLUMNS: usize = 4;
pub const MAX_COLUMNS: usize = 12;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub preview: PreviewConfig,
    pub grid: GridConfig,
    pub trash: TrashConfig,
    pub keybindings: HashMap<String, Vec<String>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            preview: PreviewConfig::default(),
            grid: GridConfig::default(),
            trash: TrashConfig::default(),
            keybindings: default_keybindings(),
        }
    }
}

/// Preview resolution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Bytes read from the head of a RAW file for the embedded JPEG scan
    pub scan_limit_bytes: usize,
    /// Give up looking for an end marker this far past a start marker
    pub max_segment_distance: usize,
    /// Embedded JPEGs smaller than this are treated as thumbnails and skipped
    pub min_segment_bytes: usize,
    /// JPEG quality for HEIC transcodes, 0.0 - 1.0
    pub heic_quality: f32,
    /// Remember "no preview available" until invalidated instead of retrying
    pub cache_unavailable: bool,
    /// Resolutions a prefetch keeps running at once
    pub prefetch_concurrency: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            scan_limit_bytes: 6 * 1024 * 1024,
            max_segment_distance: 5_000_000,
            min_segment_bytes: 50_000,
            heic_quality: 0.5,
            cache_unavailable: true,
            prefetch_concurrency: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub columns: usize,
    pub sort_mode: SortMode,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: 6,
            sort_mode: SortMode::NameAsc,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrashConfig {
    /// Holding folder created under the opened folder
    pub folder_name: String,
    /// Ask before moving rejects
    pub confirm: bool,
}

impl Default for TrashConfig {
    fn default() -> Self {
        Self {
            folder_name: "_Trash".to_string(),
            confirm: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config = Self::from_toml(&content)?;
            tracing::info!("Configuration loaded from {:?}", config_path);
            Ok(config)
        } else {
            tracing::info!("Using default configuration");
            Ok(Self::default())
        }
    }

    /// Parse configuration text
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let mut config: Self = toml::from_str(content)?;
        config.grid.columns = config.grid.columns.clamp(MIN_COLUMNS, MAX_COLUMNS);
        config.preview.heic_quality = config.preview.heic_quality.clamp(0.0, 1.0);
        config.preview.prefetch_concurrency = config.preview.prefetch_concurrency.max(1);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        tracing::info!("Configuration saved to {:?}", config_path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("com", "FlashCull", "FlashCull")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("./config.toml"))
    }
}

fn default_keybindings() -> HashMap<String, Vec<String>> {
    let mut kb = HashMap::new();

    // Viewer navigation
    kb.insert("nav.next_item".into(), vec!["Right".into()]);
    kb.insert("nav.prev_item".into(), vec!["Left".into()]);

    // Triage
    kb.insert("triage.keep".into(), vec!["Up".into()]);
    kb.insert("triage.reject".into(), vec!["Down".into()]);
    kb.insert("triage.reset".into(), vec!["Backspace".into(), "0".into()]);

    kb.insert("viewer.close".into(), vec!["Escape".into()]);

    kb
}
