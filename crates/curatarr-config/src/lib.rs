// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.80;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_max_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://curatarr.db".to_string(),
            pool_max_size: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5160,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Where the music library lives and how folders are matched against the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Absolute path of the library root. Reconciliation refuses to run without it.
    pub root_path: Option<PathBuf>,
    /// Minimum title similarity for an album folder to count as owned.
    pub similarity_threshold: f64,
    /// How many directory levels below the root a scan descends
    /// (bucket / artist / album needs three).
    pub max_scan_depth: usize,
    pub follow_symlinks: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root_path: None,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_scan_depth: 3,
            follow_symlinks: false,
        }
    }
}

impl LibraryConfig {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root_path: Some(root.into()),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        let threshold = self.similarity_threshold;
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            bail!("library.similarity_threshold must be within [0.0, 1.0], got {threshold}");
        }
        if self.max_scan_depth == 0 {
            bail!("library.max_scan_depth must be at least 1");
        }
        if let Some(root) = &self.root_path {
            if !root.is_absolute() {
                bail!("library.root_path must be absolute, got {}", root.display());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    pub telemetry: TelemetryConfig,
    pub library: LibraryConfig,
}

/// Load configuration from defaults, optional TOML file, and environment overrides (prefix: CURATARR_).
pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("CURATARR_").split("__"));

    let config: AppConfig = figment.extract()?;
    config.library.validate()?;
    info!(
        target: "config",
        library_root = ?config.library.root_path,
        similarity_threshold = config.library.similarity_threshold,
        "configuration loaded"
    );
    Ok(config)
}
