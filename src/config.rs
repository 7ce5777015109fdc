use crate::analytics::overview::{DEFAULT_STRUGGLING, DEFAULT_TOP_PERFORMING, STRUGGLING_MIN_TESTED};
use crate::analytics::trend::TREND_WINDOW;
use crate::app_dirs::AppDirs;
use crate::error::Result;
use crate::migration::{EstimationMode, MigrationOptions, DEFAULT_RESPONSE_MS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsConfig {
    pub trend_window: usize,
    pub top_performing: usize,
    pub struggling: usize,
    pub struggling_min_tested: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            trend_window: TREND_WINDOW,
            top_performing: DEFAULT_TOP_PERFORMING,
            struggling: DEFAULT_STRUGGLING,
            struggling_min_tested: STRUGGLING_MIN_TESTED,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MigrationConfig {
    pub estimation: EstimationMode,
    pub default_response_ms: u64,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            estimation: EstimationMode::Deterministic,
            default_response_ms: DEFAULT_RESPONSE_MS,
        }
    }
}

impl From<&MigrationConfig> for MigrationOptions {
    fn from(cfg: &MigrationConfig) -> Self {
        Self {
            estimation: cfg.estimation,
            default_response_ms: cfg.default_response_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub analytics: AnalyticsConfig,
    pub migration: MigrationConfig,
    pub log_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            analytics: AnalyticsConfig::default(),
            migration: MigrationConfig::default(),
            log_level: "info".to_string(),
            store_path: None,
        }
    }
}

impl Config {
    /// Configured store location, or the platform default
    pub fn resolved_store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .or_else(AppDirs::store_path)
            .unwrap_or_else(|| PathBuf::from("lexilog.db"))
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("lexilog_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable config, using defaults");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}
