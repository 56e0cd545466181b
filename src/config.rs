// Service configuration - defaults, optional JSON file, then CLI/env overrides
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "skilllens";
const MIB: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub bind: String,
    /// Holds `skill_rules.json` and `resources.json`
    pub data_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub cache_ttl_secs: u64,
    pub max_upload_bytes: usize,
    /// Archive members above this size are skipped during extraction
    pub max_archive_file_bytes: u64,
    pub cors_origins: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_webhook: Option<String>,
    pub github_archive_base: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR),
            cache_dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
                .join("cache"),
            cache_ttl_secs: 3600,
            max_upload_bytes: 5 * MIB,
            max_archive_file_bytes: MIB as u64,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ],
            feedback_webhook: None,
            github_archive_base: "https://github.com".to_string(),
        }
    }
}

/// Values supplied on the command line or through `SKILLLENS_*` variables.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub cache_ttl_secs: Option<u64>,
    pub feedback_webhook: Option<String>,
}

impl ServiceConfig {
    /// Default config file location
    pub fn config_file_path() -> PathBuf {
        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.json")
    }

    /// Load from `path`, or from the default location when `path` is None.
    /// A missing default file yields the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (config_path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::config_file_path(), false),
        };

        if !config_path.exists() {
            if explicit {
                anyhow::bail!("Config file not found: {}", config_path.display());
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let config: ServiceConfig = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", config_path.display()))?;
        tracing::debug!("Loaded config from {}", config_path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(bind) = overrides.bind {
            self.bind = bind;
        }
        if let Some(dir) = overrides.data_dir {
            self.data_dir = dir;
        }
        if let Some(dir) = overrides.cache_dir {
            self.cache_dir = dir;
        }
        if let Some(ttl) = overrides.cache_ttl_secs {
            self.cache_ttl_secs = ttl;
        }
        if overrides.feedback_webhook.is_some() {
            self.feedback_webhook = overrides.feedback_webhook;
        }
        self
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn too_large_message(&self) -> String {
        format!(
            "Request too large. Maximum size is {}MB.",
            self.max_upload_bytes / MIB
        )
    }
}
