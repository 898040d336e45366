// Configuration module: loads the assigner settings from a `config.json`
// file. Every section is optional; a missing file means built-in defaults.
// The loaded value is immutable and handed to the client and session by the
// binary, there is no global config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Env var holding an explicit config file path.
pub const CONFIG_PATH_ENV: &str = "COUPON_ASSIGNER_CONFIG";
/// Env var overriding `api.base_url`.
pub const BASE_URL_ENV: &str = "REDCAT_API_URL";

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_DIR_NAME: &str = "coupon-assigner";

/// Login flavour sent as `auth_type` in the login body.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum AuthType {
    /// Regular API user.
    U,
    /// Any other flavour the backend understands, passed through verbatim.
    #[serde(untagged)]
    Other(String),
}

impl AuthType {
    pub fn as_str(&self) -> &str {
        match self {
            AuthType::U => "U",
            AuthType::Other(s) => s,
        }
    }
}

impl Default for AuthType {
    fn default() -> Self {
        AuthType::U
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub auth_type: AuthType,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: "https://your-api-url.com/api/v1".into(),
            auth_type: AuthType::U,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct UiConfig {
    pub window_title: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            window_title: "RedCat Coupon Assigner".into(),
        }
    }
}

/// Feature flags. `max_batch_size` is advisory only.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct FeatureFlags {
    pub allow_duplicate_coupons: bool,
    pub enable_batch_processing: bool,
    pub max_batch_size: usize,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        FeatureFlags {
            allow_duplicate_coupons: true,
            enable_batch_processing: true,
            max_batch_size: 1000,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub ui: UiConfig,
    pub features: FeatureFlags,
}

impl AppConfig {
    /// Load from the first config file found (see `candidate_paths`), falling
    /// back to defaults when none exists, then apply the `REDCAT_API_URL`
    /// override.
    pub fn load() -> Result<Self, ConfigError> {
        let found = candidate_paths().into_iter().find(|p| p.is_file());
        let mut config = match found {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading config file");
                Self::from_file(&path)?
            }
            None => {
                tracing::info!("No config file found, using built-in defaults");
                AppConfig::default()
            }
        };
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                config.api.base_url = url.trim().to_string();
            }
        }
        Ok(config)
    }

    /// Parse a specific config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }
}

/// Lookup order: explicit env path, working directory, user config dir.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(p) = std::env::var(CONFIG_PATH_ENV) {
        if !p.trim().is_empty() {
            paths.push(PathBuf::from(p));
        }
    }
    paths.push(PathBuf::from(CONFIG_FILE_NAME));
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
    }
    paths
}
