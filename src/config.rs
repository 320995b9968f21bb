/// Configuration serialization and deserialization.
use std::{
    fs::{self},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

pub const BASE_URL_ENV: &str = "PELICANCTL_API_BASE_URL";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

// config like:
// api:
//   base_url: https://panel.example.com
//   timeout_secs: 30
// client:
//   token: ptlc_...
// admin:
//   token: ptla_...
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub client: TokenConfig,
    pub admin: TokenConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct TokenConfig {
    pub token: Option<String>,
}

/// Which panel API a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiKind {
    Client,
    Admin,
}

impl ApiKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiKind::Client => "client",
            ApiKind::Admin => "admin",
        }
    }

    pub fn token_env(&self) -> &'static str {
        match self {
            ApiKind::Client => "PELICANCTL_CLIENT_TOKEN",
            ApiKind::Admin => "PELICANCTL_ADMIN_TOKEN",
        }
    }
}

impl std::fmt::Display for ApiKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Config {
    /// Load a config file, picking the format from its extension.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        if let Some(ext) = path.extension() {
            if ext == "toml" {
                let config = toml::from_str(&contents)
                    .with_context(|| format!("Invalid TOML in {}", path.display()))?;
                return Ok(config);
            } else if ext == "yaml" || ext == "yml" {
                let config = serde_yaml::from_str(&contents)
                    .with_context(|| format!("Invalid YAML in {}", path.display()))?;
                return Ok(config);
            }
        }

        let config = if let Ok(config) = toml::from_str(&contents) {
            config
        } else {
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Unrecognized config format in {}", path.display()))?
        };

        Ok(config)
    }

    /// Load an explicit config file, or the default one if it exists.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load(path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pelicanctl").join("config.yaml"))
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a variable lookup; empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.api.base_url = Some(base_url);
        }
    }

    pub fn base_url(&self) -> Result<&str> {
        self.api
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "API base URL not configured. Set {} or api.base_url in the config file",
                    BASE_URL_ENV
                )
            })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn token_for(&self, kind: ApiKind) -> Option<&str> {
        let token = match kind {
            ApiKind::Client => self.client.token.as_deref(),
            ApiKind::Admin => self.admin.token.as_deref(),
        };
        token.filter(|t| !t.trim().is_empty())
    }
}
