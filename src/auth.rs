/// API token resolution.
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{anyhow, Result};

use crate::config::{ApiKind, Config};

/// Resolves tokens from the environment first, then from the config file.
///
/// Tokens read from the config file trigger a plain-text warning once per API kind
/// for the lifetime of the resolver.
#[derive(Debug)]
pub struct TokenResolver {
    env_tokens: HashMap<ApiKind, String>,
    config_tokens: HashMap<ApiKind, String>,
    warned: Mutex<HashSet<ApiKind>>,
}

impl TokenResolver {
    pub fn from_env(config: &Config) -> Self {
        Self::new(config, |key| std::env::var(key).ok())
    }

    pub fn new<F>(config: &Config, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut env_tokens = HashMap::new();
        let mut config_tokens = HashMap::new();

        for kind in [ApiKind::Client, ApiKind::Admin] {
            if let Some(token) = lookup(kind.token_env()).filter(|t| !t.trim().is_empty()) {
                env_tokens.insert(kind, token.trim().to_string());
            }
            if let Some(token) = config.token_for(kind) {
                config_tokens.insert(kind, token.trim().to_string());
            }
        }

        Self {
            env_tokens,
            config_tokens,
            warned: Mutex::new(HashSet::new()),
        }
    }

    pub fn token(&self, kind: ApiKind) -> Result<String> {
        if let Some(token) = self.env_tokens.get(&kind) {
            return Ok(token.clone());
        }

        if let Some(token) = self.config_tokens.get(&kind) {
            self.warn_plaintext(kind);
            return Ok(token.clone());
        }

        Err(anyhow!(
            "No {} API token configured. Set {} or {}.token in the config file",
            kind,
            kind.token_env(),
            kind
        ))
    }

    /// Returns true the first time it is called for `kind`.
    fn warn_plaintext(&self, kind: ApiKind) -> bool {
        let first = match self.warned.lock() {
            Ok(mut warned) => warned.insert(kind),
            Err(poisoned) => poisoned.into_inner().insert(kind),
        };

        if first {
            log::warn!(
                "{} token read from the config file in plain text; consider exporting {} instead",
                kind,
                kind.token_env()
            );
        }
        first
    }
}
