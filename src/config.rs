//! Runtime configuration.
//!
//! Loaded from `~/.devbot/config.json`; every field is optional and falls
//! back to its default. `DEVBOT_TELEGRAM_TOKEN` (read from the process
//! environment, with `.env` support via dotenvy in the binary) overrides
//! the token from the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BotError, Result};

/// Environment variable overriding `telegram.token`.
pub const TOKEN_ENV_VAR: &str = "DEVBOT_TELEGRAM_TOKEN";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub lookup: LookupConfig,
    pub cache: CacheConfig,
    pub eval: EvalConfig,
}

/// Telegram transport settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot API token. Empty means unconfigured.
    pub token: String,
}

/// Article lookup service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Base URL of the article search endpoint. Empty means unconfigured.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: 10,
        }
    }
}

/// Article cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long a cached lookup stays fresh, in seconds.
    pub ttl_secs: u64,
    /// Maximum number of cached lookups.
    pub max_entries: usize,
    /// Override for the cache file location (mainly for tests).
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            // Six hours, matching how often the article feed meaningfully changes.
            ttl_secs: 6 * 60 * 60,
            max_entries: 500,
            path: None,
        }
    }
}

/// Sandboxed evaluator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Wall-clock budget per evaluation, in milliseconds.
    pub budget_ms: u64,
    /// Maximum rendered output length, in characters.
    pub max_render_len: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            budget_ms: 200,
            max_render_len: 3072,
        }
    }
}

impl Config {
    /// Load configuration from the default location, applying environment
    /// overrides. A missing file yields defaults; a malformed file is an
    /// error.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_token_override(std::env::var(TOKEN_ENV_VAR).ok());
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data).map_err(|e| {
                BotError::Config(format!("cannot parse {}: {e}", path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(BotError::Config(format!(
                "cannot read {}: {e}",
                path.display()
            ))),
        }
    }

    fn apply_token_override(&mut self, token: Option<String>) {
        if let Some(token) = token {
            if !token.is_empty() {
                self.telegram.token = token;
            }
        }
    }

    /// Default config file location: `~/.devbot/config.json`.
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".devbot")
            .join("config.json")
    }

    /// Cache file location: the configured override, or
    /// `~/.devbot/cache/articles.json`.
    pub fn cache_path(&self) -> PathBuf {
        self.cache.path.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".devbot")
                .join("cache")
                .join("articles.json")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.telegram.token.is_empty());
        assert!(config.lookup.base_url.is_empty());
        assert_eq!(config.lookup.timeout_secs, 10);
        assert_eq!(config.cache.ttl_secs, 21_600);
        assert_eq!(config.cache.max_entries, 500);
        assert_eq!(config.eval.budget_ms, 200);
        assert_eq!(config.eval.max_render_len, 3072);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"eval": {"budget_ms": 50}}"#).unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.eval.budget_ms, 50);
        // Unspecified fields keep their defaults.
        assert_eq!(config.eval.max_render_len, 3072);
        assert_eq!(config.cache.ttl_secs, 21_600);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert!(config.telegram.token.is_empty());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(BotError::Config(_))
        ));
    }

    #[test]
    fn test_token_override() {
        let mut config = Config::default();
        config.telegram.token = "from-file".into();
        config.apply_token_override(Some("from-env".into()));
        assert_eq!(config.telegram.token, "from-env");
        // An empty override does not clobber the file value.
        config.apply_token_override(Some(String::new()));
        assert_eq!(config.telegram.token, "from-env");
        config.apply_token_override(None);
        assert_eq!(config.telegram.token, "from-env");
    }
}
