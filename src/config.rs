//! Configuration file parser for ~/.config/cinefeed/config.toml.
//!
//! The config file is optional. A missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde (with `deny_unknown_fields` off),
//! though we log a warning when the file contains potential typos.
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that overrides `tmdb.api_key`.
pub const API_KEY_ENV: &str = "TMDB_API_KEY";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("HOME environment variable not set")]
    NoHome,
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How many items from the end of a row trigger loading the next page.
    pub prefetch_threshold: usize,

    /// TMDB connection settings.
    pub tmdb: TmdbConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefetch_threshold: 4,
            tmdb: TmdbConfig::default(),
        }
    }
}

/// `[tmdb]` table.
///
/// Custom Debug impl masks `api_key` to prevent secret leakage in logs,
/// error messages, and debug output.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TmdbConfig {
    /// API key (alternative to the TMDB_API_KEY env var).
    /// Env var takes precedence over config file.
    pub api_key: Option<String>,
    pub base_url: String,
    /// Prefix for poster/backdrop URLs; the size segment is appended to it.
    pub image_base_url: String,
    pub language: String,
    pub poster_size: String,
    pub backdrop_size: String,
    pub timeout_secs: u64,
    /// Retries on HTTP 429 and 5xx before giving up.
    pub max_retries: u32,
    /// First backoff delay; doubles on each retry.
    pub retry_backoff_ms: u64,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.themoviedb.org/3".to_string(),
            image_base_url: "https://image.tmdb.org/t/p/".to_string(),
            language: "en-US".to_string(),
            poster_size: "w500".to_string(),
            backdrop_size: "w780".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            retry_backoff_ms: 1000,
        }
    }
}

impl std::fmt::Debug for TmdbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TmdbConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("image_base_url", &self.image_base_url)
            .field("language", &self.language)
            .field("poster_size", &self.poster_size)
            .field("backdrop_size", &self.backdrop_size)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .finish()
    }
}

impl TmdbConfig {
    /// Resolves the API key, preferring `env_value` (the TMDB_API_KEY
    /// variable) over the file. Blank values count as unset.
    pub fn resolve_api_key(&self, env_value: Option<String>) -> Option<SecretString> {
        env_value
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.trim().is_empty()))
            .map(SecretString::from)
    }

    /// [`resolve_api_key`](Self::resolve_api_key) against the process environment.
    pub fn api_key_from_env(&self) -> Option<SecretString> {
        self.resolve_api_key(std::env::var(API_KEY_ENV).ok())
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Default location: `~/.config/cinefeed/config.toml`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = std::env::var("HOME").map_err(|_| ConfigError::NoHome)?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("cinefeed")
            .join("config.toml"))
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior), logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading to prevent memory exhaustion
        // from a maliciously large or corrupted config file.
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {} // Size is within limits, proceed
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse the TOML content first as a raw table to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            warn_unknown_keys(&raw, &["prefetch_threshold", "tmdb"], None);
            if let Some(toml::Value::Table(tmdb)) = raw.get("tmdb") {
                warn_unknown_keys(
                    tmdb,
                    &[
                        "api_key",
                        "base_url",
                        "image_base_url",
                        "language",
                        "poster_size",
                        "backdrop_size",
                        "timeout_secs",
                        "max_retries",
                        "retry_backoff_ms",
                    ],
                    Some("tmdb"),
                );
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), base_url = %config.tmdb.base_url, "Loaded configuration");
        Ok(config)
    }
}

fn warn_unknown_keys(table: &toml::Table, known_keys: &[&str], section: Option<&str>) {
    for key in table.keys() {
        if !known_keys.contains(&key.as_str()) {
            tracing::warn!(key = %key, section = section.unwrap_or("(root)"), "Unknown key in config file, ignoring");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
