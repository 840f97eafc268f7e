//! Configuration management for the image chat client and gateway
//!
//! Sources, highest priority first: process environment (optionally seeded
//! from a `.env` file), the TOML config file, built-in defaults.

pub mod env_file;
pub mod file;

use std::fmt;
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};

use crate::{Error, Result};

/// Default `generateContent` endpoint
pub const DEFAULT_API_URL: &str =
    "https://www.packyapi.com/v1beta/models/gemini-3-pro-image-preview:generateContent";

/// Default gateway port
pub const DEFAULT_PORT: u16 = 10006;

/// Environment variables holding the API key, in lookup order
const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "LOCAL_GEMINI_API_KEY"];

/// Image chat configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the upstream endpoint
    pub api_key: Option<SecretString>,

    /// Full `generateContent` endpoint URL
    pub api_url: String,

    /// HTTP gateway configuration
    pub server: ServerConfig,
}

/// HTTP gateway configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Path to static files directory (web UI)
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            static_dir: None,
        }
    }
}

/// Connection settings handed to a conversation session
#[derive(Clone)]
pub struct GeminiConfig {
    /// Full `generateContent` endpoint URL
    pub api_url: String,

    /// Value sent in the `x-goog-api-key` header
    pub api_key: SecretString,
}

impl GeminiConfig {
    #[must_use]
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: SecretString::from(api_key.into()),
        }
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl Config {
    /// Load configuration from the env file, environment and TOML file
    #[must_use]
    pub fn load() -> Self {
        if let Some(path) = env_file::load_env_file() {
            tracing::info!(path = %path.display(), "loaded env file");
        }

        let fc = file::load_config_file();
        Self::from_sources(|key| std::env::var(key).ok(), fc)
    }

    /// Resolve configuration from a variable lookup and a config file
    ///
    /// Environment values take precedence over file values, which take
    /// precedence over defaults. Empty variables count as unset.
    #[must_use]
    pub fn from_sources<F>(lookup: F, fc: file::ConfigFile) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = API_KEY_VARS
            .into_iter()
            .find_map(&var)
            .or(fc.gemini.api_key)
            .map(SecretString::from);

        let api_url = var("API_URL")
            .or(fc.gemini.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let port = match var("PORT").map(|p| p.parse::<u16>()) {
            Some(Ok(port)) => Some(port),
            Some(Err(e)) => {
                tracing::warn!(error = %e, "invalid PORT, ignoring");
                None
            }
            None => None,
        }
        .or(fc.server.port)
        .unwrap_or(DEFAULT_PORT);

        let static_dir = var("STATIC_DIR")
            .or(fc.server.static_dir)
            .map(PathBuf::from);

        Self {
            api_key,
            api_url,
            server: ServerConfig { port, static_dir },
        }
    }

    /// Session connection settings
    ///
    /// # Errors
    ///
    /// Returns error if no API key is configured
    pub fn gemini(&self) -> Result<GeminiConfig> {
        let api_key = self.api_key.clone().ok_or_else(|| {
            Error::Config(format!(
                "no API key configured (set {} or {})",
                API_KEY_VARS[0], API_KEY_VARS[1]
            ))
        })?;

        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("API key is empty".to_string()));
        }

        Ok(GeminiConfig {
            api_url: self.api_url.clone(),
            api_key,
        })
    }
}
