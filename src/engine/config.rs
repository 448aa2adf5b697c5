// Gyan Engine — Configuration
//
// Resolution order (later layers win):
//   1. built-in defaults
//   2. TOML file: explicit path, else <config_dir>/gyan/config.toml if present
//   3. environment variables (GYAN_*)
//   4. command-line overrides, applied by the binary
//
// Secrets are never logged; `redacted()` gives a printable copy.

use crate::atoms::constants::*;
use crate::atoms::error::{EngineError, EngineResult};
use crate::engine::dispatcher::RetryPolicy;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: String::new(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IdentityConfig {
    /// Web API key of the identity project. Sign-in is skipped without it.
    pub api_key: Option<String>,
    pub endpoint: String,
    pub enabled: bool,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        IdentityConfig {
            api_key: None,
            endpoint: DEFAULT_IDENTITY_ENDPOINT.to_string(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT.as_secs(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub identity: IdentityConfig,
    pub retry: RetryConfig,
    pub http: HttpConfig,
}

impl AppConfig {
    /// Defaults → file → process environment.
    pub fn load(explicit_path: Option<&Path>) -> EngineResult<Self> {
        let mut config = match explicit_path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::config(format!("cannot read {}: {}", path.display(), e)))?;
        let config = Self::from_toml(&text)?;
        info!("[config] loaded {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> EngineResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Overlay environment variables read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> EngineResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(key) = get(ENV_GEMINI_API_KEY).or_else(|| get(ENV_GEMINI_API_KEY_FALLBACK)) {
            self.gemini.api_key = key;
        }
        if let Some(model) = get(ENV_MODEL) {
            self.gemini.model = model;
        }
        if let Some(url) = get(ENV_BASE_URL) {
            self.gemini.base_url = url;
        }
        if let Some(raw) = get(ENV_MAX_RETRIES) {
            self.retry.max_retries = parse_env(ENV_MAX_RETRIES, &raw)?;
        }
        if let Some(raw) = get(ENV_BASE_DELAY_MS) {
            self.retry.base_delay_ms = parse_env(ENV_BASE_DELAY_MS, &raw)?;
        }
        if let Some(key) = get(ENV_FIREBASE_API_KEY) {
            self.identity.api_key = Some(key);
        }
        if let Some(endpoint) = get(ENV_IDENTITY_ENDPOINT) {
            self.identity.endpoint = endpoint;
        }
        Ok(())
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.gemini.api_key.trim().is_empty() {
            return Err(EngineError::config(format!(
                "no Gemini API key: set {} (or {}) or [gemini].api_key in the config file",
                ENV_GEMINI_API_KEY, ENV_GEMINI_API_KEY_FALLBACK
            )));
        }
        if self.gemini.model.trim().is_empty() {
            return Err(EngineError::config("model name is empty"));
        }
        if !self.gemini.base_url.starts_with("http://") && !self.gemini.base_url.starts_with("https://") {
            return Err(EngineError::config(format!("base URL is not http(s): {}", self.gemini.base_url)));
        }
        if self.retry.max_retries == 0 {
            return Err(EngineError::config("max_retries must be at least 1"));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry.max_retries, Duration::from_millis(self.retry.base_delay_ms))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.http.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }

    /// Identity sign-in is attempted only when enabled and a key is present.
    pub fn identity_api_key(&self) -> Option<&str> {
        if !self.identity.enabled {
            return None;
        }
        self.identity.api_key.as_deref().filter(|k| !k.is_empty())
    }

    /// Copy with every secret replaced, safe to print.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.gemini.api_key.is_empty() {
            copy.gemini.api_key = "***".into();
        }
        if copy.identity.api_key.is_some() {
            copy.identity.api_key = Some("***".into());
        }
        copy
    }

    pub fn to_toml(&self) -> EngineResult<String> {
        toml::to_string_pretty(self).map_err(|e| EngineError::config(format!("cannot render config: {}", e)))
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

fn parse_env<N: std::str::FromStr>(key: &str, raw: &str) -> EngineResult<N> {
    raw.parse()
        .map_err(|_| EngineError::config(format!("{} is not a valid number: {:?}", key, raw)))
}
