use std::path::Path;

use gdvm_platform::AppPaths;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sources::{DEFAULT_CATALOG_API_URL, DEFAULT_MIRROR_BASE_URL, DEFAULT_PRIMARY_BASE_URL};

const TOKEN_PREFIXES: [&str; 5] = ["ghp_", "gho_", "ghu_", "ghs_", "ghr_"];
const TOKEN_LENGTH: usize = 40;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed settings file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("github_token is not a valid GitHub token")]
    InvalidToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub github_token: Option<String>,

    #[serde(default = "default_catalog_api_url")]
    pub catalog_api_url: String,

    #[serde(default = "default_primary_base_url")]
    pub primary_base_url: String,

    #[serde(default = "default_mirror_base_url")]
    pub mirror_base_url: Option<String>,

    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_hours: u64,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,
}

fn default_catalog_api_url() -> String {
    DEFAULT_CATALOG_API_URL.to_string()
}

fn default_primary_base_url() -> String {
    DEFAULT_PRIMARY_BASE_URL.to_string()
}

#[allow(clippy::unnecessary_wraps)]
fn default_mirror_base_url() -> Option<String> {
    Some(DEFAULT_MIRROR_BASE_URL.to_string())
}

fn default_cache_ttl() -> u64 {
    24
}

fn default_http_timeout() -> u64 {
    10
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            github_token: None,
            catalog_api_url: default_catalog_api_url(),
            primary_base_url: default_primary_base_url(),
            mirror_base_url: default_mirror_base_url(),
            cache_ttl_hours: default_cache_ttl(),
            http_timeout_secs: default_http_timeout(),
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
        }
    }
}

/// Classic and fine-grained OAuth tokens: a known prefix, 40 characters,
/// `[A-Za-z0-9_]` only.
#[must_use]
pub fn is_valid_github_token(token: &str) -> bool {
    token.len() == TOKEN_LENGTH
        && TOKEN_PREFIXES.iter().any(|prefix| token.starts_with(prefix))
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

impl Settings {
    /// Load `<root>/settings.json`; a missing file yields defaults.
    ///
    /// # Errors
    /// Returns an error when the file is unreadable, malformed, or carries
    /// an invalid token.
    pub fn load(paths: &AppPaths) -> Result<Self, SettingsError> {
        Self::load_from_path(&paths.settings_file())
    }

    fn load_from_path(path: &Path) -> Result<Self, SettingsError> {
        let settings: Self = match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(error) => return Err(error.into()),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// # Errors
    /// Returns [`SettingsError::InvalidToken`] for a malformed token.
    pub fn validate(&self) -> Result<(), SettingsError> {
        match self.github_token.as_deref() {
            Some(token) if !is_valid_github_token(token) => Err(SettingsError::InvalidToken),
            _ => Ok(()),
        }
    }

    /// # Errors
    /// Returns an error when the root cannot be created or the file cannot
    /// be written.
    pub fn save(&self, paths: &AppPaths) -> Result<(), SettingsError> {
        self.validate()?;
        paths.ensure_dirs()?;

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.settings_file(), content)?;
        Ok(())
    }

    #[must_use]
    pub fn cache_ttl(&self) -> chrono::Duration {
        i64::try_from(self.cache_ttl_hours)
            .ok()
            .and_then(chrono::Duration::try_hours)
            .unwrap_or(chrono::Duration::MAX)
    }
}
