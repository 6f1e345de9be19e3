//! Configuration for page rendering.
//!
//! Settings come from an optional TOML file and are then overridden by CLI
//! flags or environment variables (see `main.rs`).
//!
//! ```toml
//! origin_prefix = "https://assets.example.com/oauth"
//! fetch_timeout = "10s"
//! # asset_dir = "/srv/oauth-assets"
//! # bundled_assets = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::assets::{BundledAssets, ConfiguredAssetSource, DirAssetSource, HttpAssetSource};
use crate::error::{PageError, PageResult};
use crate::page::PageComposer;

/// Default asset origin.
pub const DEFAULT_ORIGIN_PREFIX: &str = "http://localhost:8080";

/// Default timeout for HTTP fragment fetches.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Page rendering settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageConfig {
    /// Origin the three fragments are fetched from.
    pub origin_prefix: String,

    /// Read fragments from this directory instead of over HTTP.
    pub asset_dir: Option<PathBuf>,

    /// Use the fragments compiled into the binary.
    pub bundled_assets: bool,

    /// Timeout for HTTP fragment fetches, e.g. `"30s"`.
    #[serde(deserialize_with = "deserialize_duration")]
    pub fetch_timeout: Duration,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            origin_prefix: DEFAULT_ORIGIN_PREFIX.to_string(),
            asset_dir: None,
            bundled_assets: false,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl PageConfig {
    /// Loads settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Config`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> PageResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PageError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Loads settings from the default location if a file exists there.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Config`] if an existing file cannot be parsed.
    pub fn load_default() -> PageResult<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Default settings path, e.g. `~/.config/oauth-token-page/config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "oauth-token-page", "oauth-token-page")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Parses settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Config`] on syntax errors, unknown keys or
    /// invalid values.
    pub fn from_toml_str(content: &str) -> PageResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| PageError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the settings can be used.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Config`] for an empty origin (when fragments are
    /// fetched over HTTP) or a zero timeout.
    pub fn validate(&self) -> PageResult<()> {
        if self.uses_http() && self.origin_prefix.trim().is_empty() {
            return Err(PageError::config("origin_prefix must not be empty"));
        }
        if self.fetch_timeout.is_zero() {
            return Err(PageError::config("fetch_timeout must be greater than zero"));
        }
        Ok(())
    }

    /// Returns `true` if fragments are fetched over HTTP.
    #[must_use]
    pub fn uses_http(&self) -> bool {
        !self.bundled_assets && self.asset_dir.is_none()
    }

    /// Builds the asset source these settings select.
    ///
    /// Bundled fragments take precedence over a directory, which takes
    /// precedence over HTTP.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Config`] if the HTTP client cannot be built.
    pub fn asset_source(&self) -> PageResult<ConfiguredAssetSource> {
        if self.bundled_assets {
            return Ok(ConfiguredAssetSource::Bundled(BundledAssets));
        }
        if let Some(dir) = &self.asset_dir {
            return Ok(ConfiguredAssetSource::Dir(DirAssetSource::new(dir)));
        }
        HttpAssetSource::new(self.fetch_timeout)
            .map(ConfiguredAssetSource::Http)
            .map_err(|e| PageError::config(format!("{:#}", e)))
    }

    /// Builds a composer for these settings.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Config`] if the settings are invalid.
    pub fn composer(&self) -> PageResult<PageComposer<ConfiguredAssetSource>> {
        self.validate()?;
        Ok(PageComposer::new(self.asset_source()?, self.origin_prefix.as_str()))
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}
