//! Configuration file parser for ~/.config/geojson-feed/config.toml.
//!
//! The config file is optional: a missing or blank file yields
//! `Config::default()`. Unknown top-level keys are skipped with a single
//! warning listing them. Command line flags override file values.
use crate::client::{Coordinates, FetchOptions};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

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

    #[error("Invalid feed URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GeoJSON feed to poll.
    pub url: Option<String>,

    /// Home latitude in degrees.
    pub latitude: Option<f64>,

    /// Home longitude in degrees.
    pub longitude: Option<f64>,

    /// Only keep features within this many kilometres of home.
    pub filter_radius_km: Option<f64>,

    /// Seconds between polls.
    pub poll_interval_seconds: u64,

    /// Per-request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Retries for rate limited or failing servers.
    pub max_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: None,
            latitude: None,
            longitude: None,
            filter_radius_km: None,
            poll_interval_seconds: 300,
            request_timeout_seconds: 10,
            max_retries: 3,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 7] = [
        "url",
        "latitude",
        "longitude",
        "filter_radius_km",
        "poll_interval_seconds",
        "request_timeout_seconds",
        "max_retries",
    ];

    /// Load configuration from a TOML file.
    ///
    /// A missing or blank file yields the defaults. Unknown keys are logged
    /// and otherwise ignored.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let Some(content) = Self::read_bounded(path)? else {
            tracing::debug!(path = %path.display(), "No config file found, using defaults");
            return Ok(Self::default());
        };
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        let table: toml::Table = content.parse()?;
        let unknown: Vec<&str> = table
            .keys()
            .map(String::as_str)
            .filter(|key| !Self::KNOWN_KEYS.contains(key))
            .collect();
        if !unknown.is_empty() {
            tracing::warn!(keys = ?unknown, "Ignoring unknown config keys");
        }

        let config: Config = toml::Value::Table(table).try_into()?;
        tracing::info!(path = %path.display(), url = ?config.url, "Loaded configuration");
        Ok(config)
    }

    /// Reads the whole file unless it exceeds [`Self::MAX_FILE_SIZE`].
    /// `Ok(None)` when the file does not exist.
    fn read_bounded(path: &Path) -> Result<Option<String>, ConfigError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let size = file.metadata()?.len();
        if size > Self::MAX_FILE_SIZE {
            return Err(ConfigError::TooLarge(format!(
                "{} is {size} bytes (max {} bytes)",
                path.display(),
                Self::MAX_FILE_SIZE
            )));
        }

        let mut content = String::with_capacity(size as usize);
        file.take(Self::MAX_FILE_SIZE).read_to_string(&mut content)?;
        Ok(Some(content))
    }

    /// Validated feed URL. Only http and https are accepted.
    pub fn feed_url(&self) -> Result<Url, ConfigError> {
        let raw = self
            .url
            .as_deref()
            .ok_or_else(|| ConfigError::Invalid("feed url is not set".to_string()))?;
        let url = Url::parse(raw)?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::Invalid(format!(
                "unsupported scheme {scheme} (only http/https allowed)"
            ))),
        }
    }

    /// Validated home coordinates.
    pub fn home_coordinates(&self) -> Result<Coordinates, ConfigError> {
        let (Some(latitude), Some(longitude)) = (self.latitude, self.longitude) else {
            return Err(ConfigError::Invalid(
                "latitude and longitude must both be set".to_string(),
            ));
        };
        let coordinates = Coordinates::new(latitude, longitude);
        if !coordinates.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "home coordinates {coordinates} out of range"
            )));
        }
        Ok(coordinates)
    }

    /// Validated filter radius; must be positive when set.
    pub fn filter_radius(&self) -> Result<Option<f64>, ConfigError> {
        match self.filter_radius_km {
            Some(radius) if !(radius.is_finite() && radius > 0.0) => Err(ConfigError::Invalid(
                format!("filter radius must be positive, got {radius}"),
            )),
            radius => Ok(radius),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds.max(1))
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: Duration::from_secs(self.request_timeout_seconds.max(1)),
            max_retries: self.max_retries,
            ..FetchOptions::default()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
