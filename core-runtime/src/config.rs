//! # Run Configuration Module
//!
//! Provides configuration management for an enrichment run.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `RunConfig`
//! that holds everything a batch needs before it starts: the library root, the
//! worker count and the credentials for the remote metadata services. The
//! builder fails fast when the root directory cannot be used, so a bad
//! invocation never reaches the network.
//!
//! ## Credentials File
//!
//! Credentials are read from a JSON document with optional string fields:
//!
//! ```json
//! {
//!     "lastfm_api_key": "...",
//!     "discogs_token": "..."
//! }
//! ```
//!
//! Blank values and the template placeholders (`YOUR_LASTFM_API_KEY_HERE`,
//! `YOUR_DISCOGS_TOKEN_HERE`) count as absent. Unknown keys are ignored.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{MetadataApiConfig, RunConfig};
//!
//! let api = MetadataApiConfig::from_credentials_file(None);
//! let config = RunConfig::builder()
//!     .root("/music/crates")
//!     .workers(4)
//!     .metadata_api_config(api)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::logging::redact_if_sensitive;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// Credentials file looked up in the working directory when none is given
pub const DEFAULT_CREDENTIALS_FILE: &str = "api_keys.json";

/// Default number of concurrent file workers
pub const DEFAULT_WORKERS: usize = 4;

/// Default minimum delay between two requests to the same provider
pub const DEFAULT_RATE_LIMIT_DELAY_MS: u64 = 1000;

/// Default User-Agent sent to every provider
pub const DEFAULT_USER_AGENT: &str = concat!(
    "TrackMetadataEnricher/",
    env!("CARGO_PKG_VERSION"),
    " (DJ Playlist Tool)"
);

const PLACEHOLDER_VALUES: &[&str] = &["YOUR_LASTFM_API_KEY_HERE", "YOUR_DISCOGS_TOKEN_HERE"];

/// Raw shape of the credentials file.
#[derive(Debug, Default, Deserialize)]
struct CredentialsFile {
    #[serde(default)]
    lastfm_api_key: Option<String>,
    #[serde(default)]
    discogs_token: Option<String>,
}

/// Configuration for external metadata API services.
///
/// MusicBrainz needs no key and is always available. Last.fm and Discogs are
/// only queried when their credential is present.
#[derive(Clone, PartialEq, Eq)]
pub struct MetadataApiConfig {
    /// User agent identifying the tool to every provider
    ///
    /// MusicBrainz rejects anonymous clients, so this is never empty.
    pub user_agent: String,

    /// Last.fm API key for `track.getInfo`
    pub lastfm_api_key: Option<String>,

    /// Discogs personal access token
    pub discogs_token: Option<String>,

    /// Minimum delay in milliseconds between requests to one provider
    pub rate_limit_delay_ms: u64,
}

impl std::fmt::Debug for MetadataApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |name: &str, value: &Option<String>| {
            value
                .as_deref()
                .map(|v| redact_if_sensitive(name, v))
                .unwrap_or_else(|| "<unset>".to_string())
        };

        f.debug_struct("MetadataApiConfig")
            .field("user_agent", &self.user_agent)
            .field(
                "lastfm_api_key",
                &redact("lastfm_api_key", &self.lastfm_api_key),
            )
            .field("discogs_token", &redact("discogs_token", &self.discogs_token))
            .field("rate_limit_delay_ms", &self.rate_limit_delay_ms)
            .finish()
    }
}

impl Default for MetadataApiConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataApiConfig {
    /// Creates a new MetadataApiConfig with no API keys configured
    pub fn new() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            lastfm_api_key: None,
            discogs_token: None,
            rate_limit_delay_ms: DEFAULT_RATE_LIMIT_DELAY_MS,
        }
    }

    /// Parses a credentials document
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CredentialsFile = serde_json::from_str(json)
            .map_err(|e| Error::Credentials(format!("Invalid JSON in API keys file: {}", e)))?;

        let mut config = Self::new();
        config.lastfm_api_key = usable_credential(file.lastfm_api_key);
        config.discogs_token = usable_credential(file.discogs_token);
        Ok(config)
    }

    /// Loads a credentials file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            Error::Credentials(format!(
                "Failed to read API keys file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&contents)
    }

    /// Resolves credentials the way the command line does
    ///
    /// An explicit path is always tried. Without one, [`DEFAULT_CREDENTIALS_FILE`]
    /// is used if it exists. Any failure to load degrades to "no credentials";
    /// the run then proceeds with the key-less providers only.
    pub fn from_credentials_file(explicit: Option<&Path>) -> Self {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default_path = PathBuf::from(DEFAULT_CREDENTIALS_FILE);
                if !default_path.exists() {
                    debug!("No API keys file given and none found in working directory");
                    return Self::new();
                }
                default_path
            }
        };

        match Self::load(&path) {
            Ok(config) => {
                debug!(path = %path.display(), config = ?config, "Loaded API keys");
                config
            }
            Err(Error::Credentials(message)) if !path.exists() => {
                warn!("API keys file not found: {} ({})", path.display(), message);
                Self::new()
            }
            Err(e) => {
                error!("{}", e);
                Self::new()
            }
        }
    }

    /// Sets the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the Last.fm API key
    pub fn with_lastfm_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.lastfm_api_key = usable_credential(Some(api_key.into()));
        self
    }

    /// Sets the Discogs token
    pub fn with_discogs_token(mut self, token: impl Into<String>) -> Self {
        self.discogs_token = usable_credential(Some(token.into()));
        self
    }

    /// Sets the rate limit delay in milliseconds
    pub fn with_rate_limit_delay_ms(mut self, delay_ms: u64) -> Self {
        self.rate_limit_delay_ms = delay_ms;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(Error::Config("User agent cannot be empty".to_string()));
        }

        if self.rate_limit_delay_ms > 60_000 {
            return Err(Error::Config(
                "Rate limit delay exceeds maximum of 60 seconds (60,000ms)".to_string(),
            ));
        }

        Ok(())
    }

    /// Checks if Last.fm is configured
    pub fn has_lastfm(&self) -> bool {
        self.lastfm_api_key.is_some()
    }

    /// Checks if Discogs is configured
    pub fn has_discogs(&self) -> bool {
        self.discogs_token.is_some()
    }
}

/// Drops blank values and the placeholders shipped in the template file
fn usable_credential(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !PLACEHOLDER_VALUES.contains(&v.as_str()))
}

/// Configuration for one enrichment run.
///
/// Use [`RunConfigBuilder`] to construct instances.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory scanned recursively for audio files
    pub root: PathBuf,

    /// Number of files processed concurrently (at least 1)
    pub workers: usize,

    /// Provider credentials and request pacing
    pub metadata_api_config: MetadataApiConfig,
}

impl RunConfig {
    /// Creates a new builder for constructing a `RunConfig`.
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }
}

/// Builder for constructing [`RunConfig`] instances.
#[derive(Default)]
pub struct RunConfigBuilder {
    root: Option<PathBuf>,
    workers: Option<usize>,
    metadata_api_config: Option<MetadataApiConfig>,
}

impl RunConfigBuilder {
    /// Sets the library root directory
    pub fn root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Sets the worker count; values below 1 are raised to 1
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Sets provider credentials
    pub fn metadata_api_config(mut self, config: MetadataApiConfig) -> Self {
        self.metadata_api_config = Some(config);
        self
    }

    /// Builds the configuration, checking that the root is a readable directory.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] when no root was given or the API config is invalid
    /// - [`Error::InvalidRoot`] when the root is missing, not a directory or unreadable
    pub fn build(self) -> Result<RunConfig> {
        let root = self
            .root
            .ok_or_else(|| Error::Config("A root directory is required".to_string()))?;

        validate_root(&root)?;

        let workers = match self.workers.unwrap_or(DEFAULT_WORKERS) {
            0 => {
                warn!("Worker count 0 is not allowed, using 1");
                1
            }
            n => n,
        };

        let metadata_api_config = self.metadata_api_config.unwrap_or_default();
        metadata_api_config.validate()?;

        Ok(RunConfig {
            root,
            workers,
            metadata_api_config,
        })
    }
}

fn validate_root(root: &Path) -> Result<()> {
    let metadata = fs::metadata(root).map_err(|e| Error::InvalidRoot {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })?;

    if !metadata.is_dir() {
        return Err(Error::InvalidRoot {
            path: root.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }

    fs::read_dir(root).map_err(|e| Error::InvalidRoot {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })?;

    Ok(())
}
