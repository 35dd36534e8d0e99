//! Last.fm API Client
//!
//! Provides listener tags and, through the track wiki, a publication year.
//!
//! ## API Endpoints
//!
//! - **Track Info**: `https://ws.audioscrobbler.com/2.0/?method=track.getInfo&api_key={key}&artist={artist}&track={title}&autocorrect=1&format=json`
//!
//! ## Rate Limiting
//!
//! Last.fm API rate limits:
//! - Free tier: Varies, generally permissive (several requests per second)
//! - We apply the configured interval to be respectful
//!
//! ## API Key Requirement
//!
//! Last.fm requires an API key for all requests.
//! Obtain one at: https://www.last.fm/api/account/create

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use super::retry::with_retry;
use super::transport::{http_error, ProviderTransport};
use super::{into_response, MetadataProvider, ProviderSettings};
use crate::error::{MetadataError, Result};
use crate::models::{ProviderRecord, ProviderResponse};

const PROVIDER: &str = "Last.fm";

/// Last.fm API base URL
const LASTFM_API_BASE: &str = "https://ws.audioscrobbler.com/2.0/";

/// Number of top tags kept per track
const MAX_TAGS: usize = 5;

/// Last.fm API client
pub struct LastFmClient {
    transport: ProviderTransport,
    api_key: String,
}

/// Last.fm sends a lone object where a one-element array would be expected
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[derive(Debug, Deserialize)]
struct Tag {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TopTags {
    #[serde(default)]
    tag: Option<OneOrMany<Tag>>,
}

#[derive(Debug, Deserialize)]
struct Wiki {
    #[serde(default)]
    published: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackInfo {
    #[serde(default)]
    toptags: Option<TopTags>,
    #[serde(default)]
    wiki: Option<Wiki>,
}

/// Last.fm API response wrapper
#[derive(Debug, Deserialize)]
struct TrackResponse {
    track: Option<TrackInfo>,
}

/// Last.fm error response
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: i32,
    #[serde(default)]
    message: String,
}

impl LastFmClient {
    /// Creates a new Last.fm API client
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client for making requests
    /// * `api_key` - Last.fm API key
    /// * `settings` - Pacing, retry and timeout settings
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        api_key: String,
        settings: &ProviderSettings,
    ) -> Self {
        Self {
            transport: ProviderTransport::new(PROVIDER, http_client, settings),
            api_key,
        }
    }

    async fn fetch(&self, artist: &str, title: &str) -> Result<Option<ProviderRecord>> {
        let policy = self.transport.retry_policy();
        let track =
            match with_retry(PROVIDER, policy, move || self.get_track_info(artist, title)).await? {
                Some(track) => track,
                None => return Ok(None),
            };

        let tags: Vec<String> = track
            .toptags
            .and_then(|t| t.tag)
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.name.trim().to_string())
            .filter(|name| !name.is_empty())
            .take(MAX_TAGS)
            .collect();

        let year = track
            .wiki
            .and_then(|w| w.published)
            .as_deref()
            .and_then(published_year);

        Ok(Some(ProviderRecord {
            genre: tags.first().cloned(),
            year,
            tags,
        }))
    }

    /// Gets track information from Last.fm
    ///
    /// # Returns
    ///
    /// - `Ok(Some(TrackInfo))` - Track found
    /// - `Ok(None)` - Track unknown to Last.fm
    /// - `Err` - API error, rejected key or rate limiting
    async fn get_track_info(&self, artist: &str, title: &str) -> Result<Option<TrackInfo>> {
        let url = format!(
            "{}?method=track.getInfo&api_key={}&artist={}&track={}&autocorrect=1&format=json",
            LASTFM_API_BASE,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(artist),
            urlencoding::encode(title)
        );

        debug!("Querying Last.fm: track.getInfo for '{} - {}'", artist, title);

        let response = self.transport.send(HttpRequest::get(url)).await?;

        if response.status == 429 {
            return Err(self.transport.rate_limited(&response));
        }

        // Last.fm reports most failures in the body, sometimes with a 200
        if let Ok(error_resp) = serde_json::from_slice::<ErrorResponse>(&response.body) {
            return self.api_error(&response, error_resp);
        }

        if matches!(response.status, 401 | 403) {
            return Err(self.transport.auth_failure(format!("HTTP {}", response.status)));
        }

        if !response.is_success() {
            return Err(http_error(&response));
        }

        let track_response: TrackResponse = response.json().map_err(|e| {
            MetadataError::JsonParse(format!("Failed to parse Last.fm response: {}", e))
        })?;

        Ok(track_response.track)
    }

    fn api_error(
        &self,
        response: &HttpResponse,
        error_resp: ErrorResponse,
    ) -> Result<Option<TrackInfo>> {
        match error_resp.error {
            // Track not found
            6 => Ok(None),
            // Invalid API key, suspended API key
            10 | 26 => Err(self.transport.auth_failure(error_resp.message)),
            // Rate limit exceeded
            29 => Err(self.transport.rate_limited(response)),
            // Operation failed, service offline, temporary error
            8 | 11 | 16 => Err(MetadataError::HttpError {
                status: response.status.max(503),
                body: error_resp.message,
            }),
            code => Err(MetadataError::ProviderError {
                provider: PROVIDER.to_string(),
                message: format!("API error {}: {}", code, error_resp.message),
            }),
        }
    }
}

#[async_trait]
impl MetadataProvider for LastFmClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn lookup(&self, artist: &str, title: &str) -> ProviderResponse {
        into_response(PROVIDER, artist, title, self.fetch(artist, title).await)
    }
}

/// First four-digit token between 1900 and 2099, e.g. in `"01 Jan 2009, 00:00"`
fn published_year(published: &str) -> Option<u32> {
    published
        .split(|c: char| !c.is_ascii_digit())
        .filter(|token| token.len() == 4)
        .filter_map(|token| token.parse::<u32>().ok())
        .find(|year| (1900..=2099).contains(year))
}
