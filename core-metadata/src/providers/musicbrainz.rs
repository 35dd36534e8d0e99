//! MusicBrainz API Client
//!
//! Looks up a recording by artist and title and reads its release year,
//! folksonomy tags and the credited artist's genres.
//!
//! ## API Endpoints
//!
//! - **Recording search**: `https://musicbrainz.org/ws/2/recording/?query={query}&fmt=json&limit=1`
//! - **Artist lookup**: `https://musicbrainz.org/ws/2/artist/{mbid}?inc=genres&fmt=json`
//!
//! ## Rate Limiting
//!
//! MusicBrainz allows one request per second per client and answers 503 when
//! a client goes faster. The client paces itself through a shared
//! [`RateLimiter`](super::RateLimiter) and treats 503 as a rate-limit signal.
//!
//! ## User Agent Requirement
//!
//! MusicBrainz requires all API clients to identify themselves with a proper User-Agent header:
//! Format: "ApplicationName/Version (Contact)"

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::retry::with_retry;
use super::transport::{http_error, ProviderTransport};
use super::{into_response, MetadataProvider, ProviderSettings};
use crate::error::{MetadataError, Result};
use crate::models::{year_from_date, ProviderRecord, ProviderResponse};

const PROVIDER: &str = "MusicBrainz";

/// MusicBrainz API base URL
const MUSICBRAINZ_API_BASE: &str = "https://musicbrainz.org/ws/2";

/// MusicBrainz API client
pub struct MusicBrainzClient {
    transport: ProviderTransport,
}

/// A recording search hit
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Recording {
    #[serde(default)]
    first_release_date: Option<String>,
    #[serde(default)]
    tags: Vec<NamedCount>,
    #[serde(default)]
    artist_credit: Vec<ArtistCredit>,
}

#[derive(Debug, Clone, Deserialize)]
struct NamedCount {
    name: String,
    #[serde(default)]
    count: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct ArtistCredit {
    artist: CreditedArtist,
}

#[derive(Debug, Clone, Deserialize)]
struct CreditedArtist {
    id: String,
}

/// MusicBrainz recording search response
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    recordings: Vec<Recording>,
}

/// MusicBrainz artist lookup response
#[derive(Debug, Deserialize)]
struct ArtistResponse {
    #[serde(default)]
    genres: Vec<NamedCount>,
}

impl MusicBrainzClient {
    /// Creates a new MusicBrainz API client
    ///
    /// The settings' user agent is sent with every request, as MusicBrainz
    /// requires.
    pub fn new(http_client: Arc<dyn HttpClient>, settings: &ProviderSettings) -> Self {
        Self {
            transport: ProviderTransport::new(PROVIDER, http_client, settings),
        }
    }

    async fn fetch(&self, artist: &str, title: &str) -> Result<Option<ProviderRecord>> {
        let policy = self.transport.retry_policy();

        let recording =
            match with_retry(PROVIDER, policy, move || self.search_recording(artist, title))
                .await?
            {
                Some(recording) => recording,
                None => return Ok(None),
            };

        let mut record = ProviderRecord {
            genre: None,
            year: recording
                .first_release_date
                .as_deref()
                .and_then(year_from_date),
            tags: by_count(recording.tags),
        };

        if let Some(credit) = recording.artist_credit.first() {
            let artist_id = credit.artist.id.as_str();
            match with_retry(PROVIDER, policy, move || self.artist_genres(artist_id)).await {
                Ok(genres) => record.genre = genres.into_iter().next(),
                Err(e) => warn!(
                    provider = PROVIDER,
                    artist_id,
                    error = %e,
                    "Artist genre lookup failed, using recording tags"
                ),
            }
        }

        if record.genre.is_none() {
            record.genre = record.tags.first().cloned();
        }

        Ok(Some(record))
    }

    /// Searches for the best matching recording
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Recording))` - Best match
    /// - `Ok(None)` - No matching recording
    /// - `Err` - API error
    async fn search_recording(&self, artist: &str, title: &str) -> Result<Option<Recording>> {
        // Use lucene query syntax: artist:"..." AND recording:"..."
        let query = format!(
            "artist:\"{}\" AND recording:\"{}\"",
            Self::escape_query(artist),
            Self::escape_query(title)
        );

        let url = format!(
            "{}/recording/?query={}&fmt=json&limit=1",
            MUSICBRAINZ_API_BASE,
            urlencoding::encode(&query)
        );

        let response = self.transport.send(HttpRequest::get(url)).await?;

        match response.status {
            200 => {}
            404 => return Ok(None),
            429 | 503 => return Err(self.transport.rate_limited(&response)),
            _ => return Err(http_error(&response)),
        }

        let search: SearchResponse = response.json().map_err(|e| {
            MetadataError::JsonParse(format!("Failed to parse MusicBrainz search results: {}", e))
        })?;

        let best = search.recordings.into_iter().next();
        if best.is_none() {
            debug!("No recording found for '{} - {}' on MusicBrainz", artist, title);
        }
        Ok(best)
    }

    /// Fetches the credited artist's genres, most voted first
    async fn artist_genres(&self, artist_id: &str) -> Result<Vec<String>> {
        let url = format!(
            "{}/artist/{}?inc=genres&fmt=json",
            MUSICBRAINZ_API_BASE,
            urlencoding::encode(artist_id)
        );

        let response = self.transport.send(HttpRequest::get(url)).await?;

        match response.status {
            200 => {}
            404 => return Ok(Vec::new()),
            429 | 503 => return Err(self.transport.rate_limited(&response)),
            _ => return Err(http_error(&response)),
        }

        let artist: ArtistResponse = response.json().map_err(|e| {
            MetadataError::JsonParse(format!("Failed to parse MusicBrainz artist: {}", e))
        })?;

        Ok(by_count(artist.genres))
    }

    /// Escapes special characters in Lucene query syntax
    fn escape_query(s: &str) -> String {
        // Escape special Lucene characters: + - && || ! ( ) { } [ ] ^ " ~ * ? : \ /
        let mut escaped = String::with_capacity(s.len());
        for c in s.chars() {
            if matches!(
                c,
                '\\' | '"'
                    | '+'
                    | '-'
                    | '!'
                    | '('
                    | ')'
                    | '{'
                    | '}'
                    | '['
                    | ']'
                    | '^'
                    | '~'
                    | '*'
                    | '?'
                    | ':'
                    | '/'
                    | '&'
                    | '|'
            ) {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped
    }
}

#[async_trait]
impl MetadataProvider for MusicBrainzClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn lookup(&self, artist: &str, title: &str) -> ProviderResponse {
        into_response(PROVIDER, artist, title, self.fetch(artist, title).await)
    }
}

/// Names ordered by descending vote count, ties keeping response order
fn by_count(mut items: Vec<NamedCount>) -> Vec<String> {
    items.sort_by(|a, b| b.count.cmp(&a.count));
    items
        .into_iter()
        .map(|item| item.name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}
