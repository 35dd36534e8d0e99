//! Discogs API Client
//!
//! Searches the Discogs release database; a release hit carries year, genres
//! and styles, so one request per lookup is enough.
//!
//! ## API Endpoints
//!
//! - **Search**: `https://api.discogs.com/database/search?q={artist title}&type=release&per_page=1`
//!
//! ## Authentication
//!
//! Database search requires a personal access token sent as
//! `Authorization: Discogs token={token}`. A 401 or 403 means the token was
//! rejected.
//!
//! ## Rate Limiting
//!
//! Authenticated clients get 60 requests per minute; the configured interval
//! keeps the client below that.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::retry::with_retry;
use super::transport::{http_error, ProviderTransport};
use super::{into_response, MetadataProvider, ProviderSettings};
use crate::error::{MetadataError, Result};
use crate::models::{year_from_date, ProviderRecord, ProviderResponse};

const PROVIDER: &str = "Discogs";

/// Discogs API base URL
const DISCOGS_API_BASE: &str = "https://api.discogs.com";

/// Discogs API client
pub struct DiscogsClient {
    transport: ProviderTransport,
    token: String,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    /// Sent as a string by the search endpoint, as a number elsewhere
    #[serde(default)]
    year: Option<Value>,
    #[serde(default)]
    genre: Vec<String>,
    #[serde(default)]
    style: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

impl DiscogsClient {
    /// Creates a new Discogs API client
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client for making requests
    /// * `token` - Discogs personal access token
    /// * `settings` - Pacing, retry and timeout settings
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        token: String,
        settings: &ProviderSettings,
    ) -> Self {
        Self {
            transport: ProviderTransport::new(PROVIDER, http_client, settings),
            token,
        }
    }

    async fn fetch(&self, artist: &str, title: &str) -> Result<Option<ProviderRecord>> {
        let policy = self.transport.retry_policy();
        let release =
            match with_retry(PROVIDER, policy, move || self.search_release(artist, title)).await? {
                Some(release) => release,
                None => return Ok(None),
            };

        let year = release.year.as_ref().and_then(|value| match value {
            Value::String(s) => year_from_date(s),
            Value::Number(n) => n
                .as_u64()
                .and_then(|y| u32::try_from(y).ok())
                .and_then(|y| year_from_date(&y.to_string())),
            _ => None,
        });

        let mut tags: Vec<String> = Vec::new();
        for name in release.genre.iter().chain(release.style.iter()) {
            let name = name.trim();
            if !name.is_empty() && !tags.iter().any(|t| t.eq_ignore_ascii_case(name)) {
                tags.push(name.to_string());
            }
        }

        Ok(Some(ProviderRecord {
            genre: release
                .genre
                .iter()
                .map(|g| g.trim())
                .find(|g| !g.is_empty())
                .map(str::to_string),
            year,
            tags,
        }))
    }

    /// Searches for the best matching release
    async fn search_release(&self, artist: &str, title: &str) -> Result<Option<SearchResult>> {
        let url = format!(
            "{}/database/search?q={}&type=release&per_page=1",
            DISCOGS_API_BASE,
            urlencoding::encode(&format!("{} {}", artist, title))
        );

        debug!("Searching Discogs for '{} - {}'", artist, title);

        let request = HttpRequest::get(url)
            .header("Authorization", format!("Discogs token={}", self.token));
        let response = self.transport.send(request).await?;

        match response.status {
            200 => {}
            401 | 403 => {
                return Err(self
                    .transport
                    .auth_failure(format!("HTTP {}", response.status)))
            }
            404 => return Ok(None),
            429 => return Err(self.transport.rate_limited(&response)),
            _ => return Err(http_error(&response)),
        }

        let search: SearchResponse = response.json().map_err(|e| {
            MetadataError::JsonParse(format!("Failed to parse Discogs search results: {}", e))
        })?;

        Ok(search.results.into_iter().next())
    }
}

#[async_trait]
impl MetadataProvider for DiscogsClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn lookup(&self, artist: &str, title: &str) -> ProviderResponse {
        into_response(PROVIDER, artist, title, self.fetch(artist, title).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LookupStatus;
    use crate::providers::testing::{fast_settings, query_param, MockHttp};
    use bridge_traits::http::HttpResponse;

    fn client(mock: MockHttp) -> DiscogsClient {
        DiscogsClient::new(Arc::new(mock), "tok".to_string(), &fast_settings())
    }

    #[tokio::test]
    async fn test_lookup_reads_year_genres_and_styles() {
        let mut mock = MockHttp::new();
        mock.expect_execute()
            .times(1)
            .withf(|req| {
                req.url.starts_with("https://api.discogs.com/database/search")
                    && query_param(&req.url, "q").as_deref() == Some("Daft Punk Around The World")
                    && query_param(&req.url, "type").as_deref() == Some("release")
                    && req.headers.get("Authorization").map(String::as_str)
                        == Some("Discogs token=tok")
            })
            .returning(|_| {
                Ok(HttpResponse::new(
                    200,
                    r#"{"results": [{
                        "title": "Daft Punk - Homework",
                        "year": "1997",
                        "genre": ["Electronic"],
                        "style": ["House", "Electronic"]
                    }]}"#,
                ))
            });

        let response = client(mock).lookup("Daft Punk", "Around The World").await;

        assert_eq!(response.status, LookupStatus::Found);
        assert_eq!(response.record.genre.as_deref(), Some("Electronic"));
        assert_eq!(response.record.year, Some(1997));
        assert_eq!(response.record.tags, vec!["Electronic", "House"]);
    }

    #[tokio::test]
    async fn test_numeric_year() {
        let mut mock = MockHttp::new();
        mock.expect_execute().returning(|_| {
            Ok(HttpResponse::new(200, r#"{"results": [{"year": 2003}]}"#))
        });

        let response = client(mock).lookup("A", "B").await;
        assert_eq!(response.record.year, Some(2003));
    }

    #[tokio::test]
    async fn test_no_results_is_not_found() {
        let mut mock = MockHttp::new();
        mock.expect_execute()
            .returning(|_| Ok(HttpResponse::new(200, r#"{"results": []}"#)));

        let response = client(mock).lookup("A", "B").await;
        assert_eq!(response.status, LookupStatus::NotFound);
    }

    #[tokio::test]
    async fn test_unauthorized_is_auth_failure_without_retry() {
        let mut mock = MockHttp::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(401, r#"{"message": "You must authenticate"}"#)));

        let response = client(mock).lookup("A", "B").await;
        assert_eq!(response.status, LookupStatus::AuthFailed);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_retried() {
        let mut mock = MockHttp::new();
        mock.expect_execute()
            .times(3)
            .returning(|_| Ok(HttpResponse::new(200, "<html>oops</html>")));

        let response = client(mock).lookup("A", "B").await;
        assert_eq!(response.status, LookupStatus::Error);
    }
}
