//! External Metadata Providers
//!
//! This module contains clients for external metadata services:
//! - MusicBrainz - open music encyclopedia, no credential required
//! - Last.fm - listener tags and wiki dates, API key required
//! - Discogs - release database, personal access token required
//!
//! Each provider paces its own requests, retries transient failures with
//! backoff and always returns a terminal [`ProviderResponse`]; errors never
//! escape a `lookup` call.

pub mod discogs;
pub mod lastfm;
pub mod musicbrainz;
pub mod rate_limit;
pub mod retry;
mod transport;

pub use discogs::DiscogsClient;
pub use lastfm::LastFmClient;
pub use musicbrainz::MusicBrainzClient;
pub use rate_limit::RateLimiter;

use async_trait::async_trait;
use bridge_traits::http::HttpClient;
use bridge_traits::RetryPolicy;
use core_runtime::config::{MetadataApiConfig, DEFAULT_USER_AGENT};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{MetadataError, Result};
use crate::models::{ProviderRecord, ProviderResponse};

/// A remote metadata service queried by artist and title
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Stable display name used in logs
    fn name(&self) -> &'static str;

    /// Look up one track. Never fails; failures are expressed as a status.
    async fn lookup(&self, artist: &str, title: &str) -> ProviderResponse;
}

/// Request behaviour common to every provider client
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub user_agent: String,
    /// Minimum interval between two requests to the same provider
    pub rate_limit: Duration,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            rate_limit: Duration::from_secs(1),
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Build the provider chain in its fixed order.
///
/// MusicBrainz is always present. Last.fm and Discogs are added only when a
/// usable credential is configured, so an unconfigured provider is never
/// queried.
pub fn build_providers(
    http_client: Arc<dyn HttpClient>,
    credentials: &MetadataApiConfig,
    settings: &ProviderSettings,
) -> Vec<Arc<dyn MetadataProvider>> {
    let mut providers: Vec<Arc<dyn MetadataProvider>> = vec![Arc::new(MusicBrainzClient::new(
        Arc::clone(&http_client),
        settings,
    ))];

    match &credentials.lastfm_api_key {
        Some(api_key) => providers.push(Arc::new(LastFmClient::new(
            Arc::clone(&http_client),
            api_key.clone(),
            settings,
        ))),
        None => warn!("Last.fm API key not configured - provider disabled"),
    }

    match &credentials.discogs_token {
        Some(token) => providers.push(Arc::new(DiscogsClient::new(
            Arc::clone(&http_client),
            token.clone(),
            settings,
        ))),
        None => warn!("Discogs token not configured - provider disabled"),
    }

    info!(
        providers = %providers.iter().map(|p| p.name()).collect::<Vec<_>>().join(", "),
        "Metadata providers ready"
    );

    providers
}

/// Normalize an artist or title before querying.
///
/// Trims, collapses whitespace and strips a featuring suffix such as
/// `feat. X`, `(ft. X)` or `featuring X`. A value that would become empty is
/// returned whitespace-normalized but otherwise unchanged.
pub fn normalize_query(value: &str) -> String {
    let words: Vec<&str> = value.split_whitespace().collect();

    let cut = words.iter().position(|word| {
        let bare = word
            .trim_start_matches(&['(', '['][..])
            .to_lowercase();
        matches!(bare.as_str(), "feat." | "feat" | "ft." | "featuring")
    });

    let kept = match cut {
        Some(0) | None => &words[..],
        Some(index) => &words[..index],
    };

    kept.join(" ")
        .trim_end_matches(|c: char| c == '-' || c == ',' || c.is_whitespace())
        .to_string()
}

/// Turn a client's internal result into the terminal response.
pub(crate) fn into_response(
    provider: &'static str,
    artist: &str,
    title: &str,
    result: Result<Option<ProviderRecord>>,
) -> ProviderResponse {
    match result {
        Ok(Some(record)) => {
            let response = ProviderResponse::found(record);
            debug!(provider, artist, title, status = ?response.status, "Lookup finished");
            response
        }
        Ok(None) => {
            debug!(provider, artist, title, "No match");
            ProviderResponse::not_found()
        }
        Err(MetadataError::AuthFailure { message, .. }) => {
            warn!(provider, error = %message, "Credentials rejected");
            ProviderResponse::auth_failed()
        }
        Err(e) => {
            warn!(provider, artist, title, error = %e, "Lookup failed");
            ProviderResponse::error()
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MockHttp;
    use super::*;
    use crate::models::LookupStatus;

    #[test]
    fn test_normalize_query_strips_featuring() {
        assert_eq!(normalize_query("Daft Punk feat. Pharrell"), "Daft Punk");
        assert_eq!(normalize_query("Get Lucky (feat. Pharrell Williams)"), "Get Lucky");
        assert_eq!(normalize_query("Song [ft. Someone]"), "Song");
        assert_eq!(normalize_query("Artist Featuring Guest"), "Artist");
        assert_eq!(normalize_query("Track - ft. Guest"), "Track");
    }

    #[test]
    fn test_normalize_query_whitespace() {
        assert_eq!(normalize_query("  Boards   of\tCanada "), "Boards of Canada");
        assert_eq!(normalize_query("Feat. Only"), "Feat. Only");
        assert_eq!(normalize_query("Left Foot"), "Left Foot");
    }

    #[test]
    fn test_into_response_statuses() {
        let found = into_response(
            "test",
            "a",
            "t",
            Ok(Some(ProviderRecord::default().with_genre("House"))),
        );
        assert_eq!(found.status, LookupStatus::Found);

        let auth = into_response(
            "test",
            "a",
            "t",
            Err(MetadataError::AuthFailure {
                provider: "test".into(),
                message: "bad".into(),
            }),
        );
        assert_eq!(auth.status, LookupStatus::AuthFailed);

        let exhausted = into_response(
            "test",
            "a",
            "t",
            Err(MetadataError::RateLimited {
                provider: "test".into(),
                retry_after: None,
            }),
        );
        assert_eq!(exhausted.status, LookupStatus::Error);
    }

    #[test]
    fn test_build_providers_skips_missing_credentials() {
        let http: Arc<dyn HttpClient> = Arc::new(MockHttp::new());
        let settings = ProviderSettings::default();

        let providers = build_providers(Arc::clone(&http), &MetadataApiConfig::new(), &settings);
        let names: Vec<_> = providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["MusicBrainz"]);

        let credentials = MetadataApiConfig::new()
            .with_lastfm_api_key("key")
            .with_discogs_token("token");
        let providers = build_providers(http, &credentials, &settings);
        let names: Vec<_> = providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["MusicBrainz", "Last.fm", "Discogs"]);
    }
}
