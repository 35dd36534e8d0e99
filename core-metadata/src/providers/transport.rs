//! Paced, single-attempt HTTP access shared by the provider clients

use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::{BridgeError, RetryPolicy};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::rate_limit::RateLimiter;
use super::ProviderSettings;
use crate::error::{MetadataError, Result};

pub(crate) struct ProviderTransport {
    provider: &'static str,
    http_client: Arc<dyn HttpClient>,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    settings: ProviderSettings,
}

impl ProviderTransport {
    pub(crate) fn new(
        provider: &'static str,
        http_client: Arc<dyn HttpClient>,
        settings: &ProviderSettings,
    ) -> Self {
        Self {
            provider,
            http_client,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(settings.rate_limit))),
            settings: settings.clone(),
        }
    }

    pub(crate) fn retry_policy(&self) -> &RetryPolicy {
        &self.settings.retry
    }

    /// Wait for this provider's rate limit, then execute one request.
    ///
    /// Adds the User-Agent, `Accept: application/json` and the request timeout.
    /// Non-2xx responses are returned as-is for the caller to classify.
    pub(crate) async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let request = request
            .header("User-Agent", self.settings.user_agent.clone())
            .header("Accept", "application/json")
            .timeout(self.settings.request_timeout);

        self.rate_limiter.lock().await.wait_if_needed().await;

        debug!(provider = self.provider, url = %redact_query(&request.url), "Sending request");

        self.http_client.execute(request).await.map_err(|e| match e {
            BridgeError::Timeout(after) => MetadataError::NetworkError(format!(
                "{} request timed out after {:?}",
                self.provider, after
            )),
            other => MetadataError::NetworkError(format!(
                "{} request failed: {}",
                self.provider, other
            )),
        })
    }

    /// Error for a 429/503 style response, honouring `Retry-After`
    pub(crate) fn rate_limited(&self, response: &HttpResponse) -> MetadataError {
        MetadataError::RateLimited {
            provider: self.provider.to_string(),
            retry_after: response.retry_after(),
        }
    }

    pub(crate) fn auth_failure(&self, message: impl Into<String>) -> MetadataError {
        MetadataError::AuthFailure {
            provider: self.provider.to_string(),
            message: message.into(),
        }
    }
}

pub(crate) fn http_error(response: &HttpResponse) -> MetadataError {
    MetadataError::HttpError {
        status: response.status,
        body: String::from_utf8_lossy(&response.body)
            .chars()
            .take(200)
            .collect(),
    }
}

/// Drop credentials from a URL before it is logged
fn redact_query(url: &str) -> String {
    match url.split_once('?') {
        Some((base, query)) => {
            let params: Vec<String> = query
                .split('&')
                .map(|pair| match pair.split_once('=') {
                    Some((key, _)) if key == "api_key" || key == "token" => {
                        format!("{}=[REDACTED]", key)
                    }
                    _ => pair.to_string(),
                })
                .collect();
            format!("{}?{}", base, params.join("&"))
        }
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_query() {
        assert_eq!(
            redact_query("https://x/2.0/?method=track.getInfo&api_key=secret&artist=A"),
            "https://x/2.0/?method=track.getInfo&api_key=[REDACTED]&artist=A"
        );
        assert_eq!(redact_query("https://x/ws/2"), "https://x/ws/2");
    }

    #[test]
    fn test_http_error_truncates_body() {
        let response = HttpResponse::new(500, "x".repeat(1000));
        match http_error(&response) {
            MetadataError::HttpError { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), 200);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
