//! External lookup client
//!
//! Fetches a remote JSON resource and decodes it into a typed payload.
//! Every failure is classified into a [`LookupError`]; callers decide how to
//! degrade. There are no retries, each call is a single attempt bounded by
//! the deadline the caller passes in.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Default user agent sent with every lookup
pub const DEFAULT_USER_AGENT: &str = concat!("weather-assistant/", env!("CARGO_PKG_VERSION"));

/// Why a lookup produced no data
#[derive(Error, Debug)]
pub enum LookupError {
    /// Network failure or deadline exceeded
    #[error("remote service unreachable: {0}")]
    Unreachable(String),

    /// Remote service answered with a non-2xx status
    #[error("remote service returned HTTP {0}")]
    HttpError(u16),

    /// 2xx response whose body does not match the expected shape
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Thin wrapper around a shared HTTP client
#[derive(Debug, Clone)]
pub struct LookupClient {
    client: Client,
}

impl LookupClient {
    /// Create a new lookup client
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    /// Fetch `url` and decode the body as `T`.
    ///
    /// The caller is responsible for percent-encoding any user text in `url`.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        deadline: Duration,
    ) -> std::result::Result<T, LookupError> {
        let start_time = Instant::now();

        let response = self
            .client
            .get(url)
            .timeout(deadline)
            .send()
            .await
            .map_err(|e| {
                warn!("Lookup request failed: {}", e);
                LookupError::Unreachable(e.to_string())
            })?;

        let status = response.status();
        debug!(
            "HTTP response received: {} in {:.3}s",
            status,
            start_time.elapsed().as_secs_f64()
        );

        if !status.is_success() {
            warn!("Lookup returned non-success status {}", status);
            return Err(LookupError::HttpError(status.as_u16()));
        }

        // The deadline covers the body as well; a stalled body is a network failure.
        let body = response
            .bytes()
            .await
            .map_err(|e| LookupError::Unreachable(e.to_string()))?;

        serde_json::from_slice(&body).map_err(|e| {
            warn!("Failed to decode lookup response: {}", e);
            LookupError::MalformedResponse(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize)]
    struct Payload {
        value: i32,
    }

    fn client() -> LookupClient {
        LookupClient::new(DEFAULT_USER_AGENT).unwrap()
    }

    #[tokio::test]
    async fn test_decodes_success_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": 7})))
            .expect(1)
            .mount(&server)
            .await;

        let payload: Payload = client()
            .fetch_json(&format!("{}/data", server.uri()), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(payload.value, 7);
    }

    #[tokio::test]
    async fn test_non_success_status_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result: std::result::Result<Payload, _> = client()
            .fetch_json(&format!("{}/data", server.uri()), Duration::from_secs(5))
            .await;
        assert!(matches!(result, Err(LookupError::HttpError(503))));
    }

    #[tokio::test]
    async fn test_wrong_shape_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"other": "x"})))
            .mount(&server)
            .await;

        let result: std::result::Result<Payload, _> = client()
            .fetch_json(&format!("{}/data", server.uri()), Duration::from_secs(5))
            .await;
        assert!(matches!(result, Err(LookupError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_deadline_exceeded_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"value": 1}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let result: std::result::Result<Payload, _> = client()
            .fetch_json(&format!("{}/data", server.uri()), Duration::from_millis(50))
            .await;
        assert!(matches!(result, Err(LookupError::Unreachable(_))));
    }

    #[tokio::test]
    async fn test_dropping_the_call_abandons_the_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"value": 1}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = client();
        let url = format!("{}/data", server.uri());
        let started = Instant::now();
        let call = client.fetch_json::<Payload>(&url, Duration::from_secs(30));
        let outcome = tokio::time::timeout(Duration::from_millis(200), call).await;

        assert!(outcome.is_err());
        assert!(started.elapsed() < Duration::from_secs(2));
        // The request did go out before it was abandoned.
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_refused_connection_is_unreachable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result: std::result::Result<Payload, _> = client()
            .fetch_json(&format!("http://127.0.0.1:{port}/data"), Duration::from_secs(2))
            .await;
        assert!(matches!(result, Err(LookupError::Unreachable(_))));
    }
}
