use crate::error::DeliveryError;
use async_trait::async_trait;
use model::record::AttributeRecord;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Path of the bulk attribute-update endpoint, relative to the API base.
const TRACK_ENDPOINT: &str = "/users/track";

/// Upstream API endpoint and credentials.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    api_url: String,
    api_key: String,
}

impl UpstreamConfig {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let mut api_url: String = api_url.into();
        while api_url.ends_with('/') {
            api_url.pop();
        }
        UpstreamConfig {
            api_url,
            api_key: api_key.into(),
        }
    }

    /// Reads `UPSTREAM_API_URL` and `UPSTREAM_API_KEY` from the environment.
    pub fn from_env() -> Result<Self, DeliveryError> {
        let api_url = std::env::var("UPSTREAM_API_URL")
            .map_err(|_| DeliveryError::Fatal("UPSTREAM_API_URL is not set".into()))?;
        let api_key = std::env::var("UPSTREAM_API_KEY")
            .map_err(|_| DeliveryError::Fatal("UPSTREAM_API_KEY is not set".into()))?;
        Ok(UpstreamConfig::new(api_url, api_key))
    }

    pub fn track_url(&self) -> String {
        format!("{}{TRACK_ENDPOINT}", self.api_url)
    }
}

/// One delivery attempt against the bulk endpoint. The retrying wrapper
/// lives in the processing layer; implementations never retry internally.
#[async_trait]
pub trait BulkTrack: Send + Sync {
    /// Posts one batch; returns the number of records applied upstream.
    async fn track(&self, records: &[AttributeRecord]) -> Result<usize, DeliveryError>;
}

#[derive(Serialize)]
struct TrackRequest<'a> {
    attributes: &'a [AttributeRecord],
}

#[derive(Debug, Default, Deserialize)]
struct TrackResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

/// HTTP client for the bulk attribute-update endpoint.
pub struct TrackApi {
    client: reqwest::Client,
    config: UpstreamConfig,
}

impl TrackApi {
    pub fn new(config: UpstreamConfig) -> Self {
        TrackApi {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl BulkTrack for TrackApi {
    async fn track(&self, records: &[AttributeRecord]) -> Result<usize, DeliveryError> {
        let request = TrackRequest {
            attributes: records,
        };

        let response = self
            .client
            .post(self.config.track_url())
            .bearer_auth(&self.config.api_key)
            .header("X-Bulk", "true")
            .json(&request)
            .send()
            .await
            .map_err(|err| DeliveryError::Retryable(format!("transport error: {err}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| DeliveryError::Retryable(format!("failed to read response: {err}")))?;

        if status == StatusCode::BAD_REQUEST {
            warn!(
                payload = %serde_json::to_string(&request).unwrap_or_default(),
                response = %body,
                "Batch rejected as malformed; records skipped"
            );
        }

        classify_response(status, &body, records.len())
    }
}

/// Maps an upstream response to an applied-record count or a classified
/// error. Pure function of status, body and batch size.
pub fn classify_response(
    status: StatusCode,
    body: &str,
    batch_size: usize,
) -> Result<usize, DeliveryError> {
    if status == StatusCode::BAD_REQUEST {
        return Ok(0);
    }
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return Err(DeliveryError::Retryable(format!(
            "upstream returned {status}"
        )));
    }

    let parsed: TrackResponse = serde_json::from_str(body).unwrap_or_default();
    if status.is_success() {
        if parsed.errors.is_empty() {
            return Ok(batch_size);
        }
        warn!(
            errors = %serde_json::to_string(&parsed.errors).unwrap_or_default(),
            "Encountered errors processing some records in the batch"
        );
        return Ok(batch_size.saturating_sub(parsed.errors.len()));
    }

    Err(DeliveryError::Fatal(parsed.message.unwrap_or_else(|| {
        format!("upstream returned {status}: {body}")
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slashes_from_the_api_url() {
        let config = UpstreamConfig::new("https://api.example.com/", "key");
        assert_eq!(config.track_url(), "https://api.example.com/users/track");
    }

    #[test]
    fn clean_success_applies_the_whole_batch() {
        let applied =
            classify_response(StatusCode::CREATED, r#"{"message": "success"}"#, 75).unwrap();
        assert_eq!(applied, 75);
    }

    #[test]
    fn per_record_errors_reduce_the_applied_count() {
        let body = r#"{"message": "success", "errors": [
            {"type": "bad attribute", "index": 3},
            {"type": "bad attribute", "index": 9}
        ]}"#;
        let applied = classify_response(StatusCode::CREATED, body, 75).unwrap();
        assert_eq!(applied, 73);
    }

    #[test]
    fn malformed_payload_applies_nothing_without_raising() {
        let applied =
            classify_response(StatusCode::BAD_REQUEST, r#"{"message": "bad request"}"#, 75)
                .unwrap();
        assert_eq!(applied, 0);
    }

    #[test]
    fn rate_limit_and_server_errors_are_retryable() {
        for status in [
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
        ] {
            let err = classify_response(status, "", 10).unwrap_err();
            assert!(matches!(err, DeliveryError::Retryable(_)), "{status}");
        }
    }

    #[test]
    fn unexpected_client_errors_are_fatal_with_the_server_message() {
        let err = classify_response(
            StatusCode::NOT_FOUND,
            r#"{"message": "no such endpoint"}"#,
            10,
        )
        .unwrap_err();
        match err {
            DeliveryError::Fatal(message) => assert_eq!(message, "no such endpoint"),
            other => panic!("expected fatal, got {other:?}"),
        }
    }
}
