//! Outbound exchange with the remote inference endpoint.
//!
//! The transport seam is a trait so the orchestrator can be exercised
//! against scripted replies in tests; [`HttpTransport`] is the production
//! implementation over a shared `reqwest` client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use tutorkit_core::EndpointConfig;

use crate::error::TransportError;

/// Request body for the `/query` exchange.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRequest {
    pub query: String,
    pub course_id: String,
    pub user_id: String,
}

/// Decoded reply shapes.
///
/// `Malformed` covers payloads that are valid JSON but match neither the
/// success nor the rejected contract; downstream treats those as sentinel
/// parse input rather than an error, so the caller always has something
/// renderable.
#[derive(Clone, Debug, PartialEq)]
pub enum ExchangeReply {
    /// `{status: "success", data: {...}}` — the raw `data` object, kept as
    /// JSON because concept fields vary across backend versions.
    Success { data: Value },
    /// `{status: "rejected", message}` — input declared out of scope.
    Rejected { message: String },
    Malformed,
}

#[derive(Debug, Deserialize)]
struct WireReply {
    status: Option<String>,
    message: Option<String>,
    data: Option<Value>,
}

/// Classifies a decoded JSON body into an [`ExchangeReply`].
pub fn classify_reply(body: Value) -> ExchangeReply {
    let Ok(wire) = serde_json::from_value::<WireReply>(body) else {
        return ExchangeReply::Malformed;
    };
    match wire.status.as_deref() {
        Some("success") => match wire.data {
            Some(data) if data.is_object() => ExchangeReply::Success { data },
            _ => ExchangeReply::Malformed,
        },
        Some("rejected") => ExchangeReply::Rejected {
            message: wire.message.unwrap_or_else(|| "query was out of scope".to_string()),
        },
        _ => ExchangeReply::Malformed,
    }
}

#[async_trait]
pub trait ExchangeTransport: Send + Sync {
    async fn exchange(&self, request: &ExchangeRequest) -> Result<ExchangeReply, TransportError>;
}

/// HTTP transport posting to `<base_url>/query`.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    query_url: String,
}

impl HttpTransport {
    pub fn new(config: &EndpointConfig) -> Result<Self, TransportError> {
        let base = config.base_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(TransportError::MissingBaseUrl);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(TransportError::Request)?;
        Ok(Self { client, query_url: format!("{base}/query") })
    }
}

#[async_trait]
impl ExchangeTransport for HttpTransport {
    async fn exchange(&self, request: &ExchangeRequest) -> Result<ExchangeReply, TransportError> {
        debug!(url = %self.query_url, query = %request.query, "issuing exchange");
        let response = self.client.post(&self.query_url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let body: Value = response.json().await.map_err(|_| TransportError::NonJsonBody)?;
        Ok(classify_reply(body))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{classify_reply, ExchangeReply, ExchangeRequest};

    #[test]
    fn request_serializes_with_camel_case_fields() {
        let request = ExchangeRequest {
            query: "What is BATNA?".to_string(),
            course_id: "decision".to_string(),
            user_id: "default".to_string(),
        };
        let body = serde_json::to_value(&request).expect("serialize request");
        assert_eq!(body["query"], "What is BATNA?");
        assert_eq!(body["courseId"], "decision");
        assert_eq!(body["userId"], "default");
    }

    #[test]
    fn success_reply_keeps_raw_data() {
        let reply = classify_reply(json!({
            "status": "success",
            "data": { "answer": "**Strategic Thinking Lens**\nBody." },
        }));
        let ExchangeReply::Success { data } = reply else {
            panic!("expected success reply");
        };
        assert!(data["answer"].as_str().is_some());
    }

    #[test]
    fn rejected_reply_carries_message() {
        let reply = classify_reply(json!({
            "status": "rejected",
            "message": "please ask a course question",
        }));
        assert_eq!(
            reply,
            ExchangeReply::Rejected { message: "please ask a course question".to_string() }
        );
    }

    #[test]
    fn unexpected_shapes_are_malformed_not_errors() {
        for body in [
            json!({ "status": "success" }),
            json!({ "status": "success", "data": "not an object" }),
            json!({ "unrelated": true }),
            json!(42),
        ] {
            assert_eq!(classify_reply(body), ExchangeReply::Malformed);
        }
    }
}
