//! Text-generation client.
//!
//! [`TextGenerator`] is a stateless request/response seam: one prompt in, one
//! block of free text out. It knows nothing about diagrams and never retries;
//! retry policy belongs to the [`Orchestrator`](crate::orchestrator::Orchestrator).
//!
//! [`GeminiClient`] implements it over HTTP against the generative-language
//! `generateContent` endpoint.

use std::fmt;

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{config::GenerationConfig, error::ErgenError, model::ModelId, prompt::Prompt};

/// Failure of a single generation call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// No credential was supplied; no request was made.
    #[error("missing API key")]
    MissingCredential,

    /// Transport, timeout or service-reported failure, carrying the upstream message.
    #[error("{message}")]
    Service { message: String },
}

impl GenerationError {
    pub fn service(message: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
        }
    }
}

/// The opaque secret used to authenticate with the generation service.
///
/// An empty or blank secret is not a credential.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a secret, returning `None` when it is blank.
    pub fn new(secret: impl AsRef<str>) -> Option<Self> {
        let secret = secret.as_ref().trim();
        (!secret.is_empty()).then(|| Self(secret.to_string()))
    }

    /// Returns the raw secret for the request header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// A stateless text-generation capability.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Issue exactly one generation request.
    ///
    /// An empty response payload is returned as an empty string, not an error.
    ///
    /// # Errors
    ///
    /// [`GenerationError::MissingCredential`] when `credential` is `None`,
    /// without contacting the service. [`GenerationError::Service`] for any
    /// transport or service failure.
    async fn generate(
        &self,
        prompt: &Prompt,
        model: ModelId,
        credential: Option<&Credential>,
    ) -> Result<String, GenerationError>;
}

/// HTTP client for the generative-language `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
}

impl GeminiClient {
    /// Builds a client with the configured endpoint and request timeout.
    pub fn new(config: &GenerationConfig) -> Result<Self, ErgenError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| ErgenError::Config(format!("cannot build HTTP client: {err}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, model: ModelId) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint,
            model.id()
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(
        &self,
        prompt: &Prompt,
        model: ModelId,
        credential: Option<&Credential>,
    ) -> Result<String, GenerationError> {
        let credential = credential.ok_or(GenerationError::MissingCredential)?;

        debug!(model = model.id(), prompt_bytes = prompt.as_str().len(); "Sending generation request");

        let response = self
            .client
            .post(self.url(model))
            .header("x-goog-api-key", credential.expose())
            .json(&GenerateRequest::new(prompt.as_str()))
            .send()
            .await
            .map_err(|err| GenerationError::service(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| GenerationError::service(err.to_string()))?;

        let text = read_response(status.is_success(), &body).map_err(|err| {
            warn!(status = status.as_u16(); "Generation request failed");
            match err {
                ResponseError::Service(message) => GenerationError::Service { message },
                ResponseError::Status => {
                    GenerationError::service(format!("HTTP {status}: {}", body.trim()))
                }
            }
        })?;

        debug!(model = model.id(), response_bytes = text.len(); "Generation request completed");
        Ok(text)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

impl<'a> GenerateRequest<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            contents: [Content {
                parts: [RequestPart { text }],
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
    error: Option<ServiceError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServiceError {
    message: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum ResponseError {
    /// The body carried a structured error.
    Service(String),
    /// Non-success status without a readable error body.
    Status,
}

/// Extract the generated text from a response body.
///
/// A structured `error` wins over everything else. Otherwise the first text
/// part of the first candidate is returned, or `""` when there is none.
fn read_response(success: bool, body: &str) -> Result<String, ResponseError> {
    let response: GenerateResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(_) if !success => return Err(ResponseError::Status),
        Err(err) => {
            return Err(ResponseError::Service(format!(
                "malformed response from generation service: {err}"
            )));
        }
    };

    if let Some(error) = response.error {
        return Err(ResponseError::Service(error.message.unwrap_or_else(|| {
            "the generation service reported an error".to_string()
        })));
    }
    if !success {
        return Err(ResponseError::Status);
    }

    Ok(response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(GenerateRequest::new("hello")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"contents": [{"parts": [{"text": "hello"}]}]})
        );
    }

    #[test]
    fn test_reads_first_candidate_text() {
        let body = r#"{"candidates": [
            {"content": {"parts": [{"text": "erDiagram"}, {"text": "ignored"}]}},
            {"content": {"parts": [{"text": "second"}]}}
        ]}"#;
        assert_eq!(read_response(true, body).unwrap(), "erDiagram");
    }

    #[test]
    fn test_empty_payload_is_empty_string() {
        assert_eq!(read_response(true, "{}").unwrap(), "");
        assert_eq!(read_response(true, r#"{"candidates": [{}]}"#).unwrap(), "");
        assert_eq!(
            read_response(true, r#"{"candidates": [{"content": {"parts": []}}]}"#).unwrap(),
            ""
        );
    }

    #[test]
    fn test_structured_error_carries_message() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(
            read_response(false, body),
            Err(ResponseError::Service("API key not valid".to_string()))
        );
        // Reported even alongside a success status
        assert!(matches!(
            read_response(true, body),
            Err(ResponseError::Service(_))
        ));
    }

    #[test]
    fn test_unreadable_failure() {
        assert_eq!(
            read_response(false, "<html>Bad Gateway</html>"),
            Err(ResponseError::Status)
        );
        assert!(matches!(
            read_response(true, "not json"),
            Err(ResponseError::Service(_))
        ));
    }

    #[test]
    fn test_credential_is_redacted() {
        let credential = Credential::new("  top-secret ").unwrap();
        assert_eq!(credential.expose(), "top-secret");
        assert_eq!(format!("{credential:?}"), "Credential(<redacted>)");
        assert!(Credential::new("").is_none());
        assert!(Credential::new(" \t").is_none());
    }

    #[test]
    fn test_url() {
        let mut config = GenerationConfig::default();
        config.set_model(ModelId::Pro25);
        let client = GeminiClient::new(&config).unwrap();

        assert_eq!(
            client.url(ModelId::Pro25),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-pro:generateContent"
        );
    }

    #[tokio::test]
    async fn test_missing_credential_makes_no_request() {
        let client = GeminiClient::new(&GenerationConfig::default()).unwrap();
        let prompt = Prompt::new("describe a school").unwrap();

        let result = client.generate(&prompt, ModelId::default(), None).await;
        assert_eq!(result, Err(GenerationError::MissingCredential));
    }
}
