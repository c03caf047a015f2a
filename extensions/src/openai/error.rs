use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use parley_core::chat::GenerationError;

// ============== OpenAI API Error Structures ==============

/// The error envelope returned by the OpenAI API, both as an HTTP error body and as an
/// in-stream event.
#[derive(Deserialize, Debug, Clone)]
pub struct OpenAiErrorResponse {
    pub error: OpenAiErrorDetail,
}

/// Details of an OpenAI API error.
#[derive(Deserialize, Debug, Clone)]
pub struct OpenAiErrorDetail {
    /// Developer-facing error message.
    pub message: String,
    /// Error class, e.g. "invalid_request_error".
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub param: Option<String>,
    /// Usually a string like "invalid_api_key", occasionally numeric.
    #[serde(default)]
    pub code: Option<serde_json::Value>,
}

// ============== Internal OpenAI Client Error Enum ==============

/// Every failure the OpenAI client can hit. Converted into [`GenerationError`] at the
/// `ChatModel` boundary.
#[derive(Error, Debug)]
pub enum OpenAiError {
    /// Error during network communication (sending request, reading response).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to serialize request body: {0}")]
    RequestSerialization(#[source] serde_json::Error),

    /// Error parsing a *successful* response body or stream event.
    #[error("Failed to parse response body ({context}): {source}")]
    ResponseParsing {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The API answered with a non-success status code.
    #[error("OpenAI API error: status={status}, message='{body_text}'")]
    ApiError {
        status: StatusCode,
        /// Parsed error details from the response body, if available.
        detail: Option<OpenAiErrorDetail>,
        /// Raw response body text.
        body_text: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A successful response that does not carry what the API contract promises.
    #[error("Unexpected response format or data: {0}")]
    UnexpectedResponse(String),

    /// The event stream broke or the provider reported an error inside it.
    #[error("Streaming error: {0}")]
    Streaming(String),
}

impl OpenAiError {
    /// The provider's own message for API errors, the raw body otherwise.
    fn api_message(detail: &Option<OpenAiErrorDetail>, body_text: &str) -> String {
        detail
            .as_ref()
            .map(|d| d.message.clone())
            .unwrap_or_else(|| body_text.to_string())
    }
}

// ============== Shared Error Mapping Logic ==============

/// Turns a non-success `reqwest::Response` into [`OpenAiError::ApiError`], parsing the
/// OpenAI error envelope when the body has one.
///
/// Returns [`OpenAiError::Network`] if the body cannot be read at all.
pub(crate) async fn map_response_error(response: reqwest::Response) -> OpenAiError {
    let status = response.status();
    debug_assert!(!status.is_success(), "map_response_error called with success status");

    match response.text().await {
        Ok(body_text) => match serde_json::from_str::<OpenAiErrorResponse>(&body_text) {
            Ok(parsed_error) => OpenAiError::ApiError {
                status,
                detail: Some(parsed_error.error),
                body_text,
            },
            Err(parse_err) => {
                warn!(
                    status = %status,
                    error = %parse_err,
                    body = %body_text,
                    "Failed to parse OpenAI error response JSON, returning raw body."
                );
                OpenAiError::ApiError {
                    status,
                    detail: None,
                    body_text,
                }
            }
        },
        Err(e) => {
            warn!(status = %status, error = %e, "Failed to read OpenAI error response body text.");
            OpenAiError::Network(e)
        }
    }
}

// ============== From<OpenAiError> for GenerationError ==============

impl From<OpenAiError> for GenerationError {
    fn from(err: OpenAiError) -> Self {
        match err {
            OpenAiError::ApiError { status, ref detail, ref body_text } => match status {
                StatusCode::BAD_REQUEST
                | StatusCode::NOT_FOUND
                | StatusCode::UNSUPPORTED_MEDIA_TYPE
                | StatusCode::UNPROCESSABLE_ENTITY => {
                    GenerationError::InvalidRequest(OpenAiError::api_message(detail, body_text))
                }
                // Fixed message; the provider detail is not carried over.
                StatusCode::UNAUTHORIZED => GenerationError::Authentication,
                _ => GenerationError::transient(&err),
            },
            OpenAiError::RequestSerialization(source) => {
                GenerationError::InvalidRequest(format!("Failed to serialize request: {}", source))
            }
            OpenAiError::InvalidConfiguration(msg) => GenerationError::Configuration(msg),
            OpenAiError::Network(_)
            | OpenAiError::ResponseParsing { .. }
            | OpenAiError::UnexpectedResponse(_)
            | OpenAiError::Streaming(_) => GenerationError::transient(&err),
        }
    }
}
