use thiserror::Error;

/// The single error type surfaced by every [`ChatModel`](super::ChatModel) operation.
///
/// Callers distinguish causes by variant (or by the rendered message); there is no
/// separate numeric error code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The provider rejected the shape or parameters of the request, or the request
    /// failed validation before being sent.
    #[error("Error: {0}")]
    InvalidRequest(String),

    /// The configured credential was refused. The provider's own message is not kept.
    #[error("Error: The provided OpenAI api key is invalid")]
    Authentication,

    /// Anything else: network failures, rate limits, provider outages, undecodable
    /// responses, broken streams.
    #[error("Retrying LLM call {0}")]
    Transient(String),

    /// The adapter could not be constructed from the given parameters.
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl GenerationError {
    pub fn invalid_request(detail: impl Into<String>) -> Self {
        Self::InvalidRequest(detail.into())
    }

    pub fn transient(detail: impl std::fmt::Display) -> Self {
        Self::Transient(detail.to_string())
    }
}
