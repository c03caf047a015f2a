use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, instrument, trace};
use url::Url;

use super::backend::CompletionBackend;
use super::error::{map_response_error, OpenAiError};
use super::stream::{decode_chunks, ChunkStream};
use super::types::{ChatCompletionRequest, ChatCompletionResponse};

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const CHAT_COMPLETIONS_PATH: &str = "chat/completions";

pub(crate) const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub(crate) const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

/// Connection settings for the OpenAI API.
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// Sent as a bearer token on every request.
    pub(crate) api_key: SecretString,
    /// Root of the API, including the version segment.
    pub(crate) base_url: Url,
    /// Timeout for HTTP requests. Defaults to 60 seconds.
    pub(crate) timeout: Duration,
}

impl OpenAiConfig {
    /// Creates a configuration for the public OpenAI endpoint.
    ///
    /// # Errors
    /// Returns `OpenAiError::InvalidConfiguration` if the API key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self, OpenAiError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(OpenAiError::InvalidConfiguration("API key cannot be empty".to_string()));
        }

        let base_url = Url::parse(DEFAULT_OPENAI_BASE_URL)
            .map_err(|e| OpenAiError::InvalidConfiguration(
                format!("Internal error: Failed to parse default base URL: {}", e)
            ))?;

        Ok(Self {
            api_key: api_key.into(),
            base_url,
            timeout: Duration::from_secs(60),
        })
    }

    /// Reads `OPENAI_API_KEY` and, if set, `OPENAI_BASE_URL`, after loading a `.env`
    /// file when one is present.
    pub fn from_env() -> Result<Self, OpenAiError> {
        dotenv::dotenv().ok();
        Self::from_vars(|name| env::var(name).ok())
    }

    /// [`from_env`](Self::from_env) over an arbitrary variable lookup.
    pub(crate) fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, OpenAiError> {
        let api_key = var(API_KEY_ENV).ok_or_else(|| {
            OpenAiError::InvalidConfiguration(format!("{} environment variable not set", API_KEY_ENV))
        })?;
        let config = Self::new(api_key)?;
        match var(BASE_URL_ENV) {
            Some(url) if !url.trim().is_empty() => config.base_url(&url),
            _ => Ok(config),
        }
    }

    /// Points the client at another OpenAI-compatible endpoint.
    pub fn base_url(mut self, url: &str) -> Result<Self, OpenAiError> {
        let parsed = Url::parse(url)
            .map_err(|e| OpenAiError::InvalidConfiguration(
                format!("Invalid base URL '{}': {}", url, e)
            ))?;
        if parsed.cannot_be_a_base() {
            return Err(OpenAiError::InvalidConfiguration(format!("Base URL '{}' cannot have paths", url)));
        }
        self.base_url = parsed;
        Ok(self)
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn get_base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn get_timeout(&self) -> Duration {
        self.timeout
    }
}

/// HTTP client plus configuration; the production [`CompletionBackend`].
#[derive(Clone, Debug)]
pub struct SharedOpenAiClient {
    config: OpenAiConfig,
    http_client: Client,
}

impl SharedOpenAiClient {
    /// Builds a default reqwest client if one is not provided.
    #[instrument(name = "shared_openai_client_new", skip(config, client_override))]
    pub fn new(config: OpenAiConfig, client_override: Option<Client>) -> Result<Self, OpenAiError> {
        let client = match client_override {
            Some(client) => {
                debug!("Using provided HTTP client.");
                client
            },
            None => {
                debug!(timeout = ?config.timeout, "Building default HTTP client.");
                Client::builder()
                    .timeout(config.timeout)
                    .build()
                    .map_err(|e| OpenAiError::InvalidConfiguration(
                        format!("Failed to build default HTTP client: {}", e)
                    ))?
            }
        };

        debug!(base_url = %config.base_url, "Shared OpenAI client initialized.");
        Ok(Self { config, http_client: client })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    pub(crate) fn build_url(&self, relative_path: &str) -> Result<Url, OpenAiError> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| OpenAiError::InvalidConfiguration("Base URL cannot be a 'cannot-be-a-base' URL.".to_string()))?
            .pop_if_empty()
            .extend(relative_path.split('/'));
        trace!(built_url = %url, "Built OpenAI API URL");
        Ok(url)
    }

    /// Serializes `request` and posts it, mapping non-success statuses to `ApiError`.
    async fn post_completion(&self, request: &ChatCompletionRequest, accept: &str) -> Result<reqwest::Response, OpenAiError> {
        let url = self.build_url(CHAT_COMPLETIONS_PATH)?;
        debug!(%url, model = %request.model, stream = request.stream.unwrap_or(false), "Sending chat completion request to OpenAI");

        let request_json = serde_json::to_string(request).map_err(|e| {
            error!(error = %e, "Failed to serialize OpenAI chat completion request body");
            OpenAiError::RequestSerialization(e)
        })?;
        trace!(body = %request_json, "Constructed OpenAI request body JSON");

        let response = self.http_client
            .post(url)
            .bearer_auth(self.config.api_key.expose_secret())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, accept)
            .body(request_json)
            .send()
            .await
            .map_err(OpenAiError::Network)?;

        if !response.status().is_success() {
            let status = response.status();
            error!(%status, "OpenAI chat completion API returned error status");
            return Err(map_response_error(response).await);
        }
        Ok(response)
    }
}

#[async_trait]
impl CompletionBackend for SharedOpenAiClient {
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn create(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse, OpenAiError> {
        let response = self.post_completion(request, "application/json").await?;

        let raw_body = response.text().await.map_err(|e| {
            error!(error = %e, "Failed to read successful response body for chat completion");
            OpenAiError::Network(e)
        })?;
        trace!(body = %raw_body, "Received OpenAI chat completion response body");

        serde_json::from_str(&raw_body).map_err(|e| {
            error!(parse_error = %e, raw_body = %raw_body, "Failed to parse OpenAI chat completion JSON");
            OpenAiError::ResponseParsing {
                context: "Parsing chat completion".to_string(),
                source: e,
            }
        })
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn create_stream(&self, request: &ChatCompletionRequest) -> Result<ChunkStream, OpenAiError> {
        let response = self.post_completion(request, "text/event-stream").await?;
        debug!(status = %response.status(), "OpenAI stream opened");
        Ok(decode_chunks(response))
    }
}
