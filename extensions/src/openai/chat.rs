use std::env;
use std::fmt;
use std::sync::Arc;

use futures::StreamExt;
use parley_core::chat::{validate_messages, ChatModel, GenerationError, Message, TokenCallback};
use reqwest::Client;
use tracing::{debug, instrument, warn};

use crate::retry::RetryPolicy;

use super::backend::CompletionBackend;
use super::error::OpenAiError;
use super::shared::{OpenAiConfig, SharedOpenAiClient};
use super::tokenizer::Tokenizer;
use super::types::{ChatCompletionChunk, ChatCompletionRequest};

pub const DEFAULT_OPENAI_CHAT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_TEMPERATURE: f32 = 0.0;

/// Context window reported for every model.
// TODO: look the window up per model instead of assuming the gpt-3 size.
pub const MAX_CONTEXT_LENGTH: usize = 2049;

const MODEL_ENV: &str = "OPENAI_MODEL";

// ============== Configuration ==============

/// Generation parameters fixed for the lifetime of an [`OpenAiChat`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOptions {
    pub model_name: String,
    /// Upper bound on generated reply length. Must be positive.
    pub max_tokens: u32,
    /// Sampling randomness, within `[0, 2]`.
    pub temperature: f32,
    /// Schedule for non-streaming calls. Streaming is never retried.
    pub retry: RetryPolicy,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_OPENAI_CHAT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            retry: RetryPolicy::default(),
        }
    }
}

impl ChatOptions {
    #[must_use]
    pub fn model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn validate(&self) -> Result<(), OpenAiError> {
        if self.model_name.trim().is_empty() {
            return Err(OpenAiError::InvalidConfiguration("Model name cannot be empty".to_string()));
        }
        if self.max_tokens == 0 {
            return Err(OpenAiError::InvalidConfiguration("max_tokens must be greater than 0".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(OpenAiError::InvalidConfiguration(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}

// ============== OpenAI Chat Adapter ==============

/// Chat adapter for the OpenAI chat-completions API.
///
/// Immutable once built; clones share the HTTP client and tokenizer.
#[derive(Clone)]
pub struct OpenAiChat {
    backend: Arc<dyn CompletionBackend>,
    options: ChatOptions,
    tokenizer: Tokenizer,
}

impl OpenAiChat {
    /// Creates an adapter with the default model and generation parameters.
    pub fn new(api_key: impl Into<String>) -> Result<Self, OpenAiError> {
        Self::new_with_options(api_key, ChatOptions::default())
    }

    pub fn new_with_options(api_key: impl Into<String>, options: ChatOptions) -> Result<Self, OpenAiError> {
        Self::new_with_config(OpenAiConfig::new(api_key)?, options, None)
    }

    /// Creates an adapter with custom connection settings.
    ///
    /// # Arguments
    /// * `config`: API key, base URL and timeout.
    /// * `options`: Model and generation parameters.
    /// * `client_override`: Optional custom `reqwest::Client` to use.
    pub fn new_with_config(
        config: OpenAiConfig,
        options: ChatOptions,
        client_override: Option<Client>,
    ) -> Result<Self, OpenAiError> {
        let shared_client = SharedOpenAiClient::new(config, client_override)?;
        Self::new_with_backend(Arc::new(shared_client), options)
    }

    /// Configures the adapter from `OPENAI_API_KEY`, `OPENAI_BASE_URL` and `OPENAI_MODEL`
    /// (a `.env` file is loaded first if present).
    pub fn from_env() -> Result<Self, OpenAiError> {
        let config = OpenAiConfig::from_env()?;
        Self::new_with_config(config, options_from_vars(|name| env::var(name).ok()), None)
    }

    /// Creates an adapter on top of any completion backend.
    #[instrument(name = "openai_chat_new", skip(backend), fields(model = %options.model_name))]
    pub fn new_with_backend(backend: Arc<dyn CompletionBackend>, options: ChatOptions) -> Result<Self, OpenAiError> {
        options.validate()?;
        let tokenizer = Tokenizer::for_model(&options.model_name)?;
        debug!(max_tokens = options.max_tokens, temperature = options.temperature, "OpenAiChat created.");
        Ok(Self { backend, options, tokenizer })
    }

    pub fn options(&self) -> &ChatOptions {
        &self.options
    }

    pub fn model_name(&self) -> &str {
        &self.options.model_name
    }

    fn build_request(&self, messages: &[Message], stream: bool) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.options.model_name.clone(),
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
            messages: messages.to_vec(),
            stream: stream.then_some(true),
        }
    }

    /// One attempt of [`ChatModel::generate`].
    async fn complete_once(&self, request: &ChatCompletionRequest) -> Result<String, GenerationError> {
        let response = self.backend.create(request).await?;
        let choice = response.choices.into_iter().next().ok_or_else(|| {
            warn!(response_id = %response.id, "OpenAI response contained no choices");
            GenerationError::from(OpenAiError::UnexpectedResponse("response contained no choices".to_string()))
        })?;
        if choice.message.content.is_none() {
            debug!(finish_reason = ?choice.finish_reason, "First choice carried no text content");
        }
        Ok(choice.message.content.unwrap_or_default())
    }
}

/// Default options, with the model taken from `OPENAI_MODEL` when it is set.
fn options_from_vars(var: impl Fn(&str) -> Option<String>) -> ChatOptions {
    match var(MODEL_ENV) {
        Some(model) if !model.trim().is_empty() => ChatOptions::default().model_name(model),
        _ => ChatOptions::default(),
    }
}

/// Streaming reports every provider failure as transient, whatever its status.
fn streaming_failure(err: OpenAiError) -> GenerationError {
    GenerationError::transient(&err)
}

impl fmt::Debug for OpenAiChat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiChat")
            .field("options", &self.options)
            .field("tokenizer", &self.tokenizer)
            .finish_non_exhaustive()
    }
}

impl ChatModel for OpenAiChat {
    type Chunk = ChatCompletionChunk;

    #[instrument(skip(self, messages), fields(model = %self.options.model_name, messages = messages.len()))]
    async fn generate(&self, messages: &[Message]) -> Result<String, GenerationError> {
        validate_messages(messages)?;
        let request = self.build_request(messages, false);
        let request = &request;
        let reply = self.options.retry.run(|| self.complete_once(request)).await?;
        debug!(reply_len = reply.len(), "Chat completion succeeded");
        Ok(reply)
    }

    #[instrument(skip(self, messages, on_token), fields(model = %self.options.model_name, messages = messages.len()))]
    async fn generate_streaming<C>(
        &self,
        messages: &[Message],
        mut on_token: C,
    ) -> Result<Vec<String>, GenerationError>
    where
        C: TokenCallback<Self::Chunk>,
    {
        validate_messages(messages)?;
        let request = self.build_request(messages, true);
        let mut stream = self.backend.create_stream(&request).await.map_err(streaming_failure)?;

        let mut result = Vec::new();
        let mut chunks = 0usize;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(streaming_failure)?;
            chunks += 1;
            if let Some(content) = chunk.content_delta() {
                result.push(content.to_string());
            }
            on_token.on_token(chunk).await;
        }
        debug!(chunks, fragments = result.len(), "Chat completion stream finished");
        Ok(result)
    }

    fn count_tokens(&self, text: &str) -> usize {
        self.tokenizer.count(text)
    }

    fn max_context_length(&self) -> usize {
        MAX_CONTEXT_LENGTH
    }
}
