use async_trait::async_trait;

use super::error::OpenAiError;
use super::stream::ChunkStream;
use super::types::{ChatCompletionRequest, ChatCompletionResponse};

/// The two calls [`OpenAiChat`](super::OpenAiChat) makes against the provider.
///
/// [`SharedOpenAiClient`](super::SharedOpenAiClient) talks HTTP; other implementations
/// can replay recorded responses or inject failures.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// One non-streaming chat completion.
    async fn create(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse, OpenAiError>;

    /// Opens a streaming chat completion. Errors that happen before the first chunk
    /// (connection, HTTP status) are returned here; later ones come through the stream.
    async fn create_stream(&self, request: &ChatCompletionRequest) -> Result<ChunkStream, OpenAiError>;
}
