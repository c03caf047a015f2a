//! OpenAI chat-completions adapter.
//!
//! [`OpenAiChat`] implements [`parley_core::chat::ChatModel`] on top of a
//! [`CompletionBackend`]; [`SharedOpenAiClient`] is the HTTP backend used in production.

mod backend;
mod chat;
mod error;
mod shared;
mod stream;
mod tokenizer;
mod types;

pub use backend::CompletionBackend;
pub use chat::{
    ChatOptions, OpenAiChat, DEFAULT_MAX_TOKENS, DEFAULT_OPENAI_CHAT_MODEL, DEFAULT_TEMPERATURE,
    MAX_CONTEXT_LENGTH,
};
pub use error::{OpenAiError, OpenAiErrorDetail, OpenAiErrorResponse};
pub use shared::{OpenAiConfig, SharedOpenAiClient};
pub use stream::ChunkStream;
pub use tokenizer::Tokenizer;
pub use types::{
    ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, Choice, ChunkChoice,
    ChunkDelta, ResponseMessage, Usage,
};
