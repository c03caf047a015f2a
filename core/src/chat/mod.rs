// Implementation Notes:
//
//     Model Adapters:
//         Each provider gets an adapter struct implementing ChatModel (e.g. OpenAiChat in
//         parley_extensions). Transport, auth and payload encoding stay inside the adapter.
//
//     Context Management:
//         ChatModel does not trim or summarize transcripts. Callers use count_tokens and
//         max_context_length to decide what to send.

pub mod error;

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

pub use error::GenerationError;

/// A chat-completion backend.
///
/// Implementations hold fixed configuration and no per-call mutable state, so a single
/// instance can serve concurrent calls from many tasks.
pub trait ChatModel: Send + Sync {
    /// The raw fragment envelope handed to streaming callbacks.
    type Chunk: Send;

    /// Sends the whole transcript and returns the completed reply text.
    fn generate(&self, messages: &[Message]) -> impl Future<Output = Result<String, GenerationError>> + Send;

    /// Streams a reply, awaiting `on_token` once per fragment in provider order.
    ///
    /// Returns the text deltas of every fragment that carried one. Dropping the returned
    /// future cancels the stream; fragments collected so far are discarded.
    fn generate_streaming<C>(
        &self,
        messages: &[Message],
        on_token: C,
    ) -> impl Future<Output = Result<Vec<String>, GenerationError>> + Send
    where
        C: TokenCallback<Self::Chunk>;

    /// Number of tokens `text` encodes to with this model's tokenizer.
    fn count_tokens(&self, text: &str) -> usize;

    /// Upper bound on prompt plus reply tokens.
    fn max_context_length(&self) -> usize;
}

/// Receives streamed fragments. The stream does not advance until the returned future
/// completes.
pub trait TokenCallback<C>: Send {
    fn on_token(&mut self, chunk: C) -> impl Future<Output = ()> + Send;
}

impl<C, F, Fut> TokenCallback<C> for F
where
    F: FnMut(C) -> Fut + Send,
    Fut: Future<Output = ()> + Send,
{
    fn on_token(&mut self, chunk: C) -> impl Future<Output = ()> + Send {
        (self)(chunk)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system<T: Into<String>>(content: T) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
    pub fn user<T: Into<String>>(content: T) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
    pub fn assistant<T: Into<String>>(content: T) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        };
        f.write_str(role)
    }
}

/// Checks the preconditions shared by all generation calls.
pub fn validate_messages(messages: &[Message]) -> Result<(), GenerationError> {
    if messages.is_empty() {
        return Err(GenerationError::invalid_request("messages must not be empty"));
    }
    Ok(())
}
