use std::future;
use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt, TryStreamExt};
use tracing::{error, trace};

use super::error::{OpenAiError, OpenAiErrorResponse};
use super::types::ChatCompletionChunk;

/// Chunks of a streamed completion, in the order the provider sent them.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk, OpenAiError>> + Send>>;

/// Payload of the event that closes an OpenAI stream.
const DONE_MARKER: &str = "[DONE]";

/// Decodes the server-sent events of a successful streaming response.
///
/// The stream ends at `data: [DONE]` (or when the connection closes). Empty events are
/// skipped; anything else that is not a chunk ends the stream with an error.
pub(crate) fn decode_chunks(response: reqwest::Response) -> ChunkStream {
    let chunks = response
        .bytes_stream()
        .eventsource()
        .map(|event| event.map_err(|e| OpenAiError::Streaming(e.to_string())))
        .try_take_while(|event| future::ready(Ok(event.data.trim() != DONE_MARKER)))
        .try_filter_map(|event| future::ready(parse_event(&event.data)));
    Box::pin(chunks)
}

/// Parses the `data` payload of one event. `Ok(None)` means there is nothing to deliver.
pub(crate) fn parse_event(data: &str) -> Result<Option<ChatCompletionChunk>, OpenAiError> {
    let data = data.trim();
    if data.is_empty() {
        return Ok(None);
    }
    trace!(data, "Received OpenAI stream event");

    // Checked first: an error envelope must not be mistaken for a sparse chunk.
    if let Ok(err) = serde_json::from_str::<OpenAiErrorResponse>(data) {
        error!(message = %err.error.message, "OpenAI reported an error mid-stream");
        return Err(OpenAiError::Streaming(err.error.message));
    }

    serde_json::from_str::<ChatCompletionChunk>(data)
        .map(Some)
        .map_err(|source| {
            error!(parse_error = %source, data, "Failed to parse OpenAI stream chunk");
            OpenAiError::ResponseParsing {
                context: "Parsing stream chunk".to_string(),
                source,
            }
        })
}
