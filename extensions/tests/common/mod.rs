#![allow(dead_code)]

use std::collections::VecDeque;
use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parley_extensions::openai::{
    ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, ChunkStream,
    CompletionBackend, OpenAiError,
};
use serde_json::json;
use tokio::sync::oneshot;
use tokio::time::Instant;

// Helper to initialize tracing subscriber
pub fn setup_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

// Helper function to get API key or skip test
pub fn get_api_key_or_skip(var_name: &str, test_name: &str) -> Option<String> {
    dotenv::dotenv().ok(); // Load .env file if present

    // Check for api key in environment variables
    match env::var(var_name) {
        Ok(key) if !key.is_empty() => Some(key),
        _ => {
            println!("Skipping integration test {} - {} environment variable not set.", test_name, var_name);
            None // Signal to skip
        }
    }
}

pub fn completion(content: &str) -> ChatCompletionResponse {
    serde_json::from_value(json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "created": 1677652288,
        "model": "gpt-3.5-turbo-0613",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 9, "completion_tokens": 12, "total_tokens": 21 }
    }))
    .expect("valid completion fixture")
}

pub fn chunk(index: usize, delta: serde_json::Value, finish_reason: Option<&str>) -> ChatCompletionChunk {
    serde_json::from_value(json!({
        "id": "chatcmpl-456",
        "object": "chat.completion.chunk",
        "created": 1694268190 + index,
        "model": "gpt-3.5-turbo-0613",
        "choices": [{ "index": 0, "delta": delta, "finish_reason": finish_reason }]
    }))
    .expect("valid chunk fixture")
}

/// The usual shape of a streamed reply: a role-only chunk, one chunk per text piece and a
/// closing chunk with an empty delta.
pub fn scripted_reply(pieces: &[&str]) -> Vec<ChatCompletionChunk> {
    let mut chunks = vec![chunk(0, json!({ "role": "assistant", "content": null }), None)];
    for (i, piece) in pieces.iter().enumerate() {
        chunks.push(chunk(i + 1, json!({ "content": piece }), None));
    }
    chunks.push(chunk(pieces.len() + 1, json!({}), Some("stop")));
    chunks
}

/// How a scripted stream ends after its chunks are delivered.
pub enum StreamEnd {
    Complete,
    Fail(OpenAiError),
    /// The next chunk never arrives.
    Stall,
    /// `rest` is delivered once `gate` fires (or its sender is dropped).
    Gated {
        gate: oneshot::Receiver<()>,
        rest: Vec<ChatCompletionChunk>,
    },
}

/// Replays canned results instead of calling the network.
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<ChatCompletionResponse, OpenAiError>>>,
    stream: Mutex<Option<(Vec<ChatCompletionChunk>, StreamEnd)>>,
    calls: AtomicUsize,
    call_times: Mutex<Vec<Instant>>,
    requests: Mutex<Vec<ChatCompletionRequest>>,
}

impl ScriptedBackend {
    pub fn with_responses(responses: Vec<Result<ChatCompletionResponse, OpenAiError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            stream: Mutex::new(None),
            calls: AtomicUsize::new(0),
            call_times: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_stream(chunks: Vec<ChatCompletionChunk>, end: StreamEnd) -> Self {
        let backend = Self::with_responses(Vec::new());
        *backend.stream.lock().unwrap() = Some((chunks, end));
        backend
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<ChatCompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, request: &ChatCompletionRequest) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.call_times.lock().unwrap().push(Instant::now());
        self.requests.lock().unwrap().push(request.clone());
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn create(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse, OpenAiError> {
        self.record(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(OpenAiError::UnexpectedResponse("script exhausted".to_string())))
    }

    async fn create_stream(&self, request: &ChatCompletionRequest) -> Result<ChunkStream, OpenAiError> {
        self.record(request);
        let (chunks, end) = self
            .stream
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| OpenAiError::UnexpectedResponse("no stream scripted".to_string()))?;

        let delivered = stream::iter(chunks.into_iter().map(Ok::<_, OpenAiError>));
        let scripted: ChunkStream = match end {
            StreamEnd::Complete => Box::pin(delivered),
            StreamEnd::Fail(err) => Box::pin(delivered.chain(stream::once(async move { Err(err) }))),
            StreamEnd::Stall => Box::pin(delivered.chain(stream::pending())),
            StreamEnd::Gated { gate, rest } => {
                let rest = stream::once(async move {
                    let _ = gate.await;
                    stream::iter(rest.into_iter().map(Ok::<_, OpenAiError>))
                })
                .flatten();
                Box::pin(delivered.chain(rest))
            }
        };
        Ok(scripted)
    }
}
