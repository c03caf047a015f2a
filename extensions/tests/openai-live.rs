//! Live calls against the OpenAI API. Run with `--ignored` and `OPENAI_API_KEY` set.

mod common;

use std::sync::{Arc, Mutex};

use parley_core::chat::{ChatModel, Message};
use parley_extensions::openai::{ChatCompletionChunk, ChatOptions, OpenAiChat};

use common::{get_api_key_or_skip, setup_tracing};

#[tokio::test]
#[ignore]
async fn live_generate() {
    setup_tracing();
    let Some(api_key) = get_api_key_or_skip("OPENAI_API_KEY", "live_generate") else {
        return;
    };
    let chat = OpenAiChat::new_with_options(api_key, ChatOptions::default().max_tokens(16)).unwrap();

    let reply = chat
        .generate(&[
            Message::system("Reply with a single word."),
            Message::user("What colour is the sky on a clear day?"),
        ])
        .await
        .unwrap();

    println!("Reply: {reply}");
    assert!(!reply.trim().is_empty());
}

#[tokio::test]
#[ignore]
async fn live_generate_streaming() {
    setup_tracing();
    let Some(api_key) = get_api_key_or_skip("OPENAI_API_KEY", "live_generate_streaming") else {
        return;
    };
    let chat = OpenAiChat::new_with_options(api_key, ChatOptions::default().max_tokens(32)).unwrap();

    let chunks = Arc::new(Mutex::new(0usize));
    let counter = chunks.clone();
    let fragments = chat
        .generate_streaming(&[Message::user("Count from one to five.")], move |_chunk: ChatCompletionChunk| {
            *counter.lock().unwrap() += 1;
            std::future::ready(())
        })
        .await
        .unwrap();

    println!("Streamed: {}", fragments.concat());
    assert!(!fragments.is_empty());
    assert!(*chunks.lock().unwrap() >= fragments.len());
}
