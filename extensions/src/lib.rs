//! Provider adapters implementing [`parley_core::chat::ChatModel`].

pub mod openai;
pub mod retry;
