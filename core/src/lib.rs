//! Core types for Parley: the provider-agnostic chat interface.
//!
//! Provider implementations live in `parley_extensions`. This crate only defines
//! what a chat model looks like from the caller's side.

pub mod chat;
