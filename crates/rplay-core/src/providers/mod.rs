//! Direct completion tier
//!
//! The stateless fallback behind the managed agents. Providers implement
//! [`CompletionProvider`] so the router can be driven by test doubles.

pub mod openai;
pub mod types;

pub use openai::OpenAiProvider;
pub use types::{CompletionOptions, CompletionProvider};
