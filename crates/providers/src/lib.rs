//! LLM provider implementations.
//!
//! One implementation covers every backend in practice: the
//! OpenAI-compatible `/v1/chat/completions` surface.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
