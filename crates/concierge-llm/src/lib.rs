//! Shared LLM provider abstraction used by the intent classifier, the FAQ
//! handler's grounded-answer generator, the email draft generator, and the
//! ticket triage step.
//!
//! Generalized from `skynet-agent::provider`/`router`: a single `LlmProvider`
//! trait, a concrete OpenAI-compatible HTTP client, and a deterministic
//! fixture provider for tests.

mod fixture;
mod openai_compat;
mod provider;

pub use fixture::FixtureProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use provider::{ChatRequest, ChatResponse, LlmProvider, Message, ProviderError, Role};
