//! LLM Provider Clients
//!
//! Every workflow node that talks to a model does so through [`LLMClient`].
//! The concrete client is chosen from `[llm]` in `graphflow.toml`:
//!
//! - `ollama` - Local Ollama server (default feature)
//! - `openai` - OpenAI API or a compatible endpoint
//!
//! # Example
//!
//! ```ignore
//! use graphflow::llm::LLMClientFactory;
//!
//! let factory = LLMClientFactory::from_config(&config.llm)?;
//! let client = factory.create_default().await?;
//! let answer = client.generate_with_system("Prompt: be brief", "What is 2+2?").await?;
//! ```

/// Core LLM client trait and provider selection.
pub mod client;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{LLMClient, LLMClientFactory, Provider};
