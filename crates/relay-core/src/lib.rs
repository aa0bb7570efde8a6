//! Prompt Relay - resilient access to a remote prompt-management API.
//!
//! This crate provides the pieces a tool server needs to expose prompts to
//! tool-calling clients. It can be used programmatically without any RPC
//! layer; see the `prompt-relay-rpc` crate for the JSON-RPC front end.
//!
//! - [`PromptClient`]: authenticated, timeout-bounded, retrying HTTP client
//! - [`Cache`] / [`CacheRegistry`]: TTL caches shared by name, swept in the
//!   background, invalidated by pattern
//! - [`PromptService`]: the client wired to the caches
//!
//! # Example
//!
//! ```rust,ignore
//! use prompt_relay::{CacheDefaults, CacheRegistry, ClientConfig, PromptClient, PromptService};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = PromptClient::new(ClientConfig::new("pk-lf-...", "sk-lf-..."))?;
//!     let registry = CacheRegistry::with_sweeper(CacheDefaults::SWEEP_INTERVAL);
//!     let service = PromptService::new(Arc::new(client), registry.clone())?;
//!
//!     let prompt = service.get_prompt("greeting", None, Some("production")).await?;
//!     println!("{} v{}", prompt.name, prompt.version);
//!
//!     registry.shutdown();
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod network;
pub mod service;
pub mod template;
pub mod validation;

// Re-export commonly used types
pub use cache::{Cache, CacheConfig, CacheEntry, CacheRegistry, CacheStats, RegistryError};
pub use client::PromptClient;
pub use config::{CacheDefaults, ClientConfig, ClientDefaults};
pub use error::{PromptError, Result};
pub use models::{
    BatchLabelOutcome, ChatMessage, CreatePromptParams, LabelUpdate, ListPromptsQuery, PageMeta,
    PromptContent, PromptList, PromptMeta, PromptType, PromptVersion,
};
pub use service::{CompiledPrompt, PromptService};
