//! Centralized configuration for the prompt relay.
//!
//! Constant holders for client and cache defaults, plus the immutable
//! [`ClientConfig`] handed to [`crate::PromptClient`].

use std::fmt;
use std::time::Duration;

/// Defaults for the upstream API client.
pub struct ClientDefaults;

impl ClientDefaults {
    pub const BASE_URL: &'static str = "https://cloud.langfuse.com";
    pub const API_PATH: &'static str = "/api/public/v2";
    pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(30_000);
    pub const MAX_RETRIES: u32 = 3;
    pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(1_000);
    pub const RATE_LIMIT_RETRY_AFTER_SECS: u64 = 60;
    pub const BATCH_CONCURRENCY: usize = 5;
    pub const USER_AGENT: &'static str = "prompt-relay/0.3";
}

/// Defaults for the shared caches.
pub struct CacheDefaults;

impl CacheDefaults {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(300);
    pub const PROMPT_TTL: Duration = Duration::from_secs(300);
    pub const LIST_TTL: Duration = Duration::from_secs(60);
    pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
    /// Shorter sweep intervals, including zero, are raised to this.
    pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);
    pub const PROMPTS_CACHE: &'static str = "prompts";
    pub const LISTS_CACHE: &'static str = "prompt-lists";
}

/// Connection settings for the upstream prompt API.
///
/// Immutable once a client has been built from it.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub public_key: String,
    pub secret_key: String,
    pub base_url: String,
    pub request_timeout: Duration,
    pub max_retries: u32,
}

impl ClientConfig {
    /// Create a config with default URL, timeout and retry budget.
    pub fn new(public_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            secret_key: secret_key.into(),
            base_url: ClientDefaults::BASE_URL.to_string(),
            request_timeout: ClientDefaults::REQUEST_TIMEOUT,
            max_retries: ClientDefaults::MAX_RETRIES,
        }
    }

    /// Set the base URL (scheme and host, without the API path).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the per-attempt request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set how many retries follow the first attempt.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

// Keep the secret out of logs.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("public_key", &self.public_key)
            .field("secret_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}
