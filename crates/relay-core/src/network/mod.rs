//! Network utilities for upstream HTTP calls.
//!
//! This module provides:
//! - Retry logic with exponential backoff
//! - The transport seam the client sends requests through

mod retry;
mod transport;

pub use retry::{retry_async, RetryConfig, RetryStats};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};
