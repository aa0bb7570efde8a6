//! Errors surfaced through the JSON-RPC layer.

use prompt_relay::PromptError;
use serde_json::{json, Map, Value};
use thiserror::Error;

pub type RpcResult<T> = std::result::Result<T, RpcError>;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Invalid params: {message}")]
    InvalidParams { message: String },

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RpcError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        RpcError::InvalidParams {
            message: message.into(),
        }
    }

    pub fn to_rpc_error_code(&self) -> i32 {
        match self {
            RpcError::InvalidParams { .. } => -32602,
            RpcError::MethodNotFound(_) => -32601,
            RpcError::Prompt(e) => e.to_rpc_error_code(),
            RpcError::Serialization(_) => -32603,
        }
    }

    /// Structured `error.data` so clients can branch without parsing text.
    pub fn data(&self) -> Value {
        let mut data = Map::new();
        match self {
            RpcError::InvalidParams { .. } => {
                data.insert("kind".into(), json!("invalid_params"));
            }
            RpcError::MethodNotFound(_) => {
                data.insert("kind".into(), json!("method_not_found"));
            }
            RpcError::Serialization(_) => {
                data.insert("kind".into(), json!("internal_error"));
            }
            RpcError::Prompt(e) => {
                data.insert("kind".into(), json!(e.kind()));
                match e {
                    PromptError::Api {
                        status, details, ..
                    } => {
                        data.insert("status".into(), json!(status));
                        if let Some(details) = details {
                            data.insert("details".into(), details.clone());
                        }
                    }
                    PromptError::Validation { field, .. } => {
                        data.insert("field".into(), json!(field));
                    }
                    PromptError::RateLimit { retry_after_secs } => {
                        data.insert("retryAfterSeconds".into(), json!(retry_after_secs));
                    }
                    PromptError::Authentication { .. } => {}
                }
            }
        }
        Value::Object(data)
    }
}
