//! Parameter extraction shared across handler domains.
//!
//! Every lookup accepts either the snake_case or the camelCase spelling.

use crate::error::{RpcError, RpcResult};
use serde::de::DeserializeOwned;
use serde_json::Value;

fn lookup<'a>(params: &'a Value, snake: &str, camel: &str) -> Option<&'a Value> {
    params
        .get(snake)
        .or_else(|| params.get(camel))
        .filter(|v| !v.is_null())
}

/// Extract an optional string parameter, supporting both snake_case and camelCase.
pub(crate) fn get_str_param<'a>(params: &'a Value, snake: &str, camel: &str) -> Option<&'a str> {
    lookup(params, snake, camel).and_then(|v| v.as_str())
}

/// Extract a required string parameter or return an error.
pub(crate) fn require_str_param(params: &Value, snake: &str, camel: &str) -> RpcResult<String> {
    get_str_param(params, snake, camel)
        .map(String::from)
        .ok_or_else(|| RpcError::invalid_params(format!("Missing required parameter: {}", snake)))
}

/// Extract an optional non-negative integer that fits in `u32`.
///
/// Present-but-malformed values are an error rather than silently ignored.
pub(crate) fn get_u32_param(params: &Value, snake: &str, camel: &str) -> RpcResult<Option<u32>> {
    match lookup(params, snake, camel) {
        None => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| {
                RpcError::invalid_params(format!("Parameter {} must be a non-negative integer", snake))
            }),
    }
}

pub(crate) fn require_u32_param(params: &Value, snake: &str, camel: &str) -> RpcResult<u32> {
    get_u32_param(params, snake, camel)?
        .ok_or_else(|| RpcError::invalid_params(format!("Missing required parameter: {}", snake)))
}

/// Deserialize an optional structured parameter.
pub(crate) fn get_typed_param<T: DeserializeOwned>(
    params: &Value,
    snake: &str,
    camel: &str,
) -> RpcResult<Option<T>> {
    lookup(params, snake, camel)
        .map(|v| {
            serde_json::from_value(v.clone()).map_err(|e| {
                RpcError::invalid_params(format!("Parameter {} is malformed: {}", snake, e))
            })
        })
        .transpose()
}
