//! Cache inspection handlers.

use crate::error::RpcResult;
use crate::server::AppState;
use serde_json::Value;
use tracing::info;

pub async fn cache_stats(state: &AppState, _params: &Value) -> RpcResult<Value> {
    Ok(serde_json::to_value(state.service.cache_stats())?)
}

pub async fn clear_cache(state: &AppState, _params: &Value) -> RpcResult<Value> {
    state.service.clear_caches();
    info!("Cleared all caches");
    Ok(Value::Null)
}
