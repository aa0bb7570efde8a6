//! Response shaping for tool clients.
//!
//! Handlers return the raw domain value. Clients expect
//! `{success: true, <key>: ...}`, so each method names the key its payload
//! lands under.

use serde_json::{json, Value};

pub fn wrap_response(method: &str, result: Value) -> Value {
    match method {
        "list_prompts" => {
            json!({
                "success": true,
                "prompts": result.get("data").cloned().unwrap_or_else(|| json!([])),
                "meta": result.get("meta").cloned().unwrap_or(Value::Null)
            })
        }

        "get_prompt"
        | "create_text_prompt"
        | "create_chat_prompt"
        | "update_prompt_labels" => {
            json!({
                "success": true,
                "prompt": result
            })
        }

        "batch_update_labels" => {
            json!({
                "success": true,
                "results": if result.is_null() { json!([]) } else { result }
            })
        }

        "compile_prompt" => {
            json!({
                "success": true,
                "compiled": result
            })
        }

        "cache_stats" => {
            json!({
                "success": true,
                "caches": if result.is_null() { json!([]) } else { result }
            })
        }

        "clear_cache" => json!({ "success": true }),

        // Default: return as-is
        _ => result,
    }
}
