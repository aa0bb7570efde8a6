//! Prompt read, write and compile handlers.

use super::shared::{
    get_str_param, get_typed_param, get_u32_param, require_str_param, require_u32_param,
};
use crate::error::{RpcError, RpcResult};
use crate::server::AppState;
use prompt_relay::template::variables_in;
use prompt_relay::validation::{
    validate_chat_messages, validate_generation_config, validate_label, validate_labels,
    validate_prompt_name, validate_tags, validate_text_prompt, validate_version,
};
use prompt_relay::{CreatePromptParams, LabelUpdate, ListPromptsQuery, PromptError};
use serde_json::{json, Map, Value};
use tracing::info;

/// Largest page size accepted for listings.
const MAX_PAGE_LIMIT: u32 = 100;

/// Largest number of items accepted in one batch label update.
const MAX_BATCH_UPDATES: usize = 100;

pub async fn list_prompts(state: &AppState, params: &Value) -> RpcResult<Value> {
    let page = get_u32_param(params, "page", "page")?;
    if page == Some(0) {
        return Err(PromptError::validation("page", "must be at least 1").into());
    }
    let limit = get_u32_param(params, "limit", "limit")?;
    if let Some(limit) = limit {
        if limit == 0 || limit > MAX_PAGE_LIMIT {
            return Err(PromptError::validation(
                "limit",
                format!("must be between 1 and {}", MAX_PAGE_LIMIT),
            )
            .into());
        }
    }

    let query = ListPromptsQuery {
        name: get_str_param(params, "name", "name").map(String::from),
        label: get_str_param(params, "label", "label").map(String::from),
        tag: get_str_param(params, "tag", "tag").map(String::from),
        page,
        limit,
    };
    let list = state.service.list_prompts(&query).await?;
    Ok(serde_json::to_value(list)?)
}

pub async fn get_prompt(state: &AppState, params: &Value) -> RpcResult<Value> {
    let (name, version, label) = prompt_selector(params)?;
    let prompt = state
        .service
        .get_prompt(&name, version, label.as_deref())
        .await?;
    Ok(serde_json::to_value(prompt)?)
}

pub async fn create_text_prompt(state: &AppState, params: &Value) -> RpcResult<Value> {
    let name = require_str_param(params, "name", "name")?;
    validate_prompt_name(&name)?;
    let text = require_str_param(params, "prompt", "prompt")?;
    validate_text_prompt(&text)?;

    let create = with_common_fields(CreatePromptParams::text(name, text), params)?;
    create_prompt(state, create).await
}

pub async fn create_chat_prompt(state: &AppState, params: &Value) -> RpcResult<Value> {
    let name = require_str_param(params, "name", "name")?;
    validate_prompt_name(&name)?;
    let raw = params
        .get("prompt")
        .or_else(|| params.get("messages"))
        .ok_or_else(|| RpcError::invalid_params("Missing required parameter: prompt"))?;
    let messages = validate_chat_messages(raw)?;

    let create = with_common_fields(CreatePromptParams::chat(name, &messages), params)?;
    create_prompt(state, create).await
}

pub async fn update_prompt_labels(state: &AppState, params: &Value) -> RpcResult<Value> {
    let name = require_str_param(params, "name", "name")?;
    validate_prompt_name(&name)?;
    let version = require_u32_param(params, "version", "version")?;
    validate_version(version)?;
    let labels: Vec<String> = get_typed_param(params, "labels", "labels")?
        .ok_or_else(|| RpcError::invalid_params("Missing required parameter: labels"))?;
    validate_labels(&labels)?;

    let updated = state
        .service
        .update_prompt_labels(&name, version, &labels)
        .await?;
    info!("Updated labels of {} v{}: {:?}", name, version, labels);
    Ok(serde_json::to_value(updated)?)
}

pub async fn batch_update_labels(state: &AppState, params: &Value) -> RpcResult<Value> {
    let updates: Vec<LabelUpdate> = get_typed_param(params, "updates", "updates")?
        .ok_or_else(|| RpcError::invalid_params("Missing required parameter: updates"))?;
    if updates.is_empty() {
        return Err(PromptError::validation("updates", "must contain at least one item").into());
    }
    if updates.len() > MAX_BATCH_UPDATES {
        return Err(PromptError::validation(
            "updates",
            format!("must contain at most {} items", MAX_BATCH_UPDATES),
        )
        .into());
    }
    // The whole batch is rejected before any request if one item is malformed.
    for (index, update) in updates.iter().enumerate() {
        validate_prompt_name(&update.name)
            .and_then(|_| validate_version(update.version))
            .and_then(|_| validate_labels(&update.labels))
            .map_err(|e| prefix_field(e, index))?;
    }

    let outcomes = state.service.batch_update_labels(&updates).await;
    let succeeded = outcomes.iter().filter(|o| o.result.is_ok()).count();
    info!(
        "Batch label update: {} of {} succeeded",
        succeeded,
        outcomes.len()
    );

    let results = outcomes
        .into_iter()
        .map(|outcome| match outcome.result {
            Ok(prompt) => Ok(json!({
                "name": outcome.name,
                "version": outcome.version,
                "success": true,
                "prompt": serde_json::to_value(prompt)?,
            })),
            Err(e) => {
                let error = RpcError::from(e);
                Ok(json!({
                    "name": outcome.name,
                    "version": outcome.version,
                    "success": false,
                    "error": {
                        "code": error.to_rpc_error_code(),
                        "message": error.to_string(),
                        "data": error.data(),
                    },
                }))
            }
        })
        .collect::<RpcResult<Vec<Value>>>()?;
    Ok(Value::Array(results))
}

pub async fn delete_prompt(state: &AppState, params: &Value) -> RpcResult<Value> {
    let name = require_str_param(params, "name", "name")?;
    validate_prompt_name(&name)?;
    let version = get_u32_param(params, "version", "version")?;
    if let Some(version) = version {
        validate_version(version)?;
    }

    state.service.delete_prompt(&name, version).await?;
    Ok(Value::Null)
}

pub async fn compile_prompt(state: &AppState, params: &Value) -> RpcResult<Value> {
    let (name, version, label) = prompt_selector(params)?;
    let variables: Map<String, Value> =
        get_typed_param(params, "variables", "variables")?.unwrap_or_default();

    let compiled = state
        .service
        .compile_prompt(&name, version, label.as_deref(), &variables)
        .await?;
    Ok(json!({
        "name": compiled.prompt.name,
        "version": compiled.prompt.version,
        "type": compiled.prompt.prompt_type,
        "unresolved": variables_in(&compiled.compiled),
        "prompt": serde_json::to_value(&compiled.compiled)?,
    }))
}

/// `name` plus an optional `version` or `label`.
fn prompt_selector(params: &Value) -> RpcResult<(String, Option<u32>, Option<String>)> {
    let name = require_str_param(params, "name", "name")?;
    validate_prompt_name(&name)?;
    let version = get_u32_param(params, "version", "version")?;
    if let Some(version) = version {
        validate_version(version)?;
    }
    let label = get_str_param(params, "label", "label").map(String::from);
    if let Some(label) = &label {
        validate_label(label)?;
    }
    Ok((name, version, label))
}

fn with_common_fields(
    mut create: CreatePromptParams,
    params: &Value,
) -> RpcResult<CreatePromptParams> {
    if let Some(config) = get_typed_param::<Value>(params, "config", "config")? {
        validate_generation_config(&config)?;
        create = create.with_config(config);
    }
    if let Some(labels) = get_typed_param::<Vec<String>>(params, "labels", "labels")? {
        validate_labels(&labels)?;
        create = create.with_labels(labels);
    }
    if let Some(tags) = get_typed_param::<Vec<String>>(params, "tags", "tags")? {
        validate_tags(&tags)?;
        create = create.with_tags(tags);
    }
    if let Some(message) = get_str_param(params, "commit_message", "commitMessage") {
        create = create.with_commit_message(message);
    }
    Ok(create)
}

async fn create_prompt(state: &AppState, create: CreatePromptParams) -> RpcResult<Value> {
    let created = state.service.create_prompt(&create).await?;
    info!(
        "Created {} prompt {} v{}",
        created.prompt_type.as_str(),
        created.name,
        created.version
    );
    Ok(serde_json::to_value(created)?)
}

fn prefix_field(error: PromptError, index: usize) -> PromptError {
    match error {
        PromptError::Validation { field, constraint } => PromptError::Validation {
            field: format!("updates[{}].{}", index, field),
            constraint,
        },
        other => other,
    }
}
