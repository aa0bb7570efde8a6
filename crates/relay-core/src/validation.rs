//! Field-level checks for tool inputs.
//!
//! Everything here runs before a request is built, so a rejected input never
//! reaches the upstream. Failures are [`PromptError::Validation`] values
//! naming the offending field.

use crate::error::{PromptError, Result};
use crate::models::ChatMessage;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

pub const MAX_NAME_LENGTH: usize = 255;
pub const MAX_LABEL_LENGTH: usize = 36;
pub const MAX_TAG_LENGTH: usize = 64;
pub const CHAT_ROLES: [&str; 5] = ["system", "developer", "user", "assistant", "tool"];

/// Labels the upstream manages itself.
const RESERVED_LABELS: [&str; 1] = ["latest"];

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-/]*$").unwrap());

static LABEL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9_.\-]*$").unwrap());

/// Prompt names: alphanumeric start, then letters, digits, `_ . - /`.
pub fn validate_prompt_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(PromptError::validation("name", "must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(PromptError::validation(
            "name",
            format!("must be at most {} characters", MAX_NAME_LENGTH),
        ));
    }
    if !NAME_PATTERN.is_match(name) {
        return Err(PromptError::validation(
            "name",
            "must start with a letter or digit and contain only letters, digits, '_', '.', '-' or '/'",
        ));
    }
    Ok(())
}

/// Labels: lowercase alphanumeric start, then `a-z 0-9 _ . -`.
pub fn validate_label(label: &str) -> Result<()> {
    if label.is_empty() || label.len() > MAX_LABEL_LENGTH {
        return Err(PromptError::validation(
            "labels",
            format!("each label must be 1-{} characters", MAX_LABEL_LENGTH),
        ));
    }
    if !LABEL_PATTERN.is_match(label) {
        return Err(PromptError::validation(
            "labels",
            format!(
                "label {:?} must be lowercase letters, digits, '_', '.' or '-'",
                label
            ),
        ));
    }
    Ok(())
}

/// Labels to assign. `latest` is managed upstream and rejected; duplicates
/// are rejected so the replacement set is unambiguous.
pub fn validate_labels(labels: &[String]) -> Result<()> {
    for (index, label) in labels.iter().enumerate() {
        validate_label(label)?;
        if RESERVED_LABELS.contains(&label.as_str()) {
            return Err(PromptError::validation(
                "labels",
                format!("label {:?} is reserved", label),
            ));
        }
        if labels[..index].contains(label) {
            return Err(PromptError::validation(
                "labels",
                format!("label {:?} is listed twice", label),
            ));
        }
    }
    Ok(())
}

pub fn validate_tags(tags: &[String]) -> Result<()> {
    for tag in tags {
        if tag.trim().is_empty() || tag.chars().count() > MAX_TAG_LENGTH {
            return Err(PromptError::validation(
                "tags",
                format!("each tag must be 1-{} non-blank characters", MAX_TAG_LENGTH),
            ));
        }
        if tag.chars().any(char::is_control) {
            return Err(PromptError::validation(
                "tags",
                format!("tag {:?} contains control characters", tag),
            ));
        }
    }
    Ok(())
}

pub fn validate_version(version: u32) -> Result<()> {
    if version == 0 {
        return Err(PromptError::validation("version", "must be at least 1"));
    }
    Ok(())
}

pub fn validate_text_prompt(prompt: &str) -> Result<()> {
    if prompt.trim().is_empty() {
        return Err(PromptError::validation("prompt", "must not be empty"));
    }
    Ok(())
}

/// Parse and check a chat prompt: a non-empty array of `{role, content}`
/// objects with a known role and non-empty content.
pub fn validate_chat_messages(value: &Value) -> Result<Vec<ChatMessage>> {
    let items = value
        .as_array()
        .ok_or_else(|| PromptError::validation("prompt", "must be an array of chat messages"))?;
    if items.is_empty() {
        return Err(PromptError::validation(
            "prompt",
            "must contain at least one message",
        ));
    }

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let field = format!("prompt[{}]", index);
            let role = item
                .get("role")
                .and_then(Value::as_str)
                .ok_or_else(|| PromptError::validation(&field, "role must be a string"))?;
            if !CHAT_ROLES.contains(&role) {
                return Err(PromptError::validation(
                    &field,
                    format!("role must be one of {}", CHAT_ROLES.join(", ")),
                ));
            }
            let content = item
                .get("content")
                .and_then(Value::as_str)
                .ok_or_else(|| PromptError::validation(&field, "content must be a string"))?;
            if content.trim().is_empty() {
                return Err(PromptError::validation(&field, "content must not be empty"));
            }
            Ok(ChatMessage::new(role, content))
        })
        .collect()
}

/// Range checks on the generation parameters commonly stored in a prompt's
/// config. Unknown keys pass through untouched.
pub fn validate_generation_config(config: &Value) -> Result<()> {
    let object = config
        .as_object()
        .ok_or_else(|| PromptError::validation("config", "must be a JSON object"))?;

    check_range(object.get("temperature"), "config.temperature", 0.0, 2.0)?;
    check_range(object.get("top_p"), "config.top_p", 0.0, 1.0)?;
    check_range(
        object.get("presence_penalty"),
        "config.presence_penalty",
        -2.0,
        2.0,
    )?;
    check_range(
        object.get("frequency_penalty"),
        "config.frequency_penalty",
        -2.0,
        2.0,
    )?;

    if let Some(value) = object.get("max_tokens") {
        match value.as_u64() {
            Some(n) if n >= 1 => {}
            _ => {
                return Err(PromptError::validation(
                    "config.max_tokens",
                    "must be a positive integer",
                ))
            }
        }
    }
    Ok(())
}

fn check_range(value: Option<&Value>, field: &str, min: f64, max: f64) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    match value.as_f64() {
        Some(n) if (min..=max).contains(&n) => Ok(()),
        _ => Err(PromptError::validation(
            field,
            format!("must be a number between {} and {}", min, max),
        )),
    }
}
