//! `{{variable}}` substitution for prompt content.

use crate::models::{ChatMessage, PromptContent};
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap());

/// Substitute placeholders in a template string.
///
/// String values are inserted verbatim, other JSON values in their compact
/// JSON form. Placeholders without a matching variable are left as written.
pub fn compile_text(template: &str, variables: &Map<String, Value>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match variables.get(&caps[1]) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Substitute placeholders in a text prompt or in every chat message.
pub fn compile(content: &PromptContent, variables: &Map<String, Value>) -> PromptContent {
    match content {
        PromptContent::Text(text) => PromptContent::Text(compile_text(text, variables)),
        PromptContent::Chat(messages) => PromptContent::Chat(
            messages
                .iter()
                .map(|m| ChatMessage::new(m.role.clone(), compile_text(&m.content, variables)))
                .collect(),
        ),
    }
}

/// Distinct placeholder names, sorted.
pub fn variables_in(content: &PromptContent) -> Vec<String> {
    let mut names = BTreeSet::new();
    let mut collect = |text: &str| {
        for caps in PLACEHOLDER.captures_iter(text) {
            names.insert(caps[1].to_string());
        }
    };
    match content {
        PromptContent::Text(text) => collect(text),
        PromptContent::Chat(messages) => messages.iter().for_each(|m| collect(&m.content)),
    }
    names.into_iter().collect()
}
