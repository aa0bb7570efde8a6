//! Upstream prompt entities and request payloads.
//!
//! Field names follow the upstream wire format (camelCase).

use crate::error::PromptError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Prompt flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptType {
    Text,
    Chat,
}

impl PromptType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptType::Text => "text",
            PromptType::Chat => "chat",
        }
    }
}

impl fmt::Display for PromptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message of a chat prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Prompt body: a single template string or a list of chat messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PromptContent {
    Text(String),
    Chat(Vec<ChatMessage>),
}

impl PromptContent {
    pub fn prompt_type(&self) -> PromptType {
        match self {
            PromptContent::Text(_) => PromptType::Text,
            PromptContent::Chat(_) => PromptType::Chat,
        }
    }
}

/// A single version of a prompt, uniquely identified by `(name, version)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptVersion {
    pub name: String,
    pub version: u32,
    #[serde(rename = "type")]
    pub prompt_type: PromptType,
    pub prompt: PromptContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Listing summary for one prompt name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptMeta {
    pub name: String,
    #[serde(default)]
    pub versions: Vec<u32>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<DateTime<Utc>>,
}

/// Pagination metadata returned with listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
    pub total_items: u32,
}

/// One page of prompt summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptList {
    pub data: Vec<PromptMeta>,
    pub meta: PageMeta,
}

/// Filters for a listing call. Absent fields are omitted from the query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListPromptsQuery {
    pub name: Option<String>,
    pub label: Option<String>,
    pub tag: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListPromptsQuery {
    /// Present parameters as query pairs, in a stable order.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(name) = &self.name {
            pairs.push(("name", name.clone()));
        }
        if let Some(label) = &self.label {
            pairs.push(("label", label.clone()));
        }
        if let Some(tag) = &self.tag {
            pairs.push(("tag", tag.clone()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

/// Payload for creating a new prompt version.
///
/// `prompt` stays a raw JSON value so its shape can be checked against
/// `prompt_type` before anything is sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePromptParams {
    pub name: String,
    #[serde(rename = "type")]
    pub prompt_type: PromptType,
    pub prompt: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
}

impl CreatePromptParams {
    pub fn text(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt_type: PromptType::Text,
            prompt: Value::String(prompt.into()),
            config: None,
            labels: Vec::new(),
            tags: Vec::new(),
            commit_message: None,
        }
    }

    pub fn chat(name: impl Into<String>, messages: &[ChatMessage]) -> Self {
        let prompt = Value::Array(
            messages
                .iter()
                .map(|m| serde_json::json!({"role": m.role, "content": m.content}))
                .collect(),
        );
        Self {
            name: name.into(),
            prompt_type: PromptType::Chat,
            prompt,
            config: None,
            labels: Vec::new(),
            tags: Vec::new(),
            commit_message: None,
        }
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_commit_message(mut self, message: impl Into<String>) -> Self {
        self.commit_message = Some(message.into());
        self
    }

    /// Check that the content shape agrees with the declared type.
    pub fn check_content_shape(&self) -> Result<(), PromptError> {
        match self.prompt_type {
            PromptType::Chat if !self.prompt.is_array() => Err(PromptError::validation(
                "prompt",
                "chat prompts require an array of messages",
            )),
            PromptType::Text if !self.prompt.is_string() => Err(PromptError::validation(
                "prompt",
                "text prompts require a string",
            )),
            _ => Ok(()),
        }
    }
}

/// One entry of a batch label update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelUpdate {
    pub name: String,
    pub version: u32,
    pub labels: Vec<String>,
}

impl LabelUpdate {
    pub fn new(name: impl Into<String>, version: u32, labels: Vec<String>) -> Self {
        Self {
            name: name.into(),
            version,
            labels,
        }
    }
}

/// Per-item result of a batch label update.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchLabelOutcome {
    pub name: String,
    pub version: u32,
    pub result: Result<PromptVersion, PromptError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prompt_version_from_wire() {
        let version: PromptVersion = serde_json::from_value(json!({
            "name": "greeting",
            "version": 2,
            "type": "chat",
            "prompt": [{"role": "system", "content": "Be kind to {{user}}"}],
            "labels": ["production"],
            "tags": ["onboarding"],
            "commitMessage": "tone down",
            "createdAt": "2024-05-01T10:00:00Z",
            "updatedAt": "2024-05-02T10:00:00.000Z"
        }))
        .unwrap();

        assert_eq!(version.prompt_type, PromptType::Chat);
        assert_eq!(
            version.prompt,
            PromptContent::Chat(vec![ChatMessage::new("system", "Be kind to {{user}}")])
        );
        assert_eq!(version.commit_message.as_deref(), Some("tone down"));
        assert!(version.created_at.is_some());
    }

    #[test]
    fn test_prompt_list_from_wire() {
        let list: PromptList = serde_json::from_value(json!({
            "data": [{"name": "greeting", "versions": [1, 2], "labels": ["latest"], "tags": []}],
            "meta": {"page": 1, "limit": 50, "totalPages": 1, "totalItems": 1}
        }))
        .unwrap();
        assert_eq!(list.data[0].versions, vec![1, 2]);
        assert_eq!(list.meta.total_items, 1);
    }

    #[test]
    fn test_query_pairs_skip_absent_fields() {
        let query = ListPromptsQuery {
            label: Some("production".to_string()),
            limit: Some(10),
            ..Default::default()
        };
        assert_eq!(
            query.to_pairs(),
            vec![("label", "production".to_string()), ("limit", "10".to_string())]
        );
        assert!(ListPromptsQuery::default().to_pairs().is_empty());
    }

    #[test]
    fn test_content_shape_check() {
        assert!(CreatePromptParams::text("a", "hello").check_content_shape().is_ok());
        assert!(CreatePromptParams::chat("a", &[ChatMessage::new("user", "hi")])
            .check_content_shape()
            .is_ok());

        let mut mismatched = CreatePromptParams::text("a", "hello");
        mismatched.prompt_type = PromptType::Chat;
        assert_eq!(
            mismatched.check_content_shape().unwrap_err().kind(),
            "validation_error"
        );

        let mut mismatched = CreatePromptParams::chat("a", &[]);
        mismatched.prompt_type = PromptType::Text;
        assert!(mismatched.check_content_shape().is_err());
    }

    #[test]
    fn test_create_params_wire_names() {
        let params = CreatePromptParams::text("greeting", "Hi {{name}}")
            .with_commit_message("first")
            .with_labels(vec!["staging".to_string()]);
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["type"], "text");
        assert_eq!(value["commitMessage"], "first");
        assert!(value.get("config").is_none());
    }
}
