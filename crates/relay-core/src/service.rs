//! Cache-aware prompt operations.
//!
//! [`PromptService`] is the caller side of the client: it consults the
//! shared caches before reading, stores what it fetched with an
//! operation-specific TTL, and evicts affected entries after every write.
//! Concurrent misses on the same key each go to the network. A fetch only
//! fills the cache if no invalidation ran while it was in flight, so a read
//! that overlaps a write cannot restore the version the write replaced.

use crate::cache::{Cache, CacheConfig, CacheRegistry, CacheStats, RegistryError};
use crate::client::PromptClient;
use crate::config::CacheDefaults;
use crate::error::Result;
use crate::models::{
    BatchLabelOutcome, CreatePromptParams, LabelUpdate, ListPromptsQuery, PromptContent,
    PromptList, PromptVersion,
};
use crate::template;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// A fetched prompt with its placeholders filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPrompt {
    pub prompt: PromptVersion,
    pub compiled: PromptContent,
}

/// Prompt operations fronted by the shared caches.
pub struct PromptService {
    client: Arc<PromptClient>,
    registry: Arc<CacheRegistry>,
    prompts: Arc<Cache<PromptVersion>>,
    lists: Arc<Cache<PromptList>>,
}

impl PromptService {
    pub fn new(
        client: Arc<PromptClient>,
        registry: Arc<CacheRegistry>,
    ) -> std::result::Result<Self, RegistryError> {
        let prompts = registry.get_or_create(
            CacheDefaults::PROMPTS_CACHE,
            Some(CacheConfig::default().with_default_ttl(CacheDefaults::PROMPT_TTL)),
        )?;
        let lists = registry.get_or_create(
            CacheDefaults::LISTS_CACHE,
            Some(CacheConfig::default().with_default_ttl(CacheDefaults::LIST_TTL)),
        )?;
        Ok(Self {
            client,
            registry,
            prompts,
            lists,
        })
    }

    pub fn client(&self) -> &PromptClient {
        &self.client
    }

    pub fn registry(&self) -> &Arc<CacheRegistry> {
        &self.registry
    }

    pub async fn list_prompts(&self, query: &ListPromptsQuery) -> Result<PromptList> {
        let key = list_cache_key(query);
        if let Some(hit) = self.lists.get(&key) {
            debug!("Cache hit: {}", key);
            return Ok(hit);
        }

        let generation = self.lists.generation();
        let list = self.client.list_prompts(query).await?;
        if !self
            .lists
            .set_if_generation(&key, list.clone(), Some(CacheDefaults::LIST_TTL), generation)
        {
            debug!("Not caching {}: invalidated while fetching", key);
        }
        Ok(list)
    }

    pub async fn get_prompt(
        &self,
        name: &str,
        version: Option<u32>,
        label: Option<&str>,
    ) -> Result<PromptVersion> {
        let key = prompt_cache_key(name, version, label);
        if let Some(hit) = self.prompts.get(&key) {
            debug!("Cache hit: {}", key);
            return Ok(hit);
        }

        let generation = self.prompts.generation();
        let prompt = self.client.get_prompt(name, version, label).await?;
        if !self.prompts.set_if_generation(
            &key,
            prompt.clone(),
            Some(CacheDefaults::PROMPT_TTL),
            generation,
        ) {
            debug!("Not caching {}: invalidated while fetching", key);
        }
        Ok(prompt)
    }

    pub async fn create_prompt(&self, params: &CreatePromptParams) -> Result<PromptVersion> {
        let created = self.client.create_prompt(params).await?;
        self.invalidate_prompt(&params.name);
        Ok(created)
    }

    pub async fn update_prompt_labels(
        &self,
        name: &str,
        version: u32,
        labels: &[String],
    ) -> Result<PromptVersion> {
        let updated = self.client.update_prompt_labels(name, version, labels).await?;
        // Labels move between versions, so every cached selector for this
        // name may now be stale.
        self.invalidate_prompt(name);
        Ok(updated)
    }

    pub async fn batch_update_labels(&self, updates: &[LabelUpdate]) -> Vec<BatchLabelOutcome> {
        let outcomes = self.client.batch_update_labels(updates).await;
        let touched: BTreeSet<&str> = outcomes
            .iter()
            .filter(|o| o.result.is_ok())
            .map(|o| o.name.as_str())
            .collect();
        for name in touched {
            self.invalidate_prompt(name);
        }
        outcomes
    }

    pub async fn delete_prompt(&self, name: &str, version: Option<u32>) -> Result<()> {
        self.client.delete_prompt(name, version).await
    }

    /// Fetch (through the cache) and fill in placeholders.
    pub async fn compile_prompt(
        &self,
        name: &str,
        version: Option<u32>,
        label: Option<&str>,
        variables: &Map<String, Value>,
    ) -> Result<CompiledPrompt> {
        let prompt = self.get_prompt(name, version, label).await?;
        let compiled = template::compile(&prompt.prompt, variables);
        Ok(CompiledPrompt { prompt, compiled })
    }

    /// Evict every cached read that could mention `name`.
    pub fn invalidate_prompt(&self, name: &str) {
        let removed = self.prompts.invalidate_pattern(&prompt_key_pattern(name));
        self.lists.clear();
        debug!("Invalidated {} cached versions of {:?}", removed, name);
    }

    pub fn cache_stats(&self) -> Vec<CacheStats> {
        self.registry.stats()
    }

    pub fn clear_caches(&self) {
        self.registry.clear_all();
    }
}

/// Key for one prompt selector: `prompt:<name>:<selector>`.
pub fn prompt_cache_key(name: &str, version: Option<u32>, label: Option<&str>) -> String {
    match (version, label) {
        (Some(version), _) => format!("prompt:{}:version:{}", name, version),
        (None, Some(label)) => format!("prompt:{}:label:{}", name, label),
        (None, None) => format!("prompt:{}:latest", name),
    }
}

/// Pattern matching every selector key of exactly this prompt name.
pub fn prompt_key_pattern(name: &str) -> String {
    format!("^prompt:{}:", regex::escape(name))
}

/// Key for one list query. Values are form-encoded so a filter containing
/// `&` or `=` cannot alias a different query.
pub fn list_cache_key(query: &ListPromptsQuery) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    serializer.extend_pairs(query.to_pairs());
    format!("list:{}", serializer.finish())
}
