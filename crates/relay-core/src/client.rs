//! Authenticated client for the upstream prompt API.
//!
//! Every call goes through one request path that:
//! - Sends Basic auth and JSON headers
//! - Bounds each attempt with the configured timeout
//! - Classifies failures into [`PromptError`] kinds
//! - Retries timeouts, network failures and 5xx with exponential backoff
//!
//! The client knows nothing about caching; see [`crate::PromptService`].

use crate::config::{ClientConfig, ClientDefaults};
use crate::error::{PromptError, Result};
use crate::models::{
    BatchLabelOutcome, CreatePromptParams, LabelUpdate, ListPromptsQuery, PromptList,
    PromptVersion,
};
use crate::network::{
    retry_async, HttpRequest, HttpResponse, ReqwestTransport, RetryConfig, Transport,
};
use base64::prelude::{Engine as _, BASE64_STANDARD};
use futures::future::join_all;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Client for the prompt-management REST API.
pub struct PromptClient {
    config: ClientConfig,
    auth_token: String,
    api_base: Url,
    retry: RetryConfig,
    transport: Arc<dyn Transport>,
}

impl PromptClient {
    /// Create a client that talks HTTP through reqwest.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new()?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client over a custom transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        if config.public_key.trim().is_empty() {
            return Err(PromptError::authentication("Public key is missing"));
        }
        if config.secret_key.trim().is_empty() {
            return Err(PromptError::authentication("Secret key is missing"));
        }

        let auth_token =
            BASE64_STANDARD.encode(format!("{}:{}", config.public_key, config.secret_key));

        let api_base = Url::parse(&format!(
            "{}{}/",
            config.base_url.trim_end_matches('/'),
            ClientDefaults::API_PATH
        ))
        .map_err(|e| PromptError::validation("base_url", format!("invalid URL: {}", e)))?;

        let retry = RetryConfig::new().with_max_retries(config.max_retries);

        info!("Prompt client configured for {}", api_base);

        Ok(Self {
            config,
            auth_token,
            api_base,
            retry,
            transport,
        })
    }

    /// Replace the retry schedule (the retry budget stays as configured).
    pub fn with_retry_base_delay(mut self, delay: std::time::Duration) -> Self {
        self.retry = self.retry.with_base_delay(delay);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Base URL every endpoint path is resolved against.
    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    // ------------------------------------------------------------------
    // Typed operations
    // ------------------------------------------------------------------

    /// List prompt summaries, optionally filtered and paginated.
    pub async fn list_prompts(&self, query: &ListPromptsQuery) -> Result<PromptList> {
        self.request(Method::GET, "prompts", &query.to_pairs(), None)
            .await
    }

    /// Fetch one prompt version.
    ///
    /// `version` selects an exact version and takes precedence over `label`.
    /// With neither, the upstream default (latest) applies.
    pub async fn get_prompt(
        &self,
        name: &str,
        version: Option<u32>,
        label: Option<&str>,
    ) -> Result<PromptVersion> {
        let encoded = urlencoding::encode(name);
        match (version, label) {
            (Some(version), _) => {
                let path = format!("prompts/{}/versions/{}", encoded, version);
                self.request(Method::GET, &path, &[], None).await
            }
            (None, Some(label)) => {
                let path = format!("prompts/{}", encoded);
                self.request(Method::GET, &path, &[("label", label.to_string())], None)
                    .await
            }
            (None, None) => {
                let path = format!("prompts/{}", encoded);
                self.request(Method::GET, &path, &[], None).await
            }
        }
    }

    /// Create a new prompt version. The content shape is checked before any
    /// network call is made.
    pub async fn create_prompt(&self, params: &CreatePromptParams) -> Result<PromptVersion> {
        params.check_content_shape()?;
        let body = serde_json::to_value(params).map_err(|e| {
            PromptError::validation("prompt", format!("payload is not serializable: {}", e))
        })?;
        self.request(Method::POST, "prompts", &[], Some(body)).await
    }

    /// Replace the label set of one version. Labels not listed are removed.
    pub async fn update_prompt_labels(
        &self,
        name: &str,
        version: u32,
        labels: &[String],
    ) -> Result<PromptVersion> {
        let path = format!(
            "prompts/{}/versions/{}",
            urlencoding::encode(name),
            version
        );
        self.request(Method::PATCH, &path, &[], Some(json!({ "labels": labels })))
            .await
    }

    /// Prompt deletion is not offered by the upstream API.
    ///
    /// Always fails with status 501 and never touches the network.
    pub async fn delete_prompt(&self, name: &str, version: Option<u32>) -> Result<()> {
        warn!(
            "Rejected delete for prompt {:?} (version {:?}): unsupported upstream",
            name, version
        );
        Err(PromptError::api_with_details(
            PromptError::NOT_IMPLEMENTED_STATUS,
            "Prompt deletion is not supported by the upstream API",
            json!({ "name": name, "version": version }),
        ))
    }

    /// Apply many label updates, five at a time.
    ///
    /// Groups run one after another; updates inside a group run
    /// concurrently. Each update's outcome is reported individually and in
    /// input order, so one failure never hides the others' results.
    pub async fn batch_update_labels(&self, updates: &[LabelUpdate]) -> Vec<BatchLabelOutcome> {
        let mut outcomes = Vec::with_capacity(updates.len());

        for (index, group) in updates.chunks(ClientDefaults::BATCH_CONCURRENCY).enumerate() {
            debug!("Batch label group {} ({} updates)", index + 1, group.len());
            let results = join_all(
                group
                    .iter()
                    .map(|u| self.update_prompt_labels(&u.name, u.version, &u.labels)),
            )
            .await;

            outcomes.extend(group.iter().zip(results).map(|(update, result)| {
                BatchLabelOutcome {
                    name: update.name.clone(),
                    version: update.version,
                    result,
                }
            }));
        }

        outcomes
    }

    // ------------------------------------------------------------------
    // Request path
    // ------------------------------------------------------------------

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<T> {
        let url = self.endpoint(path, query)?;
        debug!("{} {}", method, url);

        let request = HttpRequest {
            method,
            url,
            headers: vec![
                ("Authorization", format!("Basic {}", self.auth_token)),
                ("Content-Type", "application/json".to_string()),
                ("Accept", "application/json".to_string()),
            ],
            body,
        };

        let client = self;
        let (result, stats) = retry_async(
            &self.retry,
            move || client.send_once(request.clone()),
            AttemptError::should_retry,
        )
        .await;

        if stats.attempts > 1 {
            debug!(
                "{} finished after {} attempts ({:?} backoff)",
                path, stats.attempts, stats.total_delay
            );
        }

        let response = result.map_err(AttemptError::into_error)?;
        decode_body(&response)
    }

    async fn send_once(
        &self,
        request: HttpRequest,
    ) -> std::result::Result<HttpResponse, AttemptError> {
        let response =
            match tokio::time::timeout(self.config.request_timeout, self.transport.send(request))
                .await
            {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => return Err(AttemptError::Local(e.into())),
                Err(_) => return Err(AttemptError::Local(PromptError::timeout())),
            };
        classify_response(response).map_err(AttemptError::Upstream)
    }

    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let mut url = self
            .api_base
            .join(path)
            .map_err(|e| PromptError::validation("path", format!("invalid path {:?}: {}", path, e)))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

/// Outcome of one failed attempt, split by where it failed.
///
/// A local timeout and an upstream 408 surface as the same [`PromptError`],
/// so the retry decision is made here rather than from the status code.
#[derive(Debug)]
enum AttemptError {
    /// Timed out or never reached the upstream.
    Local(PromptError),
    /// The upstream answered with a failure status.
    Upstream(PromptError),
}

impl AttemptError {
    fn should_retry(&self) -> bool {
        match self {
            AttemptError::Local(_) => true,
            AttemptError::Upstream(e) => e.status().is_some_and(|status| status >= 500),
        }
    }

    fn into_error(self) -> PromptError {
        match self {
            AttemptError::Local(e) | AttemptError::Upstream(e) => e,
        }
    }
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptError::Local(e) | AttemptError::Upstream(e) => e.fmt(f),
        }
    }
}

/// Map a raw response to success or one error kind.
fn classify_response(response: HttpResponse) -> Result<HttpResponse> {
    match response.status {
        200..=299 => Ok(response),
        429 => Err(PromptError::RateLimit {
            retry_after_secs: parse_retry_after(response.retry_after.as_deref()),
        }),
        401 | 403 => Err(PromptError::authentication(format!(
            "Upstream rejected credentials ({})",
            response.status
        ))),
        status => {
            let details = serde_json::from_str::<Value>(&response.body)
                .unwrap_or_else(|_| Value::String(response.body.clone()));
            let message = details
                .get("message")
                .or_else(|| details.get("error"))
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| reason_phrase(status));
            Err(PromptError::api_with_details(status, message, details))
        }
    }
}

fn decode_body<T: DeserializeOwned>(response: &HttpResponse) -> Result<T> {
    serde_json::from_str(&response.body).map_err(|e| {
        PromptError::api_with_details(
            response.status,
            format!("Invalid response body: {}", e),
            Value::String(response.body.clone()),
        )
    })
}

/// Seconds from a `Retry-After` header; unparsable or missing means 60.
fn parse_retry_after(value: Option<&str>) -> u64 {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(ClientDefaults::RATE_LIMIT_RETRY_AFTER_SECS)
}

fn reason_phrase(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Upstream request failed")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::network::TransportError;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    enum Scripted {
        Respond(HttpResponse),
        Fail(TransportError),
        Hang,
    }

    /// Replays scripted outcomes and records every request it sees.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Scripted>>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Scripted>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }

        fn request(&self, index: usize) -> HttpRequest {
            self.seen.lock().unwrap()[index].clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(
            &self,
            request: HttpRequest,
        ) -> std::result::Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Scripted::Respond(response)) => Ok(response),
                Some(Scripted::Fail(err)) => Err(err),
                Some(Scripted::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3_600)).await;
                    Err(TransportError::Other("hung".to_string()))
                }
                None => Ok(HttpResponse::new(500, "script exhausted")),
            }
        }
    }

    fn prompt_json(name: &str, version: u32, labels: &[&str]) -> String {
        json!({
            "name": name,
            "version": version,
            "type": "text",
            "prompt": "Hello {{name}}",
            "labels": labels,
            "tags": []
        })
        .to_string()
    }

    fn ok_prompt(name: &str, version: u32) -> Scripted {
        Scripted::Respond(HttpResponse::new(200, prompt_json(name, version, &[])))
    }

    /// Paused-clock timers may round up by a tick.
    fn assert_elapsed(started: tokio::time::Instant, expected: Duration) {
        let elapsed = started.elapsed();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(10),
            "elapsed {:?}, expected {:?}",
            elapsed,
            expected
        );
    }

    fn client_with(transport: Arc<ScriptedTransport>, max_retries: u32) -> PromptClient {
        let config = ClientConfig::new("pk-lf-test", "sk-lf-test")
            .with_base_url("https://prompts.example.com/")
            .with_max_retries(max_retries);
        PromptClient::with_transport(config, transport).unwrap()
    }

    #[test]
    fn test_missing_credentials_fail_construction() {
        let transport = ScriptedTransport::new(Vec::new());
        let err = PromptClient::with_transport(ClientConfig::new("", "sk"), transport.clone())
            .err()
            .unwrap();
        assert_eq!(err.kind(), "authentication_error");

        let err = PromptClient::with_transport(ClientConfig::new("pk", "  "), transport)
            .err()
            .unwrap();
        assert_eq!(err.kind(), "authentication_error");
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after(Some("17")), 17);
        assert_eq!(parse_retry_after(Some("soon")), 60);
        assert_eq!(parse_retry_after(None), 60);
    }

    #[tokio::test]
    async fn test_request_headers_and_url() {
        let transport = ScriptedTransport::new(vec![ok_prompt("greeting", 1)]);
        let client = client_with(transport.clone(), 0);

        let prompt = client.get_prompt("greeting", None, None).await.unwrap();
        assert_eq!(prompt.version, 1);

        let request = transport.request(0);
        assert_eq!(request.method, Method::GET);
        assert_eq!(
            request.url.as_str(),
            "https://prompts.example.com/api/public/v2/prompts/greeting"
        );
        // base64("pk-lf-test:sk-lf-test")
        assert_eq!(
            request.header("authorization"),
            Some("Basic cGstbGYtdGVzdDpzay1sZi10ZXN0")
        );
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("accept"), Some("application/json"));
    }

    #[tokio::test]
    async fn test_get_prompt_selectors() {
        let transport = ScriptedTransport::new(vec![
            ok_prompt("my prompt", 3),
            ok_prompt("my prompt", 2),
        ]);
        let client = client_with(transport.clone(), 0);

        client
            .get_prompt("my prompt", Some(3), Some("production"))
            .await
            .unwrap();
        client
            .get_prompt("my prompt", None, Some("production"))
            .await
            .unwrap();

        assert_eq!(
            transport.request(0).url.as_str(),
            "https://prompts.example.com/api/public/v2/prompts/my%20prompt/versions/3"
        );
        assert_eq!(
            transport.request(1).url.as_str(),
            "https://prompts.example.com/api/public/v2/prompts/my%20prompt?label=production"
        );
    }

    #[tokio::test]
    async fn test_list_prompts_query() {
        let body = json!({
            "data": [],
            "meta": {"page": 2, "limit": 10, "totalPages": 3, "totalItems": 25}
        })
        .to_string();
        let transport = ScriptedTransport::new(vec![Scripted::Respond(HttpResponse::new(200, body))]);
        let client = client_with(transport.clone(), 0);

        let query = ListPromptsQuery {
            tag: Some("support".to_string()),
            page: Some(2),
            limit: Some(10),
            ..Default::default()
        };
        let list = client.list_prompts(&query).await.unwrap();
        assert_eq!(list.meta.total_items, 25);
        assert_eq!(
            transport.request(0).url.query(),
            Some("tag=support&page=2&limit=10")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_5xx_with_backoff_then_succeeds() {
        let transport = ScriptedTransport::new(vec![
            Scripted::Respond(HttpResponse::new(503, "unavailable")),
            Scripted::Respond(HttpResponse::new(503, "unavailable")),
            ok_prompt("greeting", 4),
        ]);
        let client = client_with(transport.clone(), 3);
        let started = tokio::time::Instant::now();

        let prompt = client.get_prompt("greeting", None, None).await.unwrap();

        assert_eq!(prompt.version, 4);
        assert_eq!(transport.calls(), 3);
        // 1s after the first failure, 2s after the second.
        assert_elapsed(started, Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_surface_last_failure() {
        let transport = ScriptedTransport::new(vec![
            Scripted::Respond(HttpResponse::new(500, r#"{"message":"first"}"#)),
            Scripted::Respond(HttpResponse::new(502, r#"{"message":"second"}"#)),
            Scripted::Respond(HttpResponse::new(503, r#"{"message":"third"}"#)),
        ]);
        let client = client_with(transport.clone(), 2);
        let started = tokio::time::Instant::now();

        let err = client.get_prompt("greeting", None, None).await.unwrap_err();

        assert_eq!(transport.calls(), 3);
        assert_elapsed(started, Duration::from_secs(3));
        match err {
            PromptError::Api {
                status,
                message,
                details,
            } => {
                assert_eq!(status, 503);
                assert_eq!(message, "third");
                assert_eq!(details, Some(json!({"message": "third"})));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_is_not_retried() {
        let transport = ScriptedTransport::new(vec![Scripted::Respond(
            HttpResponse::new(429, "slow down").with_retry_after("12"),
        )]);
        let client = client_with(transport.clone(), 3);

        let err = client.get_prompt("greeting", None, None).await.unwrap_err();
        assert_eq!(
            err,
            PromptError::RateLimit {
                retry_after_secs: 12
            }
        );
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_defaults_retry_after() {
        let transport =
            ScriptedTransport::new(vec![Scripted::Respond(HttpResponse::new(429, ""))]);
        let client = client_with(transport, 3);
        let err = client.get_prompt("greeting", None, None).await.unwrap_err();
        assert_eq!(
            err,
            PromptError::RateLimit {
                retry_after_secs: 60
            }
        );
    }

    #[tokio::test]
    async fn test_auth_failures_are_not_retried() {
        for status in [401, 403] {
            let transport =
                ScriptedTransport::new(vec![Scripted::Respond(HttpResponse::new(status, ""))]);
            let client = client_with(transport.clone(), 3);
            let err = client.get_prompt("greeting", None, None).await.unwrap_err();
            assert_eq!(err.kind(), "authentication_error");
            assert_eq!(transport.calls(), 1);
        }
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let transport = ScriptedTransport::new(vec![Scripted::Respond(HttpResponse::new(
            404,
            "no such prompt",
        ))]);
        let client = client_with(transport.clone(), 3);

        let err = client.get_prompt("missing", None, None).await.unwrap_err();
        assert_eq!(transport.calls(), 1);
        assert_eq!(
            err,
            PromptError::api_with_details(
                404,
                "Not Found",
                Value::String("no such prompt".to_string())
            )
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_maps_to_408_and_is_retried() {
        let transport = ScriptedTransport::new(vec![Scripted::Hang, ok_prompt("greeting", 1)]);
        let config = ClientConfig::new("pk", "sk")
            .with_request_timeout(Duration::from_millis(250))
            .with_max_retries(1);
        let client = PromptClient::with_transport(config, transport.clone()).unwrap();
        let started = tokio::time::Instant::now();

        let prompt = client.get_prompt("greeting", None, None).await.unwrap();
        assert_eq!(prompt.version, 1);
        assert_eq!(transport.calls(), 2);
        assert_elapsed(started, Duration::from_millis(1_250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_without_retries_surfaces_408() {
        let transport = ScriptedTransport::new(vec![Scripted::Hang]);
        let config = ClientConfig::new("pk", "sk")
            .with_request_timeout(Duration::from_millis(100))
            .with_max_retries(0);
        let client = PromptClient::with_transport(config, transport).unwrap();

        let err = client.get_prompt("greeting", None, None).await.unwrap_err();
        assert_eq!(err, PromptError::timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_upstream_408_is_not_retried() {
        let transport = ScriptedTransport::new(vec![
            Scripted::Respond(HttpResponse::new(408, r#"{"message":"client too slow"}"#)),
            ok_prompt("greeting", 1),
        ]);
        let client = client_with(transport.clone(), 3);
        let started = tokio::time::Instant::now();

        let err = client.get_prompt("greeting", None, None).await.unwrap_err();

        assert_eq!(transport.calls(), 1);
        assert_elapsed(started, Duration::ZERO);
        assert_eq!(
            err,
            PromptError::api_with_details(
                408,
                "client too slow",
                json!({"message": "client too slow"})
            )
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failure_is_retried() {
        let transport = ScriptedTransport::new(vec![
            Scripted::Fail(TransportError::Connect("refused".to_string())),
            ok_prompt("greeting", 1),
        ]);
        let client = client_with(transport.clone(), 3);

        assert!(client.get_prompt("greeting", None, None).await.is_ok());
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_undecodable_success_body_is_not_retried() {
        let transport = ScriptedTransport::new(vec![Scripted::Respond(HttpResponse::new(
            200,
            "<html>",
        ))]);
        let client = client_with(transport.clone(), 3);

        let err = client.get_prompt("greeting", None, None).await.unwrap_err();
        assert_eq!(err.status(), Some(200));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_create_prompt_rejects_shape_mismatch_before_network() {
        let transport = ScriptedTransport::new(Vec::new());
        let client = client_with(transport.clone(), 3);

        let mut params = CreatePromptParams::text("greeting", "Hi");
        params.prompt_type = crate::models::PromptType::Chat;

        let err = client.create_prompt(&params).await.unwrap_err();
        assert_eq!(err.kind(), "validation_error");
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_create_prompt_posts_full_payload() {
        let transport = ScriptedTransport::new(vec![ok_prompt("greeting", 7)]);
        let client = client_with(transport.clone(), 0);

        let params = CreatePromptParams::text("greeting", "Hi {{name}}")
            .with_labels(vec!["staging".to_string()])
            .with_config(json!({"temperature": 0.2}));
        let created = client.create_prompt(&params).await.unwrap();
        assert_eq!(created.version, 7);

        let request = transport.request(0);
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url.path(), "/api/public/v2/prompts");
        let body = request.body.unwrap();
        assert_eq!(body["name"], "greeting");
        assert_eq!(body["type"], "text");
        assert_eq!(body["labels"], json!(["staging"]));
        assert_eq!(body["config"]["temperature"], 0.2);
    }

    #[tokio::test]
    async fn test_update_labels_replaces_set() {
        let transport = ScriptedTransport::new(vec![Scripted::Respond(HttpResponse::new(
            200,
            prompt_json("greeting", 2, &["staging"]),
        ))]);
        let client = client_with(transport.clone(), 0);

        let updated = client
            .update_prompt_labels("greeting", 2, &["staging".to_string()])
            .await
            .unwrap();
        assert_eq!(updated.labels, vec!["staging".to_string()]);

        let request = transport.request(0);
        assert_eq!(request.method, Method::PATCH);
        assert_eq!(
            request.url.path(),
            "/api/public/v2/prompts/greeting/versions/2"
        );
        assert_eq!(request.body, Some(json!({"labels": ["staging"]})));
    }

    #[tokio::test]
    async fn test_delete_prompt_is_permanent_501() {
        let transport = ScriptedTransport::new(Vec::new());
        let client = client_with(transport.clone(), 3);

        let err = client.delete_prompt("greeting", Some(1)).await.unwrap_err();
        assert_eq!(err.status(), Some(501));
        assert_eq!(transport.calls(), 0);
    }

    /// Counts concurrent in-flight sends and remembers the peak.
    struct ConcurrencyGauge {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        fail_version: Option<u32>,
    }

    #[async_trait]
    impl Transport for ConcurrencyGauge {
        async fn send(
            &self,
            request: HttpRequest,
        ) -> std::result::Result<HttpResponse, TransportError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let version: u32 = request
                .url
                .path_segments()
                .and_then(|mut s| s.next_back())
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            if Some(version) == self.fail_version {
                return Ok(HttpResponse::new(400, r#"{"message":"bad label"}"#));
            }
            Ok(HttpResponse::new(200, prompt_json("greeting", version, &["staging"])))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_update_runs_in_groups_of_five() {
        let gauge = Arc::new(ConcurrencyGauge {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            fail_version: None,
        });
        let client = PromptClient::with_transport(ClientConfig::new("pk", "sk"), gauge.clone())
            .unwrap();
        let updates: Vec<LabelUpdate> = (1..=12)
            .map(|v| LabelUpdate::new("greeting", v, vec!["staging".to_string()]))
            .collect();
        let started = tokio::time::Instant::now();

        let outcomes = client.batch_update_labels(&updates).await;

        assert_eq!(outcomes.len(), 12);
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 5);
        // Three sequential groups of 50ms each.
        assert_elapsed(started, Duration::from_millis(150));
        let versions: Vec<u32> = outcomes
            .iter()
            .map(|o| o.result.as_ref().unwrap().version)
            .collect();
        assert_eq!(versions, (1..=12).collect::<Vec<u32>>());
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_update_keeps_partial_results() {
        let gauge = Arc::new(ConcurrencyGauge {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            fail_version: Some(3),
        });
        let client = PromptClient::with_transport(ClientConfig::new("pk", "sk"), gauge).unwrap();
        let updates: Vec<LabelUpdate> = (1..=6)
            .map(|v| LabelUpdate::new("greeting", v, vec!["staging".to_string()]))
            .collect();

        let outcomes = client.batch_update_labels(&updates).await;

        assert_eq!(outcomes.len(), 6);
        assert_eq!(outcomes[2].version, 3);
        assert_eq!(outcomes[2].result.as_ref().unwrap_err().status(), Some(400));
        assert_eq!(outcomes.iter().filter(|o| o.result.is_ok()).count(), 5);
    }
}
