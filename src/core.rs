//! Core querying API: wraps a low-level model client with retries, schema-aware
//! prompting and strict JSON extraction.
//!
//! `QueryResolver::query::<T>()` is the entry point: it appends a JSON Schema for
//! `T` to the prompt, asks the model, and returns the first JSON structure in the
//! reply that deserializes as `T`.

use crate::error::{AIError, QueryResolverError};
use crate::interceptors::Interceptor;
use crate::json_utils::extract_first;
use async_trait::async_trait;
use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Low-level model client abstraction.
///
/// Implementors provide `ask_raw`, which executes a prompt and returns the raw
/// model text. Schema handling and extraction are performed by `QueryResolver`.
#[async_trait]
pub trait LowLevelClient: Send + Sync + Debug {
    /// The only method that implementations must provide
    async fn ask_raw(&self, prompt: String) -> Result<String, AIError>;

    /// Clone this client into a boxed trait object
    fn clone_box(&self) -> Box<dyn LowLevelClient>;
}

// Implement Clone for Box<dyn LowLevelClient>
impl Clone for Box<dyn LowLevelClient> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[async_trait]
impl LowLevelClient for Box<dyn LowLevelClient> {
    async fn ask_raw(&self, prompt: String) -> Result<String, AIError> {
        self.as_ref().ask_raw(prompt).await
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        self.as_ref().clone_box()
    }
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: HashMap<String, usize>,
    pub default_max_retries: usize,
    /// Wait before retry `n` is `backoff * n`.
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let mut max_retries = HashMap::new();
        max_retries.insert("rate_limit".to_string(), 1);
        max_retries.insert("api_error".to_string(), 1);
        max_retries.insert("http_error".to_string(), 1);
        max_retries.insert("json_parse_error".to_string(), 2);

        Self {
            max_retries,
            default_max_retries: 1,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryConfig {
    /// A configuration that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: HashMap::new(),
            default_max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    pub fn max_retries_for(&self, kind: &str) -> usize {
        self.max_retries.get(kind).copied().unwrap_or(self.default_max_retries)
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Query resolver that wraps a LowLevelClient and provides the typed query API.
#[derive(Clone)]
pub struct QueryResolver<C: LowLevelClient> {
    client: C,
    config: RetryConfig,
    interceptor: Option<Arc<dyn Interceptor>>,
}

impl<C: LowLevelClient> QueryResolver<C> {
    pub fn new(client: C, config: RetryConfig) -> Self {
        info!(default_max_retries = config.default_max_retries, "Creating new QueryResolver");
        Self { client, config, interceptor: None }
    }

    /// Get a reference to the retry configuration
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Record every successful prompt/response pair through `interceptor`.
    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    /// Query with automatic JSON Schema guidance and typed extraction.
    ///
    /// A reply without any structure that deserializes as `T` is retried up to
    /// the `json_parse_error` limit before failing.
    #[instrument(target = "semantic_quiz::resolver", skip(self, prompt), fields(prompt_len = prompt.len()))]
    pub async fn query<T>(&self, prompt: String) -> Result<T, QueryResolverError>
    where
        T: DeserializeOwned + JsonSchema,
    {
        info!(prompt_len = prompt.len(), "Starting query");

        let prompt = self.add_schema_guidance::<T>(prompt);
        let max_parse_retries = self.config.max_retries_for("json_parse_error");
        let mut attempt = 0;

        loop {
            let raw = self.ask_with_retry(&prompt).await?;
            match extract_first::<T>(&raw) {
                Ok(value) => {
                    info!(response_len = raw.len(), attempt, "Query completed");
                    return Ok(value);
                }
                Err(e) if attempt < max_parse_retries => {
                    attempt += 1;
                    warn!(error = %e, attempt, "Response did not match schema, retrying");
                }
                Err(e) => return Err(QueryResolverError::JsonDeserialization(e, raw)),
            }
        }
    }

    async fn ask_with_retry(&self, prompt: &str) -> Result<String, AIError> {
        let mut attempts: HashMap<&'static str, usize> = HashMap::new();

        loop {
            match self.client.ask_raw(prompt.to_string()).await {
                Ok(raw) => {
                    self.intercept(prompt, &raw).await;
                    return Ok(raw);
                }
                Err(e) => {
                    let Some(kind) = e.retry_kind() else {
                        return Err(e);
                    };
                    let used = attempts.entry(kind).or_insert(0);
                    if *used >= self.config.max_retries_for(kind) {
                        return Err(e);
                    }
                    *used += 1;
                    let wait = self.config.backoff * (*used as u32);
                    warn!(error = %e, kind, attempt = *used, wait_ms = wait.as_millis() as u64, "Model call failed, retrying");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    async fn intercept(&self, prompt: &str, response: &str) {
        if let Some(interceptor) = &self.interceptor {
            if let Err(e) = interceptor.save(prompt, response).await {
                warn!(error = %e, "Failed to record transcript");
            }
        }
    }

    /// Add JSON schema guidance to a prompt
    fn add_schema_guidance<T>(&self, prompt: String) -> String
    where
        T: JsonSchema,
    {
        let schema = schema_for!(T);
        let schema_json = serde_json::to_string_pretty(&schema)
            .unwrap_or_else(|_| "Schema serialization failed".to_string());
        debug!(schema_len = schema_json.len(), "Appending schema guidance");

        format!(
            "{}\n\n## Response Format\nRespond with valid JSON matching this schema:\n```json\n{}\n```",
            prompt, schema_json
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::mock::{MockClient, MockResponse};
    use crate::error::GeminiError;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema, PartialEq)]
    struct Answer {
        value: i32,
    }

    fn quick() -> RetryConfig {
        RetryConfig::default().with_backoff(Duration::ZERO)
    }

    #[tokio::test]
    async fn query_extracts_json_from_prose() {
        let (client, handle) = MockClient::new();
        handle.push(MockResponse::text("Sure! Here you go: {\"value\": 4} Anything else?"));
        let resolver = QueryResolver::new(client, quick());

        let answer: Answer = resolver.query("2+2?".to_string()).await.unwrap();
        assert_eq!(answer, Answer { value: 4 });

        let prompts = handle.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].starts_with("2+2?"));
        assert!(prompts[0].contains("## Response Format"));
        assert!(prompts[0].contains("\"value\""));
    }

    #[tokio::test]
    async fn query_retries_unparseable_replies() {
        let (client, handle) = MockClient::new();
        handle.push(MockResponse::text("I am not sure."));
        handle.push(MockResponse::text("{\"value\": 7}"));
        let resolver = QueryResolver::new(client, quick());

        let answer: Answer = resolver.query("?".to_string()).await.unwrap();
        assert_eq!(answer.value, 7);
        assert_eq!(handle.call_count(), 2);
    }

    #[tokio::test]
    async fn query_gives_up_after_parse_retry_limit() {
        let (client, handle) = MockClient::new();
        for _ in 0..3 {
            handle.push(MockResponse::text("no json here"));
        }
        let resolver = QueryResolver::new(client, quick());

        let err = resolver.query::<Answer>("?".to_string()).await.unwrap_err();
        assert!(matches!(err, QueryResolverError::JsonDeserialization(_, ref raw) if raw == "no json here"));
        assert_eq!(handle.call_count(), 3);
    }

    #[tokio::test]
    async fn transient_errors_are_retried_but_missing_keys_are_not() {
        let (client, handle) = MockClient::new();
        handle.push(MockResponse::Failure(|| AIError::Gemini(GeminiError::RateLimit)));
        handle.push(MockResponse::text("{\"value\": 1}"));
        let resolver = QueryResolver::new(client, quick());
        assert_eq!(resolver.query::<Answer>("?".into()).await.unwrap().value, 1);

        let (client, handle) = MockClient::new();
        handle.push(MockResponse::Failure(|| AIError::MissingApiKey { key_name: "GEMINI_API_KEY" }));
        handle.push(MockResponse::text("{\"value\": 1}"));
        let resolver = QueryResolver::new(client, quick());
        let err = resolver.query::<Answer>("?".into()).await.unwrap_err();
        assert!(matches!(err, QueryResolverError::Ai(AIError::MissingApiKey { .. })));
        assert_eq!(handle.call_count(), 1);
    }

    #[tokio::test]
    async fn no_retry_config_makes_a_single_attempt() {
        let (client, handle) = MockClient::new();
        handle.push(MockResponse::Failure(|| AIError::Gemini(GeminiError::RateLimit)));
        handle.push(MockResponse::text("{\"value\": 1}"));
        let resolver = QueryResolver::new(client, RetryConfig::none());
        let err = resolver.query::<Answer>("?".into()).await.unwrap_err();
        assert!(matches!(err, QueryResolverError::Ai(AIError::Gemini(GeminiError::RateLimit))));
        assert_eq!(handle.call_count(), 1);

        let (client, handle) = MockClient::new();
        handle.push(MockResponse::text("not json"));
        handle.push(MockResponse::text("{\"value\": 1}"));
        let resolver = QueryResolver::new(client, RetryConfig::none());
        assert!(resolver.query::<Answer>("?".into()).await.is_err());
        assert_eq!(handle.call_count(), 1);
        assert_eq!(resolver.config().max_retries_for("rate_limit"), 0);
    }
}
