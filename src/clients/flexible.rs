use crate::clients::{ClaudeClient, ClaudeConfig, DeepSeekClient, DeepSeekConfig, GeminiClient, GeminiConfig};
use crate::clients::mock::{MockClient, MockHandle};
use crate::config::KeyFromEnv;
use crate::core::LowLevelClient;
use crate::error::{AIError, ConfigError};
use async_trait::async_trait;
use schemars::JsonSchema;
use std::sync::Arc;
use tracing::info;

/// Which provider backs the parse collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientType {
    Claude,
    DeepSeek,
    Gemini,
    Mock,
}

impl ClientType {
    /// Parse client type from string (case insensitive)
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_lowercase().as_str() {
            "claude" => Ok(Self::Claude),
            "deepseek" => Ok(Self::DeepSeek),
            "gemini" => Ok(Self::Gemini),
            "mock" => Ok(Self::Mock),
            _ => Err(ConfigError::UnknownProvider(s.to_string())),
        }
    }

    /// Pick the first provider whose key is present.
    ///
    /// Falls back to Gemini rather than the mock, so a missing key shows up as a
    /// configuration error instead of silently serving demo data.
    pub fn detect<F>(has_key: F) -> Self
    where
        F: Fn(&str) -> bool,
    {
        if has_key(GeminiConfig::KEY_NAME) {
            Self::Gemini
        } else if has_key(ClaudeConfig::KEY_NAME) {
            Self::Claude
        } else if has_key(DeepSeekConfig::KEY_NAME) {
            Self::DeepSeek
        } else {
            Self::Gemini
        }
    }

    /// Build the concrete client, optionally overriding its model.
    pub fn build(self, model: Option<&str>) -> Box<dyn LowLevelClient> {
        match (self, model) {
            (Self::Claude, Some(m)) => Box::new(ClaudeClient::new(ClaudeConfig::default().with_model(m))),
            (Self::Claude, None) => Box::new(ClaudeClient::default()),
            (Self::DeepSeek, Some(m)) => Box::new(DeepSeekClient::new(DeepSeekConfig::default().with_model(m))),
            (Self::DeepSeek, None) => Box::new(DeepSeekClient::default()),
            (Self::Gemini, Some(m)) => Box::new(GeminiClient::new(GeminiConfig::default().with_model(m))),
            (Self::Gemini, None) => Box::new(GeminiClient::default()),
            (Self::Mock, _) => Box::new(MockClient::demo()),
        }
    }

    /// Like `build`, but providers with native structured output are told
    /// to reply in the shape of `T`.
    pub fn build_for<T: JsonSchema>(self, model: Option<&str>) -> Box<dyn LowLevelClient> {
        match self {
            Self::Gemini => {
                let config = GeminiConfig::default().with_response_schema::<T>();
                let config = match model {
                    Some(m) => config.with_model(m),
                    None => config,
                };
                Box::new(GeminiClient::new(config))
            }
            other => other.build(model),
        }
    }
}

impl std::fmt::Display for ClientType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientType::Claude => write!(f, "Claude"),
            ClientType::DeepSeek => write!(f, "DeepSeek"),
            ClientType::Gemini => write!(f, "Gemini"),
            ClientType::Mock => write!(f, "Mock"),
        }
    }
}

/// Flexible client that wraps any LowLevelClient and provides factory functions
#[derive(Debug)]
pub struct FlexibleClient {
    inner: Box<dyn LowLevelClient>,
}

impl FlexibleClient {
    /// Create a new FlexibleClient wrapping the given client
    pub fn new(client: Box<dyn LowLevelClient>) -> Self {
        Self { inner: client }
    }

    /// Create the client selected by `client_type`, set up to answer with `T`.
    pub fn for_output<T: JsonSchema>(client_type: ClientType, model: Option<&str>) -> Self {
        info!(provider = %client_type, model = model.unwrap_or("default"), "Selecting model provider");
        Self::new(client_type.build_for::<T>(model))
    }

    /// Create a FlexibleClient with a scripted mock and return the handle for configuration
    pub fn mock() -> (Self, Arc<MockHandle>) {
        let (mock_client, handle) = MockClient::new();
        (Self::new(Box::new(mock_client)), handle)
    }
}

impl Clone for FlexibleClient {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_box(),
        }
    }
}

#[async_trait]
impl LowLevelClient for FlexibleClient {
    async fn ask_raw(&self, prompt: String) -> Result<String, AIError> {
        self.inner.ask_raw(prompt).await
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::mock::MockResponse;

    #[test]
    fn test_client_type_parsing() {
        assert_eq!(ClientType::from_str("claude").unwrap(), ClientType::Claude);
        assert_eq!(ClientType::from_str("CLAUDE").unwrap(), ClientType::Claude);
        assert_eq!(ClientType::from_str("deepseek").unwrap(), ClientType::DeepSeek);
        assert_eq!(ClientType::from_str(" Gemini ").unwrap(), ClientType::Gemini);
        assert_eq!(ClientType::from_str("mock").unwrap(), ClientType::Mock);
        assert!(ClientType::from_str("invalid").is_err());
    }

    #[test]
    fn detect_prefers_present_keys_and_never_falls_back_to_mock() {
        assert_eq!(ClientType::detect(|k| k == "ANTHROPIC_API_KEY"), ClientType::Claude);
        assert_eq!(ClientType::detect(|k| k == "DEEPSEEK_API_KEY"), ClientType::DeepSeek);
        assert_eq!(ClientType::detect(|_| true), ClientType::Gemini);
        assert_eq!(ClientType::detect(|_| false), ClientType::Gemini);
    }

    #[tokio::test]
    async fn clones_share_the_mock_script() {
        let (client, handle) = FlexibleClient::mock();
        handle.push(MockResponse::text("first"));
        handle.push(MockResponse::text("second"));
        let clone = client.clone();

        assert_eq!(client.ask_raw("a".into()).await.unwrap(), "first");
        assert_eq!(clone.ask_raw("b".into()).await.unwrap(), "second");
        assert_eq!(handle.call_count(), 2);
    }

    #[tokio::test]
    async fn structured_builds_keep_provider_behaviour() {
        let client = ClientType::Mock.build_for::<Vec<crate::quiz::Question>>(None);
        let reply = client.ask_raw("x".into()).await.unwrap();
        assert_eq!(reply, crate::clients::mock::DEMO_RESPONSE);

        let gemini = FlexibleClient::for_output::<Vec<crate::quiz::Question>>(ClientType::Gemini, Some("gemini-test"));
        assert!(format!("{gemini:?}").contains("gemini-test"));
        assert!(format!("{gemini:?}").contains("response_schema: Some"));
    }
}
