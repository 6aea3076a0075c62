use crate::config::KeyFromEnv;
use crate::core::LowLevelClient;
use crate::error::{AIError, GeminiError};
use async_trait::async_trait;
use reqwest::Client;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_json_schema: Option<serde_json::Value>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    /// Structured-output schema sent with every request.
    pub response_schema: Option<serde_json::Value>,
}

impl KeyFromEnv for GeminiConfig {
    const KEY_NAME: &'static str = "GEMINI_API_KEY";
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: Self::find_key(),
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.0,
            response_schema: None,
        }
    }
}

impl GeminiConfig {
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Constrain replies to the JSON Schema of `T`.
    #[must_use]
    pub fn with_response_schema<T: JsonSchema>(mut self) -> Self {
        let mut schema = match serde_json::to_value(schema_for!(T)) {
            Ok(schema) => schema,
            Err(e) => {
                warn!(error = %e, "Could not serialize response schema, sending none");
                return self;
            }
        };
        // Only the schema body is sent, not the meta-schema reference
        if let Some(map) = schema.as_object_mut() {
            map.remove("$schema");
        }
        self.response_schema = Some(schema);
        self
    }
}

#[derive(Clone, Debug)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new(GeminiConfig::default())
    }
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        info!(model = %config.model, has_key = config.api_key.is_some(), "Creating new Gemini client");
        Self {
            config,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl LowLevelClient for GeminiClient {
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len(), model = %self.config.model))]
    async fn ask_raw(&self, prompt: String) -> Result<String, AIError> {
        let api_key = self.config.api_key.as_deref().ok_or(AIError::MissingApiKey {
            key_name: GeminiConfig::KEY_NAME,
        })?;

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_json_schema: self.config.response_schema.clone(),
                temperature: self.config.temperature,
            },
        };

        debug!("Sending request to Gemini API");
        let response = self
            .client
            .post(format!("{}/{}:generateContent", GEMINI_ENDPOINT, self.config.model))
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request failed");
                AIError::Gemini(GeminiError::Http(e.to_string()))
            })?;

        let status = response.status();
        debug!(status = %status, "Received response from Gemini API");

        if status == 429 {
            warn!("Gemini API rate limit exceeded");
            return Err(AIError::Gemini(GeminiError::RateLimit));
        }

        if status == 401 || status == 403 {
            error!("Gemini API authentication failed");
            return Err(AIError::Gemini(GeminiError::Authentication));
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            // Gemini reports a bad key as 400 rather than 401
            if error_text.contains("API key not valid") {
                error!("Gemini API rejected the configured key");
                return Err(AIError::Gemini(GeminiError::Authentication));
            }
            error!(status = %status, error = %error_text, "Gemini API error");
            return Err(AIError::Gemini(GeminiError::Api(error_text)));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse Gemini response JSON");
            AIError::Gemini(GeminiError::Http(e.to_string()))
        })?;

        let text: String = gemini_response
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect()
            })
            .ok_or_else(|| {
                error!("No candidates in Gemini response");
                AIError::Gemini(GeminiError::Api("No candidates in response".to_string()))
            })?;

        info!(response_len = text.len(), "Successfully received Gemini response");
        Ok(text)
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}
