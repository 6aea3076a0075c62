use thiserror::Error;

/// Substring carried by every missing-credential failure. Collaborators that
/// only hand back a description are classified by looking for it.
pub const MISSING_KEY_MARKER: &str = "API key is not configured";

#[derive(Error, Debug)]
pub enum QueryResolverError {
    #[error("AI error: {0}")]
    Ai(#[from] AIError),
    #[error("JSON deserialization error: {0}. Raw response: {1}")]
    JsonDeserialization(#[source] serde_json::Error, String),
}

#[derive(Error, Debug)]
pub enum AIError {
    #[error("API key is not configured: set {key_name} to contact the AI service")]
    MissingApiKey { key_name: &'static str },
    #[error("Claude API error: {0}")]
    Claude(#[from] ClaudeError),
    #[error("DeepSeek API error: {0}")]
    DeepSeek(#[from] DeepSeekError),
    #[error("Gemini API error: {0}")]
    Gemini(#[from] GeminiError),
    #[error("Mock error: {0}")]
    Mock(String),
}

impl AIError {
    /// Retry bucket for this failure, or `None` when retrying cannot help.
    pub fn retry_kind(&self) -> Option<&'static str> {
        let (http, api, rate_limit) = match self {
            AIError::MissingApiKey { .. } | AIError::Mock(_) => return None,
            AIError::Claude(e) => (
                matches!(e, ClaudeError::Http(_)),
                matches!(e, ClaudeError::Api(_)),
                matches!(e, ClaudeError::RateLimit),
            ),
            AIError::DeepSeek(e) => (
                matches!(e, DeepSeekError::Http(_)),
                matches!(e, DeepSeekError::Api(_)),
                matches!(e, DeepSeekError::RateLimit),
            ),
            AIError::Gemini(e) => (
                matches!(e, GeminiError::Http(_)),
                matches!(e, GeminiError::Api(_)),
                matches!(e, GeminiError::RateLimit),
            ),
        };
        if rate_limit {
            Some("rate_limit")
        } else if http {
            Some("http_error")
        } else if api {
            Some("api_error")
        } else {
            None
        }
    }
}

#[derive(Error, Debug)]
pub enum ClaudeError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Authentication failed")]
    Authentication,
}

#[derive(Error, Debug)]
pub enum DeepSeekError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Authentication failed")]
    Authentication,
}

#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Authentication failed")]
    Authentication,
}

/// Failure of the parse collaborator. Parsing is all-or-nothing: no variant
/// carries a partial question list.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error(transparent)]
    Resolver(#[from] QueryResolverError),
    #[error("parser rejected input: {0}")]
    Rejected(String),
}

/// The four failure kinds the input stage can show. Display strings are the
/// user-facing messages; underlying causes are only logged.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizError {
    #[error("Please enter some question data.")]
    Validation,
    #[error("Configuration Error: The application is missing the required API key to connect to the AI service. Please ensure it is configured in the deployment environment.")]
    Configuration,
    #[error("Could not parse any questions. Please check the format and try again.")]
    EmptyResult,
    #[error("Failed to generate test. The AI could not understand the data. Please ensure it is in a clear MCQ format.")]
    ParseFailure,
}

impl From<&ParseError> for QuizError {
    fn from(err: &ParseError) -> Self {
        match err {
            ParseError::Resolver(QueryResolverError::Ai(AIError::MissingApiKey { .. })) => {
                QuizError::Configuration
            }
            other if other.to_string().contains(MISSING_KEY_MARKER) => QuizError::Configuration,
            _ => QuizError::ParseFailure,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown provider: '{0}'. Supported: claude, deepseek, gemini, mock")]
    UnknownProvider(String),
    #[error("Invalid advance delay '{value}': {source}")]
    InvalidDelay {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_a_configuration_error() {
        let err = ParseError::from(QueryResolverError::from(AIError::MissingApiKey {
            key_name: "GEMINI_API_KEY",
        }));
        assert_eq!(QuizError::from(&err), QuizError::Configuration);
    }

    #[test]
    fn marker_in_description_is_a_configuration_error() {
        let err = ParseError::Rejected(format!("{MISSING_KEY_MARKER}. Cannot contact the AI service."));
        assert_eq!(QuizError::from(&err), QuizError::Configuration);
    }

    #[test]
    fn other_failures_collapse_to_parse_failure() {
        let auth = ParseError::from(QueryResolverError::from(AIError::Gemini(GeminiError::Authentication)));
        assert_eq!(QuizError::from(&auth), QuizError::ParseFailure);

        let bad_json = serde_json::from_str::<Vec<String>>("nope").unwrap_err();
        let shape = ParseError::from(QueryResolverError::JsonDeserialization(bad_json, "nope".into()));
        assert_eq!(QuizError::from(&shape), QuizError::ParseFailure);
    }

    #[test]
    fn retry_kinds() {
        assert_eq!(AIError::Claude(ClaudeError::RateLimit).retry_kind(), Some("rate_limit"));
        assert_eq!(AIError::DeepSeek(DeepSeekError::Http("reset".into())).retry_kind(), Some("http_error"));
        assert_eq!(AIError::Gemini(GeminiError::Api("500".into())).retry_kind(), Some("api_error"));
        assert_eq!(AIError::Gemini(GeminiError::Authentication).retry_kind(), None);
        assert_eq!(AIError::MissingApiKey { key_name: "X" }.retry_kind(), None);
    }
}
