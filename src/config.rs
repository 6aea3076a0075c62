use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::clients::flexible::ClientType;
use crate::error::ConfigError;

/// Default pause between answering a question and moving on.
pub const DEFAULT_ADVANCE_DELAY: Duration = Duration::from_millis(2000);

/// Trait for types that can retrieve their configuration key from environment variables
pub trait KeyFromEnv {
    /// The environment variable name for this client's API key
    const KEY_NAME: &'static str;

    /// Find the API key by checking the .env file and then the environment.
    /// Blank values count as absent.
    fn find_key() -> Option<String> {
        // Silently ignore a missing .env
        let _ = dotenvy::dotenv();

        env::var(Self::KEY_NAME)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Application settings resolved from `.env`, the environment and CLI flags.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: ClientType,
    /// Overrides the provider's default model id.
    pub model: Option<String>,
    pub advance_delay: Duration,
    pub log_file: PathBuf,
    /// When set, every prompt/response pair is written here.
    pub transcript_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ClientType::Gemini,
            model: None,
            advance_delay: DEFAULT_ADVANCE_DELAY,
            log_file: env::temp_dir().join("semantic-quiz.log"),
            transcript_dir: None,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment (after loading `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.provider = match get("QUIZ_PROVIDER") {
            Some(name) => ClientType::from_str(&name)?,
            None => ClientType::detect(|key| get(key).is_some()),
        };
        config.model = get("QUIZ_MODEL");
        if let Some(raw) = get("QUIZ_ADVANCE_DELAY_MS") {
            config.advance_delay = parse_delay(&raw)?;
        }
        if let Some(path) = get("QUIZ_LOG_FILE") {
            config.log_file = PathBuf::from(path);
        }
        config.transcript_dir = get("QUIZ_TRANSCRIPT_DIR").map(PathBuf::from);

        Ok(config)
    }
}

/// Parse a millisecond count as used by `QUIZ_ADVANCE_DELAY_MS` and `--delay-ms`.
pub fn parse_delay(raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|source| ConfigError::InvalidDelay { value: raw.to_string(), source })
}
