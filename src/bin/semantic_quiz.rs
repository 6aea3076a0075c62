use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;
use semantic_quiz::clients::flexible::{ClientType, FlexibleClient};
use semantic_quiz::config::{parse_delay, AppConfig};
use semantic_quiz::core::{QueryResolver, RetryConfig};
use semantic_quiz::interceptors::FileInterceptor;
use semantic_quiz::quiz::{AiQuestionParser, Controller, Question, QuestionParser};
use semantic_quiz::tui;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "📝 Turn pasted multiple-choice questions into an interactive test", long_about = None)]
#[command(after_help = "ENVIRONMENT VARIABLES:
    GEMINI_API_KEY         API key for Gemini (default provider)
    ANTHROPIC_API_KEY      API key for Claude
    DEEPSEEK_API_KEY       API key for DeepSeek
    QUIZ_PROVIDER          gemini|claude|deepseek|mock [default: auto-detect]
    QUIZ_MODEL             Model id override
    QUIZ_ADVANCE_DELAY_MS  Pause after answering [default: 2000]
    QUIZ_LOG_FILE          Log destination
    QUIZ_TRANSCRIPT_DIR    Save prompt/response transcripts here

EXAMPLES:
    semantic-quiz                          # Auto-detect provider from API keys
    semantic-quiz --provider mock          # Offline demo questions
    semantic-quiz --file questions.txt     # Start with a file loaded into the editor")]
struct Args {
    /// Provider: gemini, claude, deepseek, mock
    #[arg(short, long)]
    provider: Option<String>,

    /// Model id override
    #[arg(short, long)]
    model: Option<String>,

    /// Milliseconds to wait after an answer before moving on
    #[arg(long)]
    delay_ms: Option<String>,

    /// Preload the editor with the contents of this file
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Write logs here instead of the default location
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Save every prompt/response pair into this directory
    #[arg(long)]
    transcripts: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn resolve_config(args: &Args) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::from_env().context("invalid environment configuration")?;

    if let Some(provider) = &args.provider {
        config.provider = ClientType::from_str(provider)?;
    }
    if let Some(model) = &args.model {
        config.model = Some(model.clone());
    }
    if let Some(delay) = &args.delay_ms {
        config.advance_delay = parse_delay(delay)?;
    }
    if let Some(path) = &args.log_file {
        config.log_file = path.clone();
    }
    if let Some(dir) = &args.transcripts {
        config.transcript_dir = Some(dir.clone());
    }
    Ok(config)
}

fn init_logging(config: &AppConfig, verbose: bool) -> anyhow::Result<()> {
    let file = File::create(&config.log_file)
        .with_context(|| format!("cannot open log file {}", config.log_file.display()))?;
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // The terminal belongs to the UI, so logs go to a file
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(())
}

fn build_parser(config: &AppConfig) -> anyhow::Result<Arc<dyn QuestionParser>> {
    let client = FlexibleClient::for_output::<Vec<Question>>(config.provider, config.model.as_deref());
    let mut resolver = QueryResolver::new(client, RetryConfig::default());

    if let Some(dir) = &config.transcript_dir {
        fs::create_dir_all(dir).with_context(|| format!("cannot create transcript directory {}", dir.display()))?;
        resolver = resolver.with_interceptor(Arc::new(FileInterceptor::new(dir.clone())));
    }

    Ok(Arc::new(AiQuestionParser::new(resolver)))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = resolve_config(&args)?;
    init_logging(&config, args.verbose)?;

    let draft = match &args.file {
        Some(path) => fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?,
        None => String::new(),
    };

    info!(
        provider = %config.provider,
        model = config.model.as_deref().unwrap_or("default"),
        delay_ms = config.advance_delay.as_millis() as u64,
        "Starting semantic-quiz"
    );

    let parser = build_parser(&config)?;
    tui::run(Controller::with_draft(draft), parser, config.advance_delay).await?;
    Ok(())
}
