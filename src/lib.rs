pub mod clients;
pub mod config;
pub mod core;
pub mod error;
pub mod interceptors;
pub mod json_utils;
pub mod quiz;
pub mod tui;

// Convenient re-exports
pub use config::AppConfig;
pub use json_utils::extract_first;
pub use quiz::{AiQuestionParser, Controller, Question, QuestionParser};
