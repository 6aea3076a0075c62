#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use semantic_quiz::clients::mock::{MockClient, MockHandle, MockResponse};
use semantic_quiz::core::{QueryResolver, RetryConfig};
use semantic_quiz::error::ParseError;
use semantic_quiz::quiz::{AiQuestionParser, Controller, Question, QuestionParser};
use std::sync::Arc;

/// Parse collaborator that replays scripted outcomes and counts calls.
pub struct ScriptedParser {
    outcomes: Mutex<VecDeque<Result<Vec<Question>, ParseError>>>,
    calls: AtomicUsize,
}

impl ScriptedParser {
    pub fn new(outcomes: Vec<Result<Vec<Question>, ParseError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn returning(questions: Vec<Question>) -> Self {
        Self::new(vec![Ok(questions)])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuestionParser for ScriptedParser {
    async fn parse(&self, _text: &str) -> Result<Vec<Question>, ParseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ParseError::Rejected("script exhausted".into())))
    }
}

/// A parser backed by a scripted mock model, with no retry delay.
pub fn mock_parser(responses: Vec<MockResponse>) -> (AiQuestionParser<MockClient>, Arc<MockHandle>) {
    let (client, handle) = MockClient::with_responses(responses);
    let resolver = QueryResolver::new(client, RetryConfig::default().with_backoff(std::time::Duration::ZERO));
    (AiQuestionParser::new(resolver), handle)
}

pub fn capitals() -> Vec<Question> {
    vec![
        Question::new("Capital of France?", vec!["Berlin", "Paris", "Rome"], "Paris"),
        Question::new("Capital of Italy?", vec!["Rome", "Milan"], "Rome"),
    ]
}

/// A controller already in the testing stage with `questions`.
pub async fn testing_controller(questions: Vec<Question>) -> Controller {
    let mut controller = Controller::with_draft("1. Some question\n a) x\n Answer: x");
    controller.generate(&ScriptedParser::returning(questions)).await;
    controller
}
