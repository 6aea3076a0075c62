use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{core::LowLevelClient, error::AIError};

/// Canned reply served by the offline demo provider.
pub const DEMO_RESPONSE: &str = r#"[
  {"question": "What is the capital of France?", "options": ["Berlin", "Madrid", "Paris", "Rome"], "correctAnswer": "Paris"},
  {"question": "Which planet is known as the Red Planet?", "options": ["Earth", "Mars", "Jupiter", "Venus"], "correctAnswer": "Mars"},
  {"question": "What is 2 + 2?", "options": ["3", "4", "5"], "correctAnswer": "4"}
]"#;

/// One scripted outcome for a `MockClient` call.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Text(String),
    /// Builds the error to return; `AIError` is not `Clone`.
    Failure(fn() -> AIError),
}

impl MockResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// Shared control surface for a `MockClient` and all of its clones.
#[derive(Debug, Default)]
pub struct MockHandle {
    responses: Mutex<VecDeque<MockResponse>>,
    prompts: Mutex<Vec<String>>,
    fallback: Option<String>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockHandle {
    /// Queue a response; queued responses are served in order.
    pub fn push(&self, response: MockResponse) {
        lock(&self.responses).push_back(response);
    }

    /// Every prompt received so far.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }

    fn next(&self, prompt: String) -> Result<String, AIError> {
        lock(&self.prompts).push(prompt);
        match lock(&self.responses).pop_front() {
            Some(MockResponse::Text(text)) => Ok(text),
            Some(MockResponse::Failure(make)) => Err(make()),
            None => self
                .fallback
                .clone()
                .ok_or_else(|| AIError::Mock("no scripted responses left".to_string())),
        }
    }
}

/// Mock client for testing and offline demos.
#[derive(Debug, Clone)]
pub struct MockClient {
    handle: Arc<MockHandle>,
}

impl MockClient {
    /// A mock with an empty script and the handle to fill it.
    pub fn new() -> (Self, Arc<MockHandle>) {
        let handle = Arc::new(MockHandle::default());
        (Self { handle: handle.clone() }, handle)
    }

    pub fn with_responses(responses: Vec<MockResponse>) -> (Self, Arc<MockHandle>) {
        let (client, handle) = Self::new();
        for response in responses {
            handle.push(response);
        }
        (client, handle)
    }

    /// A mock that answers every prompt with `DEMO_RESPONSE`.
    pub fn demo() -> Self {
        let handle = MockHandle {
            fallback: Some(DEMO_RESPONSE.to_string()),
            ..MockHandle::default()
        };
        Self { handle: Arc::new(handle) }
    }
}

#[async_trait]
impl LowLevelClient for MockClient {
    async fn ask_raw(&self, prompt: String) -> Result<String, AIError> {
        self.handle.next(prompt)
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}
