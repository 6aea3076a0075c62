use crate::error::QuizError;

/// Format hint shown while the draft is empty.
pub const PLACEHOLDER: &str = "Paste your questions here. For best results, use a clear format like this:

1. What is the capital of France?
   a) Berlin
   b) Madrid
   c) Paris
   d) Rome
   Correct Answer: Paris

2. Which planet is known as the Red Planet?
   a) Earth
   b) Mars
   c) Jupiter
   d) Venus
   Correct Answer: Mars";

/// Which of the mutually exclusive input sub-states applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPhase {
    Idle,
    Loading,
    Failed(QuizError),
}

/// State of the input stage: the draft being edited plus the transient
/// loading flag and last error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputStage {
    draft: String,
    loading: bool,
    error: Option<QuizError>,
}

impl InputStage {
    pub fn with_draft(draft: impl Into<String>) -> Self {
        Self {
            draft: draft.into(),
            ..Self::default()
        }
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<QuizError> {
        self.error
    }

    pub fn phase(&self) -> InputPhase {
        match (self.loading, self.error) {
            (true, _) => InputPhase::Loading,
            (false, Some(error)) => InputPhase::Failed(error),
            (false, None) => InputPhase::Idle,
        }
    }

    /// Submission needs a non-blank draft and no parse in flight.
    pub fn can_submit(&self) -> bool {
        !self.loading && !self.draft.trim().is_empty()
    }

    // The draft is frozen while a parse is in flight.

    pub fn insert_char(&mut self, c: char) {
        if !self.loading {
            self.draft.push(c);
        }
    }

    pub fn insert_str(&mut self, text: &str) {
        if !self.loading {
            self.draft.push_str(text);
        }
    }

    pub fn backspace(&mut self) {
        if !self.loading {
            self.draft.pop();
        }
    }

    pub fn clear(&mut self) {
        if !self.loading {
            self.draft.clear();
        }
    }

    pub(crate) fn start_loading(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub(crate) fn fail(&mut self, error: QuizError) {
        self.loading = false;
        self.error = Some(error);
    }
}
