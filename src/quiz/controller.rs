//! Workflow controller: owns the run data and moves between the input,
//! testing and results stages.
//!
//! ```text
//! Input --generate--> Testing --advance--> Testing --submit--> Results --start_new--> Input
//! ```
//!
//! There is no backward transition. Stages read the controller's state and
//! request changes only through the methods here.

use tracing::{debug, error, info, instrument, warn};

use crate::error::{ParseError, QuizError};
use crate::quiz::input::InputStage;
use crate::quiz::parser::QuestionParser;
use crate::quiz::question::{AnswerLog, Question, RunCounters};
use crate::quiz::results::ResultsReport;
use crate::quiz::testing::{TestingStage, TestingView};

/// Which stage is rendered, with that stage's transient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    Input(InputStage),
    Testing(TestingStage),
    Results,
}

/// Tag-only view of `WorkflowState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Input,
    Testing,
    Results,
}

impl WorkflowState {
    pub fn stage(&self) -> Stage {
        match self {
            WorkflowState::Input(_) => Stage::Input,
            WorkflowState::Testing(_) => Stage::Testing,
            WorkflowState::Results => Stage::Results,
        }
    }
}

/// Handle for a deferred advance-or-submit. Only the most recently issued
/// token is honoured; any cursor movement invalidates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceToken {
    pub(crate) question_index: usize,
    pub(crate) epoch: u64,
}

impl AdvanceToken {
    pub fn question_index(&self) -> usize {
        self.question_index
    }
}

/// Outcome of a progression request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progression {
    Advanced,
    Submitted,
    Ignored,
}

#[derive(Debug, Clone)]
pub struct Controller {
    state: WorkflowState,
    questions: Vec<Question>,
    answers: AnswerLog,
    counters: RunCounters,
    cursor: usize,
    /// Bumped on every cursor change so stale tokens can be recognised.
    epoch: u64,
    scheduled: Option<AdvanceToken>,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller {
    pub fn new() -> Self {
        Self::with_draft("")
    }

    /// Start at the input stage with `draft` already typed in.
    pub fn with_draft(draft: impl Into<String>) -> Self {
        Self {
            state: WorkflowState::Input(InputStage::with_draft(draft)),
            questions: Vec::new(),
            answers: AnswerLog::new(),
            counters: RunCounters::default(),
            cursor: 0,
            epoch: 0,
            scheduled: None,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn stage(&self) -> Stage {
        self.state.stage()
    }

    pub fn input(&self) -> Option<&InputStage> {
        match &self.state {
            WorkflowState::Input(stage) => Some(stage),
            _ => None,
        }
    }

    /// Mutable access for draft editing.
    pub fn input_mut(&mut self) -> Option<&mut InputStage> {
        match &mut self.state {
            WorkflowState::Input(stage) => Some(stage),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.input().is_some_and(InputStage::is_loading)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &AnswerLog {
        &self.answers
    }

    pub fn counters(&self) -> RunCounters {
        self.counters
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.state {
            WorkflowState::Testing(_) => self.questions.get(self.cursor),
            _ => None,
        }
    }

    pub fn pending_advance(&self) -> Option<AdvanceToken> {
        self.scheduled
    }

    /// Validate the draft and mark a parse as in flight.
    ///
    /// Returns the text to hand to the parse collaborator, or `None` when no
    /// parse should start: not at the input stage, a parse already in flight,
    /// or a blank draft (which records a validation error).
    pub fn begin_generate(&mut self) -> Option<String> {
        let WorkflowState::Input(stage) = &mut self.state else {
            return None;
        };
        if stage.is_loading() {
            debug!("Parse already in flight, ignoring resubmission");
            return None;
        }
        if stage.draft().trim().is_empty() {
            stage.fail(QuizError::Validation);
            return None;
        }
        stage.start_loading();
        info!(text_len = stage.draft().len(), "Starting question parse");
        Some(stage.draft().to_string())
    }

    /// Apply the parse outcome started by `begin_generate`.
    pub fn finish_generate(&mut self, outcome: Result<Vec<Question>, ParseError>) {
        let WorkflowState::Input(stage) = &mut self.state else {
            warn!("Parse outcome arrived outside the input stage, dropping it");
            return;
        };
        if !stage.is_loading() {
            warn!("Parse outcome arrived with no parse in flight, dropping it");
            return;
        }

        match outcome {
            Ok(questions) if questions.is_empty() => {
                warn!("Parser returned no questions");
                stage.fail(QuizError::EmptyResult);
            }
            Ok(questions) => {
                info!(count = questions.len(), "Starting test");
                self.questions = questions;
                self.answers = AnswerLog::new();
                self.counters = RunCounters::default();
                self.cursor = 0;
                self.epoch += 1;
                self.scheduled = None;
                self.state = WorkflowState::Testing(TestingStage::default());
            }
            Err(e) => {
                error!(error = %e, "Failed to parse questions");
                stage.fail(QuizError::from(&e));
            }
        }
    }

    /// Validate, parse and apply in one step.
    #[instrument(skip(self, parser))]
    pub async fn generate<P>(&mut self, parser: &P)
    where
        P: QuestionParser + ?Sized,
    {
        if let Some(text) = self.begin_generate() {
            let outcome = parser.parse(&text).await;
            self.finish_generate(outcome);
        }
    }

    /// Record `answer` for question `index`.
    ///
    /// Ignored when not testing, when the index is out of range, or when the
    /// question already has an answer. Answering the current question returns
    /// the token for its deferred advance.
    pub fn select_answer(&mut self, index: usize, answer: &str) -> Option<AdvanceToken> {
        let WorkflowState::Testing(stage) = &mut self.state else {
            return None;
        };
        let Some(question) = self.questions.get(index) else {
            warn!(index, total = self.questions.len(), "Answer for unknown question");
            return None;
        };
        if self.answers.contains(index) {
            debug!(index, "Question already answered, ignoring selection");
            return None;
        }

        let correct = question.is_correct(answer);
        self.counters.tally(correct);
        self.answers.record(index, answer);
        info!(index, correct, "Answer recorded");

        if index != self.cursor {
            return None;
        }
        stage.pick(answer);
        let token = AdvanceToken { question_index: index, epoch: self.epoch };
        self.scheduled = Some(token);
        Some(token)
    }

    /// Move to the next question. No-op on the last question.
    pub fn advance(&mut self) -> bool {
        if self.stage() != Stage::Testing || self.cursor + 1 >= self.questions.len() {
            return false;
        }
        self.cursor += 1;
        self.epoch += 1;
        self.scheduled = None;
        self.state = WorkflowState::Testing(TestingStage::default());
        debug!(cursor = self.cursor, "Advanced to next question");
        true
    }

    /// Finish the test. Only allowed on the last question.
    pub fn submit(&mut self) -> bool {
        if self.stage() != Stage::Testing || self.cursor + 1 != self.questions.len() {
            return false;
        }
        self.scheduled = None;
        self.state = WorkflowState::Results;
        info!(correct = self.counters.correct, incorrect = self.counters.incorrect, "Test submitted");
        true
    }

    /// Run a deferred advance. Tokens other than the pending one are stale and ignored.
    pub fn fire(&mut self, token: AdvanceToken) -> Progression {
        if self.scheduled != Some(token) {
            debug!(question_index = token.question_index, "Ignoring stale advance");
            return Progression::Ignored;
        }
        self.advance_or_submit()
    }

    /// Skip the remaining delay after the current question has been answered.
    pub fn continue_now(&mut self) -> Progression {
        if self.scheduled.is_none() {
            return Progression::Ignored;
        }
        self.advance_or_submit()
    }

    fn advance_or_submit(&mut self) -> Progression {
        self.scheduled = None;
        if self.advance() {
            Progression::Advanced
        } else if self.submit() {
            Progression::Submitted
        } else {
            Progression::Ignored
        }
    }

    /// Discard the finished run and return to a blank input stage.
    pub fn start_new(&mut self) -> bool {
        if self.stage() != Stage::Results {
            return false;
        }
        *self = Self {
            epoch: self.epoch + 1,
            ..Self::new()
        };
        info!("Starting new test");
        true
    }

    pub fn testing_view(&self) -> Option<TestingView<'_>> {
        let WorkflowState::Testing(stage) = &self.state else {
            return None;
        };
        let question = self.questions.get(self.cursor)?;
        Some(TestingView::build(question, self.cursor, self.questions.len(), stage, self.counters))
    }

    /// Final report; only available at the results stage.
    pub fn report(&self) -> Option<ResultsReport> {
        match self.state {
            WorkflowState::Results => Some(ResultsReport::compute(&self.questions, &self.answers)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::input::InputPhase;

    fn two_questions() -> Vec<Question> {
        vec![
            Question::new("Capital of France?", vec!["Berlin", "Paris"], "Paris"),
            Question::new("2+2?", vec!["3", "4"], "4"),
        ]
    }

    fn testing_controller() -> Controller {
        let mut controller = Controller::with_draft("some questions");
        assert!(controller.begin_generate().is_some());
        controller.finish_generate(Ok(two_questions()));
        assert_eq!(controller.stage(), Stage::Testing);
        controller
    }

    #[test]
    fn blank_draft_sets_validation_error() {
        let mut controller = Controller::with_draft("   \n");
        assert_eq!(controller.begin_generate(), None);
        assert_eq!(controller.input().unwrap().phase(), InputPhase::Failed(QuizError::Validation));
        assert!(!controller.is_loading());
    }

    #[test]
    fn resubmission_is_blocked_while_loading() {
        let mut controller = Controller::with_draft("q");
        assert_eq!(controller.begin_generate().as_deref(), Some("q"));
        assert!(controller.is_loading());
        assert_eq!(controller.begin_generate(), None);
    }

    #[test]
    fn failure_keeps_draft_and_stays_in_input() {
        let mut controller = Controller::with_draft("my text");
        controller.begin_generate();
        controller.finish_generate(Err(ParseError::Rejected("model unavailable".into())));

        let input = controller.input().unwrap();
        assert_eq!(input.draft(), "my text");
        assert_eq!(input.error(), Some(QuizError::ParseFailure));
        assert!(!input.is_loading());
        assert!(controller.questions().is_empty());
    }

    #[test]
    fn outcome_without_pending_parse_is_dropped() {
        let mut controller = Controller::with_draft("q");
        controller.finish_generate(Ok(two_questions()));
        assert_eq!(controller.stage(), Stage::Input);
    }

    #[test]
    fn second_selection_is_ignored() {
        let mut controller = testing_controller();
        assert!(controller.select_answer(0, "Berlin").is_some());
        assert!(controller.select_answer(0, "Paris").is_none());

        assert_eq!(controller.answers().get(0), Some("Berlin"));
        assert_eq!(controller.counters(), RunCounters { correct: 0, incorrect: 1 });
    }

    #[test]
    fn out_of_range_answer_is_ignored() {
        let mut controller = testing_controller();
        assert!(controller.select_answer(7, "x").is_none());
        assert!(controller.answers().is_empty());
        assert_eq!(controller.counters().answered(), 0);
    }

    #[test]
    fn token_advances_then_submits() {
        let mut controller = testing_controller();
        let first = controller.select_answer(0, "Paris").unwrap();
        assert_eq!(controller.fire(first), Progression::Advanced);
        assert_eq!(controller.cursor(), 1);
        assert!(controller.testing_view().unwrap().options.iter().all(|(_, m)| *m == crate::quiz::testing::OptionMark::Open));

        let second = controller.select_answer(1, "3").unwrap();
        assert_eq!(controller.fire(second), Progression::Submitted);
        assert_eq!(controller.stage(), Stage::Results);
        assert_eq!(controller.report().unwrap().to_string(), "1 / 2 (50%)");
    }

    #[test]
    fn stale_token_cannot_skip_a_question() {
        let mut controller = testing_controller();
        let token = controller.select_answer(0, "Paris").unwrap();
        assert_eq!(controller.continue_now(), Progression::Advanced);

        assert_eq!(controller.fire(token), Progression::Ignored);
        assert_eq!(controller.cursor(), 1);
        assert_eq!(controller.stage(), Stage::Testing);
    }

    #[test]
    fn continue_requires_an_answer() {
        let mut controller = testing_controller();
        assert_eq!(controller.continue_now(), Progression::Ignored);
        assert_eq!(controller.cursor(), 0);
    }

    #[test]
    fn submit_only_from_last_question() {
        let mut controller = testing_controller();
        assert!(!controller.submit());
        assert!(controller.advance());
        assert!(!controller.advance());
        assert!(controller.submit());
        assert!(controller.report().is_some());
    }

    #[test]
    fn start_new_only_from_results_and_clears_everything() {
        let mut controller = testing_controller();
        assert!(!controller.start_new());

        let token = controller.select_answer(0, "Paris").unwrap();
        controller.fire(token);
        let token = controller.select_answer(1, "4").unwrap();
        controller.fire(token);
        assert!(controller.start_new());

        assert_eq!(controller.stage(), Stage::Input);
        assert_eq!(controller.input().unwrap().draft(), "");
        assert!(controller.questions().is_empty());
        assert!(controller.answers().is_empty());
        assert_eq!(controller.cursor(), 0);
        assert_eq!(controller.counters(), RunCounters::default());
        assert!(controller.pending_advance().is_none());
        assert_eq!(controller.fire(token), Progression::Ignored);
    }
}
