//! The quiz workflow: question data, the parse collaborator, the controller
//! state machine and the per-stage view models.

pub mod controller;
pub mod input;
pub mod parser;
pub mod question;
pub mod results;
pub mod scheduler;
pub mod testing;

pub use controller::{AdvanceToken, Controller, Progression, Stage, WorkflowState};
pub use input::{InputPhase, InputStage};
pub use parser::{AiQuestionParser, QuestionParser};
pub use question::{AnswerLog, Question, RunCounters};
pub use results::{Grade, OptionTag, QuestionOutcome, ResultsReport};
pub use scheduler::AdvanceScheduler;
pub use testing::{OptionMark, TestingStage, TestingView};
