use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::core::{LowLevelClient, QueryResolver};
use crate::error::ParseError;
use crate::quiz::question::Question;

/// Converts free-form MCQ text into structured questions.
///
/// Parsing is all-or-nothing: either every question is returned or an error is.
#[async_trait]
pub trait QuestionParser: Send + Sync {
    async fn parse(&self, text: &str) -> Result<Vec<Question>, ParseError>;
}

const PARSE_INSTRUCTIONS: &str = "Parse the following text which contains multiple choice questions and convert it into a JSON array. \
Each element must have the question text, its options in the order they appear, and the correct answer. \
Ensure the 'correctAnswer' value is exactly one of the strings present in the 'options' array. \
Here is the text:";

/// Parse collaborator backed by a language model.
#[derive(Clone)]
pub struct AiQuestionParser<C: LowLevelClient> {
    resolver: QueryResolver<C>,
}

impl<C: LowLevelClient> AiQuestionParser<C> {
    pub fn new(resolver: QueryResolver<C>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl<C: LowLevelClient> QuestionParser for AiQuestionParser<C> {
    #[instrument(target = "semantic_quiz::parser", skip(self, text), fields(text_len = text.len()))]
    async fn parse(&self, text: &str) -> Result<Vec<Question>, ParseError> {
        let prompt = format!("{}\n\n{}", PARSE_INSTRUCTIONS, text);
        let questions: Vec<Question> = self.resolver.query(prompt).await?;

        // Mismatches are kept: the question stays in the run but can never be
        // scored correct.
        for (index, question) in questions.iter().enumerate() {
            if !question.has_answer_among_options() {
                warn!(index, correct_answer = %question.correct_answer, "Correct answer is not among the options");
            }
        }

        info!(count = questions.len(), "Parsed questions");
        Ok(questions)
    }
}
