use std::fmt;

use crate::quiz::question::{AnswerLog, Question};

/// How an option is tagged in the final report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionTag {
    Correct,
    /// The user's answer, when it differs from the correct one.
    UserAnswer,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionOutcome {
    pub number: usize,
    pub prompt: String,
    pub user_answer: Option<String>,
    pub correct: bool,
    pub options: Vec<(String, OptionTag)>,
}

/// Score band, used to colour the headline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grade {
    High,
    Medium,
    Low,
}

/// Final report, recomputed from the question list and answer log alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsReport {
    pub score: usize,
    pub total: usize,
    pub percentage: u32,
    pub questions: Vec<QuestionOutcome>,
}

impl ResultsReport {
    pub fn compute(questions: &[Question], answers: &AnswerLog) -> Self {
        let outcomes: Vec<QuestionOutcome> = questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let user_answer = answers.get(index);
                let options = question
                    .options
                    .iter()
                    .map(|option| {
                        let tag = if question.is_correct(option) {
                            OptionTag::Correct
                        } else if Some(option.as_str()) == user_answer {
                            OptionTag::UserAnswer
                        } else {
                            OptionTag::Neutral
                        };
                        (option.clone(), tag)
                    })
                    .collect();

                QuestionOutcome {
                    number: index + 1,
                    prompt: question.prompt.clone(),
                    user_answer: user_answer.map(str::to_string),
                    correct: user_answer.is_some_and(|answer| question.is_correct(answer)),
                    options,
                }
            })
            .collect();

        let score = outcomes.iter().filter(|outcome| outcome.correct).count();
        let total = questions.len();

        Self {
            score,
            total,
            percentage: percentage(score, total),
            questions: outcomes,
        }
    }

    pub fn grade(&self) -> Grade {
        match self.percentage {
            80.. => Grade::High,
            50.. => Grade::Medium,
            _ => Grade::Low,
        }
    }
}

fn percentage(score: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (score as f64 / total as f64 * 100.0).round() as u32
}

impl fmt::Display for ResultsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} ({}%)", self.score, self.total, self.percentage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(entries: &[(usize, &str)]) -> AnswerLog {
        let mut log = AnswerLog::new();
        for (index, answer) in entries {
            log.record(*index, *answer);
        }
        log
    }

    #[test]
    fn wrong_answer_is_tagged_separately_from_correct_one() {
        let questions = vec![
            Question::new("Capital of France?", vec!["Berlin", "Paris"], "Paris"),
            Question::new("2+2?", vec!["3", "4"], "4"),
        ];
        let report = ResultsReport::compute(&questions, &log(&[(0, "Berlin"), (1, "4")]));

        assert_eq!(report.to_string(), "1 / 2 (50%)");
        assert_eq!(report.grade(), Grade::Medium);
        assert!(!report.questions[0].correct);
        assert_eq!(
            report.questions[0].options,
            vec![("Berlin".to_string(), OptionTag::UserAnswer), ("Paris".to_string(), OptionTag::Correct)]
        );
        assert_eq!(
            report.questions[1].options,
            vec![("3".to_string(), OptionTag::Neutral), ("4".to_string(), OptionTag::Correct)]
        );
    }

    #[test]
    fn percentage_rounds_to_nearest() {
        let questions = vec![Question::new("q", vec!["a", "b"], "a"); 3];
        let report = ResultsReport::compute(&questions, &log(&[(0, "a"), (1, "a"), (2, "b")]));
        assert_eq!(report.percentage, 67);
        assert_eq!(report.to_string(), "2 / 3 (67%)");

        let report = ResultsReport::compute(&questions, &log(&[(0, "a")]));
        assert_eq!(report.percentage, 33);
        assert_eq!(report.grade(), Grade::Low);
    }

    #[test]
    fn unanswered_questions_score_nothing() {
        let questions = vec![Question::new("q", vec!["a"], "a")];
        let report = ResultsReport::compute(&questions, &AnswerLog::new());
        assert_eq!(report.score, 0);
        assert_eq!(report.questions[0].user_answer, None);
        assert_eq!(report.questions[0].options[0].1, OptionTag::Correct);
    }

    #[test]
    fn unmatched_key_never_marks_an_option_correct() {
        let questions = vec![Question::new("q", vec!["a", "b"], "c")];
        let report = ResultsReport::compute(&questions, &log(&[(0, "a")]));
        assert_eq!(report.score, 0);
        assert!(report.questions[0].options.iter().all(|(_, tag)| *tag != OptionTag::Correct));
        assert_eq!(report.grade(), Grade::Low);
    }
}
