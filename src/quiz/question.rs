use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A multiple-choice question as produced by the parse collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[schemars(title = "Question", description = "A multiple-choice question with its candidate answers")]
pub struct Question {
    /// The question text.
    #[serde(rename = "question")]
    pub prompt: String,
    /// An array of possible answers, in display order.
    pub options: Vec<String>,
    /// The exact string of the correct answer from the options array.
    pub correct_answer: String,
}

impl Question {
    pub fn new<S: Into<String>>(prompt: S, options: Vec<S>, correct_answer: S) -> Self {
        Self {
            prompt: prompt.into(),
            options: options.into_iter().map(Into::into).collect(),
            correct_answer: correct_answer.into(),
        }
    }

    pub fn is_correct(&self, answer: &str) -> bool {
        self.correct_answer == answer
    }

    /// False when no option equals `correct_answer`; such a question can
    /// never be answered correctly.
    pub fn has_answer_among_options(&self) -> bool {
        self.options.iter().any(|option| option == &self.correct_answer)
    }
}

/// Answers chosen during a run, keyed by question index. Write-once per index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerLog {
    entries: BTreeMap<usize, String>,
}

impl AnswerLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `answer` for `index`. Returns false, leaving the log untouched,
    /// when the index already has an answer.
    pub fn record(&mut self, index: usize, answer: impl Into<String>) -> bool {
        if self.entries.contains_key(&index) {
            return false;
        }
        self.entries.insert(index, answer.into());
        true
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(&index).map(String::as_str)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.entries.contains_key(&index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.entries.iter().map(|(index, answer)| (*index, answer.as_str()))
    }
}

/// Live tallies for the current run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub correct: usize,
    pub incorrect: usize,
}

impl RunCounters {
    pub fn tally(&mut self, correct: bool) {
        if correct {
            self.correct += 1;
        } else {
            self.incorrect += 1;
        }
    }

    pub fn answered(&self) -> usize {
        self.correct + self.incorrect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_log_is_write_once() {
        let mut log = AnswerLog::new();
        assert!(log.record(0, "4"));
        assert!(!log.record(0, "5"));
        assert_eq!(log.get(0), Some("4"));
        assert_eq!(log.len(), 1);
        assert!(log.get(1).is_none());
    }

    #[test]
    fn wire_format_uses_camel_case_field_names() {
        let q: Question = serde_json::from_str(
            r#"{"question": "2+2?", "options": ["3", "4", "5"], "correctAnswer": "4"}"#,
        )
        .unwrap();
        assert_eq!(q, Question::new("2+2?", vec!["3", "4", "5"], "4"));
        assert!(q.is_correct("4"));
        assert!(!q.is_correct(" 4"));

        let back = serde_json::to_value(&q).unwrap();
        assert_eq!(back["correctAnswer"], "4");
        assert_eq!(back["question"], "2+2?");
    }

    #[test]
    fn missing_or_mistyped_fields_are_rejected() {
        assert!(serde_json::from_str::<Question>(r#"{"question": "q", "options": ["a"]}"#).is_err());
        assert!(serde_json::from_str::<Question>(r#"{"question": "q", "options": "a", "correctAnswer": "a"}"#).is_err());
        assert!(serde_json::from_str::<Question>(r#"{"question": null, "options": [], "correctAnswer": "a"}"#).is_err());
    }

    #[test]
    fn answer_membership() {
        assert!(Question::new("q", vec!["a", "b"], "b").has_answer_among_options());
        assert!(!Question::new("q", vec!["a", "b"], "B").has_answer_among_options());
    }

    #[test]
    fn counters_tally() {
        let mut counters = RunCounters::default();
        counters.tally(true);
        counters.tally(false);
        counters.tally(false);
        assert_eq!(counters, RunCounters { correct: 1, incorrect: 2 });
        assert_eq!(counters.answered(), 3);
    }
}
