use crate::quiz::question::{Question, RunCounters};

/// Per-question render state. Replaced with a fresh value whenever the
/// cursor moves; counters and the answer log live in the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestingStage {
    picked: Option<String>,
}

impl TestingStage {
    pub fn picked(&self) -> Option<&str> {
        self.picked.as_deref()
    }

    pub(crate) fn pick(&mut self, answer: &str) {
        self.picked = Some(answer.to_string());
    }
}

/// How an option is shown on the testing screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionMark {
    /// Not answered yet; selectable.
    Open,
    /// The correct answer, revealed after any pick.
    Correct,
    /// The user's pick when it was wrong.
    WrongPick,
    /// Any other option once answered.
    Dimmed,
}

/// Everything the testing screen needs for the current question.
#[derive(Debug, Clone, PartialEq)]
pub struct TestingView<'a> {
    /// 1-based, for the "Question n of N" header.
    pub number: usize,
    pub total: usize,
    pub prompt: &'a str,
    pub options: Vec<(&'a str, OptionMark)>,
    /// Share of questions completed before the current one: `cursor / total`.
    pub progress: f64,
    pub counters: RunCounters,
    pub answered: bool,
    pub picked_correct: bool,
}

impl<'a> TestingView<'a> {
    pub fn build(
        question: &'a Question,
        cursor: usize,
        total: usize,
        stage: &TestingStage,
        counters: RunCounters,
    ) -> Self {
        let picked = stage.picked();
        let options = question
            .options
            .iter()
            .map(|option| (option.as_str(), mark(question, picked, option)))
            .collect();

        Self {
            number: cursor + 1,
            total,
            prompt: &question.prompt,
            options,
            progress: if total == 0 { 0.0 } else { cursor as f64 / total as f64 },
            counters,
            answered: picked.is_some(),
            picked_correct: picked.is_some_and(|p| question.is_correct(p)),
        }
    }
}

fn mark(question: &Question, picked: Option<&str>, option: &str) -> OptionMark {
    let Some(picked) = picked else {
        return OptionMark::Open;
    };
    if question.is_correct(option) {
        OptionMark::Correct
    } else if option == picked {
        OptionMark::WrongPick
    } else {
        OptionMark::Dimmed
    }
}
