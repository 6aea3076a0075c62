//! Screen composition. Each stage becomes a list of ratatui lines; `render`
//! lays them out with the header and, while testing, the progress gauge.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Gauge, Paragraph, Widget, Wrap},
    Frame,
};

use crate::quiz::input::PLACEHOLDER;
use crate::quiz::{
    Controller, Grade, InputPhase, InputStage, OptionMark, OptionTag, ResultsReport, TestingView, WorkflowState,
};

const SPINNER: [char; 8] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧'];

fn muted() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn accent() -> Style {
    Style::default().fg(Color::Blue)
}

fn success() -> Style {
    Style::default().fg(Color::Green)
}

fn danger() -> Style {
    Style::default().fg(Color::Red)
}

fn title() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

pub fn header_lines() -> Vec<Line<'static>> {
    vec![
        Line::styled("MCQ Test Generator", title()),
        Line::styled(
            "Paste your multiple-choice questions, and let AI create an interactive test for you.",
            muted(),
        ),
    ]
}

pub fn input_lines(stage: &InputStage, spinner_frame: usize) -> Vec<Line<'static>> {
    let mut lines = vec![Line::styled("Paste MCQ Data", accent())];

    if stage.draft().is_empty() {
        lines.extend(PLACEHOLDER.lines().map(|l| Line::styled(l, muted())));
        lines.push(Line::raw("█"));
    } else {
        let draft = format!("{}█", stage.draft());
        lines.extend(draft.split('\n').map(|l| Line::raw(l.to_string())));
    }
    lines.push(Line::default());

    match stage.phase() {
        InputPhase::Loading => {
            let spin = SPINNER[spinner_frame % SPINNER.len()];
            lines.push(Line::styled(format!("{spin} Generating Test..."), accent()));
        }
        InputPhase::Failed(error) => {
            lines.push(Line::styled(error.to_string(), danger()));
            lines.push(submit_line(stage));
        }
        InputPhase::Idle => lines.push(submit_line(stage)),
    }

    lines.push(Line::styled("Ctrl+S generate · Ctrl+U clear · Esc quit", muted()));
    lines
}

fn submit_line(stage: &InputStage) -> Line<'static> {
    let style = if stage.can_submit() { accent() } else { muted() };
    Line::styled("[ Generate Interactive Test ]", style)
}

/// "Question n of N" with the live tallies.
pub fn testing_status(view: &TestingView<'_>) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("Question {} of {}", view.number, view.total),
            accent().add_modifier(Modifier::BOLD),
        ),
        Span::raw("    "),
        Span::styled(format!("✓ {}", view.counters.correct), success()),
        Span::raw("  "),
        Span::styled(format!("✗ {}", view.counters.incorrect), danger()),
    ])
}

/// Share of questions finished before the current one.
pub fn progress_gauge(view: &TestingView<'_>) -> Gauge<'static> {
    let ratio = view.progress.clamp(0.0, 1.0);
    Gauge::default()
        .gauge_style(accent())
        .use_unicode(true)
        .ratio(ratio)
        .label(format!("{}/{}", view.number - 1, view.total))
}

pub fn testing_lines(view: &TestingView<'_>, highlight: usize) -> Vec<Line<'static>> {
    let mut lines = vec![Line::styled(view.prompt.to_string(), title()), Line::default()];

    for (index, (option, mark)) in view.options.iter().enumerate() {
        let pointer = if !view.answered && index == highlight { '>' } else { ' ' };
        let (suffix, style) = match mark {
            OptionMark::Open if index == highlight => ("", accent()),
            OptionMark::Open => ("", Style::default()),
            OptionMark::Correct => ("  ✓", success()),
            OptionMark::WrongPick => ("  ✗", danger()),
            OptionMark::Dimmed => ("", muted()),
        };
        lines.push(Line::styled(format!("{pointer} {}. {option}{suffix}", index + 1), style));
    }

    lines.push(Line::default());
    if view.answered {
        if view.picked_correct {
            lines.push(Line::styled("🎉 Correct!", success()));
        } else {
            lines.push(Line::styled("Not quite.", danger()));
        }
        lines.push(Line::styled("Enter continue · Esc quit", muted()));
    } else {
        lines.push(Line::styled("↑/↓ choose · Enter or 1-9 answer · Esc quit", muted()));
    }
    lines
}

pub fn results_lines(report: &ResultsReport) -> Vec<Line<'static>> {
    let grade_style = match report.grade() {
        Grade::High => success(),
        Grade::Medium => Style::default().fg(Color::Yellow),
        Grade::Low => danger(),
    };
    let mut lines = vec![
        Line::styled("Test Complete!", title()),
        Line::styled("Here's how you did:", muted()),
        Line::styled(report.to_string(), grade_style.add_modifier(Modifier::BOLD)),
        Line::default(),
    ];

    for outcome in &report.questions {
        let (icon, style) = if outcome.correct { ('✓', success()) } else { ('✗', danger()) };
        lines.push(Line::styled(format!("{icon} {}. {}", outcome.number, outcome.prompt), style));
        for (option, tag) in &outcome.options {
            let line = match tag {
                OptionTag::Correct => Line::styled(format!("     {option} (Correct)"), success()),
                OptionTag::UserAnswer => Line::styled(format!("     {option} (Your Answer)"), danger()),
                OptionTag::Neutral => Line::styled(format!("     {option}"), muted()),
            };
            lines.push(line);
        }
        lines.push(Line::default());
    }

    lines.push(Line::styled("n Create New Test · ↑/↓ scroll · q quit", muted()));
    lines
}

pub fn draw(frame: &mut Frame, controller: &Controller, highlight: usize, spinner_frame: usize, scroll: usize) -> usize {
    let area = frame.area();
    render(area, frame.buffer_mut(), controller, highlight, spinner_frame, scroll)
}

/// Render the current stage into `buf`. The body scrolls by `scroll` wrapped
/// rows, clamped so the last page stays full; the clamped value is returned.
pub fn render(
    area: Rect,
    buf: &mut Buffer,
    controller: &Controller,
    highlight: usize,
    spinner_frame: usize,
    scroll: usize,
) -> usize {
    let [header, rest] = Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).areas(area);
    Paragraph::new(header_lines())
        .wrap(Wrap { trim: false })
        .render(header, buf);

    let (lines, body) = match controller.state() {
        WorkflowState::Input(stage) => (input_lines(stage, spinner_frame), rest),
        WorkflowState::Testing(_) => {
            let Some(view) = controller.testing_view() else {
                return 0;
            };
            let [status, gauge, _, body] = Layout::vertical([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .areas(rest);
            Paragraph::new(testing_status(&view)).render(status, buf);
            progress_gauge(&view).render(gauge, buf);
            (testing_lines(&view, highlight), body)
        }
        WorkflowState::Results => (
            controller.report().map(|report| results_lines(&report)).unwrap_or_default(),
            rest,
        ),
    };

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    let max_scroll = paragraph.line_count(body.width).saturating_sub(body.height as usize);
    let scroll = scroll.min(max_scroll);
    paragraph
        .scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0))
        .render(body, buf);
    scroll
}
