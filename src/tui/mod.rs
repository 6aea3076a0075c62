//! Terminal frontend. A single event loop multiplexes keyboard input, parse
//! results and deferred advances, and repaints after each one.

pub mod render;

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    cursor::{Hide, Show},
    event::{
        DisableBracketedPaste, EnableBracketedPaste, Event, EventStream, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::ParseError;
use crate::quiz::{AdvanceScheduler, Controller, Progression, Question, QuestionParser, Stage};

const SPINNER_TICK: Duration = Duration::from_millis(100);

/// Raw mode and alternate screen for the lifetime of the guard.
struct TerminalGuard;

impl TerminalGuard {
    fn enter(out: &mut Stdout) -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(out, EnterAlternateScreen, EnableBracketedPaste, Hide)?;

        // Restore the terminal before the panic message is printed
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            restore_terminal();
            original_hook(info);
        }));
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_terminal();
    }
}

fn restore_terminal() {
    let _ = execute!(io::stdout(), Show, DisableBracketedPaste, LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();
}

/// UI-only state that the controller does not own.
#[derive(Debug, Default)]
struct ViewState {
    highlight: usize,
    scroll: usize,
    spinner: usize,
    position: Option<(Stage, usize)>,
}

impl ViewState {
    /// Reset highlight and scroll whenever the stage or question changes.
    fn sync(&mut self, controller: &Controller) {
        let position = Some((controller.stage(), controller.cursor()));
        if self.position != position {
            self.position = position;
            self.highlight = 0;
            self.scroll = 0;
        }
    }

    fn requested_scroll(&self, stage: Stage) -> usize {
        match stage {
            // Keep the end of the draft in view
            Stage::Input => usize::MAX,
            Stage::Testing => 0,
            Stage::Results => self.scroll,
        }
    }
}

enum Action {
    None,
    Quit,
    Parse(String),
}

/// Run the interactive quiz until the user quits.
pub async fn run(
    mut controller: Controller,
    parser: Arc<dyn QuestionParser>,
    advance_delay: Duration,
) -> io::Result<()> {
    let mut stdout = io::stdout();
    let _guard = TerminalGuard::enter(&mut stdout)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let mut events = EventStream::new();
    let (parse_tx, mut parse_rx) = mpsc::channel::<Result<Vec<Question>, ParseError>>(1);
    let (advance_tx, mut advance_rx) = mpsc::channel(4);
    let mut scheduler = AdvanceScheduler::new(advance_delay, advance_tx);
    let mut spinner = tokio::time::interval(SPINNER_TICK);
    let mut view = ViewState::default();

    info!(delay_ms = advance_delay.as_millis() as u64, "Quiz UI started");

    loop {
        view.sync(&controller);
        let scroll = view.requested_scroll(controller.stage());
        let mut used = 0;
        terminal.draw(|frame| {
            used = render::draw(frame, &controller, view.highlight, view.spinner, scroll);
        })?;
        if controller.stage() == Stage::Results {
            view.scroll = used;
        }

        tokio::select! {
            event = events.next() => {
                let Some(event) = event else {
                    warn!("Terminal event stream closed");
                    break;
                };
                match handle_event(event?, &mut controller, &mut view, &mut scheduler) {
                    Action::None => {}
                    Action::Quit => break,
                    Action::Parse(text) => {
                        let parser = Arc::clone(&parser);
                        let tx = parse_tx.clone();
                        tokio::spawn(async move {
                            let outcome = parser.parse(&text).await;
                            let _ = tx.send(outcome).await;
                        });
                    }
                }
            }
            Some(outcome) = parse_rx.recv() => controller.finish_generate(outcome),
            Some(token) = advance_rx.recv() => {
                let progression = controller.fire(token);
                debug!(?progression, "Deferred advance fired");
            }
            _ = spinner.tick(), if controller.is_loading() => {
                view.spinner = view.spinner.wrapping_add(1);
            }
        }
    }

    scheduler.cancel();
    info!("Quiz UI closed");
    Ok(())
}

fn handle_event(
    event: Event,
    controller: &mut Controller,
    view: &mut ViewState,
    scheduler: &mut AdvanceScheduler,
) -> Action {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => handle_key(key, controller, view, scheduler),
        Event::Paste(text) => {
            if let Some(input) = controller.input_mut() {
                input.insert_str(&normalize_newlines(&text));
            }
            Action::None
        }
        _ => Action::None,
    }
}

fn handle_key(
    key: KeyEvent,
    controller: &mut Controller,
    view: &mut ViewState,
    scheduler: &mut AdvanceScheduler,
) -> Action {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return Action::Quit;
    }

    match controller.stage() {
        Stage::Input => input_key(key.code, ctrl, controller),
        Stage::Testing => testing_key(key.code, controller, view, scheduler),
        Stage::Results => results_key(key.code, controller, view, scheduler),
    }
}

fn input_key(code: KeyCode, ctrl: bool, controller: &mut Controller) -> Action {
    match (code, ctrl) {
        (KeyCode::Esc, _) => return Action::Quit,
        (KeyCode::Char('s'), true) | (KeyCode::F(5), _) => {
            return controller.begin_generate().map_or(Action::None, Action::Parse);
        }
        _ => {}
    }

    let Some(input) = controller.input_mut() else {
        return Action::None;
    };
    match (code, ctrl) {
        (KeyCode::Char('u'), true) => input.clear(),
        (KeyCode::Char(c), false) => input.insert_char(c),
        (KeyCode::Tab, _) => input.insert_str("    "),
        (KeyCode::Enter, _) => input.insert_char('\n'),
        (KeyCode::Backspace, _) => input.backspace(),
        _ => {}
    }
    Action::None
}

fn testing_key(
    code: KeyCode,
    controller: &mut Controller,
    view: &mut ViewState,
    scheduler: &mut AdvanceScheduler,
) -> Action {
    let option_count = controller.current_question().map_or(0, |q| q.options.len());
    let answered = controller.pending_advance().is_some();

    match code {
        KeyCode::Esc | KeyCode::Char('q') => return Action::Quit,
        KeyCode::Up | KeyCode::Char('k') => view.highlight = view.highlight.saturating_sub(1),
        KeyCode::Down | KeyCode::Char('j') => {
            view.highlight = (view.highlight + 1).min(option_count.saturating_sub(1));
        }
        KeyCode::Enter | KeyCode::Char(' ') if answered => {
            if controller.continue_now() != Progression::Ignored {
                scheduler.cancel();
            }
        }
        KeyCode::Enter | KeyCode::Char(' ') => choose(view.highlight, controller, scheduler),
        KeyCode::Char(c @ '1'..='9') => {
            let index = c as usize - '1' as usize;
            if index < option_count {
                view.highlight = index;
                choose(index, controller, scheduler);
            }
        }
        _ => {}
    }
    Action::None
}

fn choose(option: usize, controller: &mut Controller, scheduler: &mut AdvanceScheduler) {
    let cursor = controller.cursor();
    let Some(answer) = controller
        .current_question()
        .and_then(|q| q.options.get(option))
        .cloned()
    else {
        return;
    };
    if let Some(token) = controller.select_answer(cursor, &answer) {
        scheduler.schedule(token);
    }
}

fn results_key(
    code: KeyCode,
    controller: &mut Controller,
    view: &mut ViewState,
    scheduler: &mut AdvanceScheduler,
) -> Action {
    match code {
        KeyCode::Esc | KeyCode::Char('q') => return Action::Quit,
        KeyCode::Char('n') | KeyCode::Enter => {
            scheduler.cancel();
            controller.start_new();
        }
        KeyCode::Up | KeyCode::Char('k') => view.scroll = view.scroll.saturating_sub(1),
        KeyCode::Down | KeyCode::Char('j') => view.scroll = view.scroll.saturating_add(1),
        KeyCode::PageUp => view.scroll = view.scroll.saturating_sub(10),
        KeyCode::PageDown => view.scroll = view.scroll.saturating_add(10),
        KeyCode::Home => view.scroll = 0,
        _ => {}
    }
    Action::None
}

/// Pasted text arrives with `\r` line endings from most terminals.
fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}
