//! Core TUI application state and event loop.

use std::io;
use std::time::Duration;

use bankchat_core::{ChatSession, PipelineState, TurnOutcome, loader};
use bankchat_shared::AppConfig;
use color_eyre::eyre::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use tokio::runtime::Runtime;
use tracing::info;

use crate::panels::Focus;
use crate::panels::history::HistoryPanel;
use crate::panels::input::InputPanel;
use crate::panels::sidebar::{SidebarAction, SidebarPanel};
use crate::widgets::{centered_rect, status_bar};

const READY_STATUS: &str = "Ready. Press ? for help";

/// Application state.
pub(crate) struct App {
    /// Panel receiving keys.
    pub focus: Focus,
    /// Conversation shown in the history panel.
    pub session: ChatSession,
    pub input: InputPanel,
    pub sidebar: SidebarPanel,
    pub history: HistoryPanel,
    /// Status message shown in bottom bar.
    pub status: String,
    /// Whether help overlay is visible.
    pub show_help: bool,
    /// Whether the app should quit.
    pub should_quit: bool,
}

impl App {
    pub(crate) fn new() -> Self {
        Self {
            focus: Focus::Input,
            session: ChatSession::new(),
            input: InputPanel::new(),
            sidebar: SidebarPanel::new(),
            history: HistoryPanel::new(),
            status: READY_STATUS.to_string(),
            show_help: false,
            should_quit: false,
        }
    }

    /// Apply a key press. Returns a question when the key starts a turn.
    pub(crate) fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> Option<String> {
        // Global keybindings (always active)
        match code {
            KeyCode::Char('q') | KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
                return None;
            }
            KeyCode::Char('?') if self.focus != Focus::Input => {
                self.show_help = !self.show_help;
                return None;
            }
            KeyCode::F(1) => {
                self.show_help = !self.show_help;
                return None;
            }
            KeyCode::Esc if self.show_help => {
                self.show_help = false;
                return None;
            }
            KeyCode::Tab => {
                self.focus = self.focus.next();
                return None;
            }
            KeyCode::BackTab => {
                self.focus = self.focus.prev();
                return None;
            }
            _ => {}
        }

        // If help is showing, consume any key to dismiss
        if self.show_help {
            self.show_help = false;
            return None;
        }

        match self.focus {
            Focus::Input => {
                let typed = self.input.handle_key(code, modifiers)?;
                self.session.take_prompt(Some(&typed))
            }
            Focus::Sidebar => match self.sidebar.handle_key(code, modifiers)? {
                SidebarAction::Example(index) => {
                    self.session.select_example(index);
                    self.session.take_prompt(None)
                }
                SidebarAction::Clear => {
                    self.session.clear();
                    self.history.reset();
                    self.status = "Chat cleared".to_string();
                    info!("chat history cleared");
                    None
                }
            },
            Focus::History => {
                self.history
                    .handle_key(code, modifiers, self.session.history().messages());
                None
            }
        }
    }
}

/// Entry point: sets up terminal, runs event loop, restores terminal.
pub(crate) fn run(config: AppConfig) -> Result<()> {
    // One turn at a time; each turn blocks the UI thread.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    // Setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let result = run_app(&mut terminal, &runtime, &config);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    runtime: &Runtime,
    config: &AppConfig,
) -> Result<()> {
    let mut app = App::new();

    app.status = "Loading RAG system...".to_string();
    terminal.draw(|f| draw(f, &app))?;
    let state: &PipelineState = runtime.block_on(loader::global().get_or_build(config));
    app.status = match state.failure() {
        None => READY_STATUS.to_string(),
        Some(reason) => format!("RAG system unavailable: {reason}"),
    };

    loop {
        terminal.draw(|f| draw(f, &app))?;

        // Poll for events with 100ms timeout for responsive UI
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(question) = app.handle_key(key.code, key.modifiers) {
                        app.session.record_question(&question);
                        app.status = "Thinking...".to_string();
                        terminal.draw(|f| draw(f, &app))?;

                        let outcome = runtime.block_on(app.session.respond(state, &question));
                        app.status = match outcome {
                            TurnOutcome::Answered => READY_STATUS.to_string(),
                            TurnOutcome::Failed => "Request failed".to_string(),
                            TurnOutcome::Unavailable => "RAG system unavailable".to_string(),
                        };
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(1),    // Content
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    let title = Paragraph::new("Ask about cards, transfers, fees or your account.")
        .style(Style::default().fg(Color::White))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" 🏦 BankChat ")
                .title_style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
        );
    f.render_widget(title, chunks[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(chunks[1]);

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(columns[0]);

    app.history.draw(
        f,
        main[0],
        app.session.history().messages(),
        app.focus == Focus::History,
    );
    app.input.draw(f, main[1], app.focus == Focus::Input);
    app.sidebar
        .draw(f, columns[1], app.focus == Focus::Sidebar);

    // Status bar
    let bar = status_bar(&app.status);
    f.render_widget(bar, chunks[2]);

    // Help overlay
    if app.show_help {
        draw_help_overlay(f);
    }
}

fn draw_help_overlay(f: &mut Frame) {
    let area = centered_rect(60, 60, f.area());

    let help_text = vec![
        Line::from("Keybindings").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from(""),
        Line::from("  Tab/S-Tab    Next/previous panel"),
        Line::from("  ? / F1       Toggle this help"),
        Line::from("  Ctrl-C/Ctrl-Q  Quit"),
        Line::from(""),
        Line::from("Input:").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from("  Enter        Ask the question"),
        Line::from("  Esc          Clear the input"),
        Line::from(""),
        Line::from("Examples:").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from("  ↑/↓          Select"),
        Line::from("  Enter        Ask example / clear chat"),
        Line::from(""),
        Line::from("History:").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from("  ↑/↓          Select answer"),
        Line::from("  Enter/Space  Show or hide sources"),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help: press any key to close ")
                .style(Style::default().bg(Color::DarkGray)),
        )
        .style(Style::default().fg(Color::White).bg(Color::DarkGray));

    // Clear background
    f.render_widget(ratatui::widgets::Clear, area);
    f.render_widget(help, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bankchat_core::EXAMPLE_QUESTIONS;

    fn press(app: &mut App, code: KeyCode) -> Option<String> {
        app.handle_key(code, KeyModifiers::NONE)
    }

    #[test]
    fn tab_cycles_focus() {
        let mut app = App::new();
        assert_eq!(app.focus, Focus::Input);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, Focus::Sidebar);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, Focus::History);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, Focus::Input);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.focus, Focus::History);
    }

    #[test]
    fn typed_question_is_submitted() {
        let mut app = App::new();
        for c in "Why?".chars() {
            assert_eq!(press(&mut app, KeyCode::Char(c)), None);
        }
        assert!(!app.show_help);
        assert_eq!(press(&mut app, KeyCode::Enter), Some("Why?".to_string()));
    }

    #[test]
    fn sidebar_example_matches_typed_text() {
        let mut app = App::new();
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Down);
        assert_eq!(
            press(&mut app, KeyCode::Enter).as_deref(),
            Some(EXAMPLE_QUESTIONS[1])
        );
    }

    #[test]
    fn sidebar_clear_empties_history() {
        let mut app = App::new();
        app.session.record_question("old question");
        press(&mut app, KeyCode::Tab);
        for _ in 0..EXAMPLE_QUESTIONS.len() {
            press(&mut app, KeyCode::Down);
        }
        assert_eq!(press(&mut app, KeyCode::Enter), None);
        assert!(app.session.history().is_empty());

        press(&mut app, KeyCode::Enter);
        assert!(app.session.history().is_empty());
    }

    #[test]
    fn help_toggles_outside_input_and_any_key_closes() {
        let mut app = App::new();
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Char('?'));
        assert!(app.show_help);
        assert_eq!(press(&mut app, KeyCode::Enter), None);
        assert!(!app.show_help);
    }

    #[test]
    fn ctrl_c_and_ctrl_q_quit() {
        for key in ['c', 'q'] {
            let mut app = App::new();
            app.handle_key(KeyCode::Char(key), KeyModifiers::CONTROL);
            assert!(app.should_quit);
        }
    }
}
