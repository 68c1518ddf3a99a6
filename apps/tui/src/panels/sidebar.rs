//! Side panel: about text, example questions and the clear action.

use bankchat_core::EXAMPLE_QUESTIONS;
use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{List, ListItem, Paragraph, Wrap};

use crate::widgets::panel_block;

const ABOUT: &str = "Answers banking questions using the Banking77 dataset \
                     and Google Gemini.";

const CLEAR_LABEL: &str = "Clear chat";

/// What an Enter on the side panel asks the app to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SidebarAction {
    /// Ask example question `n`.
    Example(usize),
    Clear,
}

pub(crate) struct SidebarPanel {
    /// Index into the examples; `EXAMPLE_QUESTIONS.len()` is the clear item.
    selected: usize,
}

impl SidebarPanel {
    pub(crate) fn new() -> Self {
        Self { selected: 0 }
    }

    fn item_count() -> usize {
        EXAMPLE_QUESTIONS.len() + 1
    }

    pub(crate) fn handle_key(
        &mut self,
        code: KeyCode,
        _modifiers: KeyModifiers,
    ) -> Option<SidebarAction> {
        match code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < Self::item_count() {
                    self.selected += 1;
                }
                None
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                if self.selected < EXAMPLE_QUESTIONS.len() {
                    Some(SidebarAction::Example(self.selected))
                } else {
                    Some(SidebarAction::Clear)
                }
            }
            _ => None,
        }
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect, focused: bool) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(1)])
            .split(area);

        let about = Paragraph::new(ABOUT)
            .wrap(Wrap { trim: true })
            .block(panel_block("About", false));
        f.render_widget(about, chunks[0]);

        let labels = EXAMPLE_QUESTIONS.iter().copied().chain([CLEAR_LABEL]);
        let items: Vec<ListItem> = labels
            .enumerate()
            .map(|(i, label)| {
                let selected = focused && i == self.selected;
                let style = if selected {
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD)
                } else if label == CLEAR_LABEL {
                    Style::default().fg(Color::Red)
                } else {
                    Style::default()
                };
                let prefix = if selected { "▸ " } else { "  " };
                ListItem::new(format!("{prefix}{label}")).style(style)
            })
            .collect();

        let list = List::new(items).block(panel_block("Example questions", focused));
        f.render_widget(list, chunks[1]);
    }
}
