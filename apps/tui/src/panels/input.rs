//! Single-line question input.

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::widgets::panel_block;

pub(crate) struct InputPanel {
    text: String,
}

impl InputPanel {
    pub(crate) fn new() -> Self {
        Self {
            text: String::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    /// Returns the submitted question on Enter; blank input is ignored.
    pub(crate) fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> Option<String> {
        match code {
            KeyCode::Enter => {
                if self.text.trim().is_empty() {
                    return None;
                }
                Some(std::mem::take(&mut self.text))
            }
            KeyCode::Backspace => {
                self.text.pop();
                None
            }
            KeyCode::Esc => {
                self.text.clear();
                None
            }
            KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => {
                self.text.push(c);
                None
            }
            _ => None,
        }
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect, focused: bool) {
        let (content, style) = if self.text.is_empty() && !focused {
            (
                "Type your banking question here...".to_string(),
                Style::default().fg(Color::DarkGray),
            )
        } else {
            (format!("{}█", self.text), Style::default())
        };

        let input = Paragraph::new(content)
            .style(style)
            .block(panel_block("Ask a question", focused));
        f.render_widget(input, area);
    }
}
