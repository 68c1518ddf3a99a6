//! Chat history with collapsible source documents.

use std::collections::HashSet;

use bankchat_shared::{ChatMessage, Role};
use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Paragraph, Wrap};

use crate::widgets::panel_block;

pub(crate) struct HistoryPanel {
    /// Index of the selected assistant message.
    selected: Option<usize>,
    /// Messages whose source panel is open.
    expanded: HashSet<usize>,
}

impl HistoryPanel {
    pub(crate) fn new() -> Self {
        Self {
            selected: None,
            expanded: HashSet::new(),
        }
    }

    /// Forget selection and expansion, e.g. after the chat is cleared.
    pub(crate) fn reset(&mut self) {
        self.selected = None;
        self.expanded.clear();
    }

    #[cfg(test)]
    pub(crate) fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub(crate) fn handle_key(&mut self, code: KeyCode, _modifiers: KeyModifiers, messages: &[ChatMessage]) {
        let assistant: Vec<usize> = messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.role == Role::Assistant)
            .map(|(i, _)| i)
            .collect();
        if assistant.is_empty() {
            return;
        }

        match code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = match self.selected {
                    None => assistant.last().copied(),
                    Some(cur) => assistant
                        .iter()
                        .rev()
                        .find(|&&i| i < cur)
                        .or(assistant.first())
                        .copied(),
                };
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected = match self.selected {
                    None => assistant.first().copied(),
                    Some(cur) => assistant
                        .iter()
                        .find(|&&i| i > cur)
                        .or(assistant.last())
                        .copied(),
                };
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                let Some(sel) = self.selected else { return };
                if messages.get(sel).is_some_and(ChatMessage::has_sources)
                    && !self.expanded.remove(&sel)
                {
                    self.expanded.insert(sel);
                }
            }
            _ => {}
        }
    }

    /// Render every message to lines. Also returns the first line of each
    /// message so the view can scroll to the selection.
    pub(crate) fn lines(&self, messages: &[ChatMessage], focused: bool) -> (Vec<Line<'static>>, Vec<usize>) {
        let mut lines = Vec::new();
        let mut starts = Vec::with_capacity(messages.len());

        for (i, message) in messages.iter().enumerate() {
            starts.push(lines.len());
            let selected = focused && self.selected == Some(i);

            let (label, color) = match message.role {
                Role::User => ("You", Color::Green),
                Role::Assistant => ("Assistant", Color::Blue),
            };
            let mut header = Style::default().fg(color).add_modifier(Modifier::BOLD);
            if selected {
                header = header.add_modifier(Modifier::REVERSED);
            }
            lines.push(Line::from(Span::styled(format!("{label}:"), header)));
            for text in message.content.lines() {
                lines.push(Line::from(format!("  {text}")));
            }

            if message.has_sources() {
                let n = message.sources.len();
                let dim = Style::default().fg(Color::DarkGray);
                if self.expanded.contains(&i) {
                    lines.push(Line::styled(format!("  ▾ Source documents ({n})"), dim));
                    for (k, source) in message.sources.iter().enumerate() {
                        lines.push(Line::styled(format!("    {}. {source}", k + 1), dim));
                    }
                } else {
                    lines.push(Line::styled(format!("  ▸ Source documents ({n})"), dim));
                }
            }
            lines.push(Line::from(""));
        }

        (lines, starts)
    }

    /// First row to show: the selected message while focused, otherwise
    /// the last page.
    fn scroll_offset(
        &self,
        lines: &[Line<'static>],
        starts: &[usize],
        width: u16,
        height: u16,
        focused: bool,
    ) -> usize {
        let bottom = wrapped_rows(lines, width).saturating_sub(usize::from(height));
        match self.selected.and_then(|s| starts.get(s)) {
            Some(&first_line) if focused => wrapped_rows(&lines[..first_line], width).min(bottom),
            _ => bottom,
        }
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect, messages: &[ChatMessage], focused: bool) {
        let block = panel_block("Chat", focused);

        if messages.is_empty() {
            let empty = Paragraph::new("Ask a question or pick an example to get started.")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center)
                .block(block);
            f.render_widget(empty, area);
            return;
        }

        let inner = block.inner(area);
        let (lines, starts) = self.lines(messages, focused);

        let scroll = self.scroll_offset(&lines, &starts, inner.width, inner.height, focused);

        let history = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0))
            .block(block);
        f.render_widget(history, area);
    }
}

/// Rows `lines` take once word-wrapped to `width`, counted by the same
/// wrapper that renders them.
fn wrapped_rows(lines: &[Line<'static>], width: u16) -> usize {
    if lines.is_empty() {
        return 0;
    }
    Paragraph::new(lines.to_vec())
        .wrap(Wrap { trim: false })
        .line_count(width.max(1))
}
