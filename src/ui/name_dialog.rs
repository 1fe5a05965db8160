//! Marker name entry, used for both placement and rename.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

use super::input::TextInput;
use crate::markers::abbreviate;

/// What happens with the entered name on confirm.
#[derive(Debug, Clone, PartialEq)]
pub enum NamePurpose {
    /// Create a marker at the clicked percentage position.
    Place { x: f64, y: f64 },
    /// Rename an existing marker.
    Rename { location_id: String },
}

pub struct NameDialog {
    pub purpose: NamePurpose,
    pub input: TextInput,
    pub error: Option<String>,
}

impl NameDialog {
    pub fn place(x: f64, y: f64, default_name: String) -> Self {
        Self {
            purpose: NamePurpose::Place { x, y },
            input: TextInput::new(default_name),
            error: None,
        }
    }

    pub fn rename(location_id: String, current_name: &str) -> Self {
        Self {
            purpose: NamePurpose::Rename { location_id },
            input: TextInput::new(current_name),
            error: None,
        }
    }

    /// Trimmed name, or None (with error set) when empty.
    pub fn confirm(&mut self) -> Option<String> {
        let name = self.input.value.trim().to_string();
        if name.is_empty() {
            self.error = Some("Name is required".to_string());
            return None;
        }
        Some(name)
    }
}

pub fn render(frame: &mut Frame, dialog: &NameDialog, area: Rect) {
    let dialog_width = 50.min(area.width.saturating_sub(4));
    let dialog_height = 9;

    let x = (area.width - dialog_width) / 2;
    let y = (area.height.saturating_sub(dialog_height)) / 2;

    let dialog_area = Rect::new(x, y, dialog_width, dialog_height);

    frame.render_widget(Clear, dialog_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // label preview
            Constraint::Length(3), // input
            Constraint::Length(1), // error
            Constraint::Length(1), // footer
        ])
        .margin(1)
        .split(dialog_area);

    let title = match dialog.purpose {
        NamePurpose::Place { .. } => " New Marker ",
        NamePurpose::Rename { .. } => " Rename Marker ",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title);
    frame.render_widget(block, dialog_area);

    let label = Paragraph::new(Line::from(vec![
        Span::styled("Label: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            abbreviate(&dialog.input.value),
            Style::default().fg(Color::Yellow),
        ),
    ]));
    frame.render_widget(label, chunks[0]);

    let input = Paragraph::new(dialog.input.display_line(true, false)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Name ")
            .border_style(Style::default().fg(Color::Yellow)),
    );
    frame.render_widget(input, chunks[1]);

    if let Some(ref error) = dialog.error {
        let error = Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red));
        frame.render_widget(error, chunks[2]);
    }

    let footer = Paragraph::new("Enter: confirm | Esc: cancel")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_rejects_empty_name() {
        let mut dialog = NameDialog::place(10.0, 20.0, String::new());
        assert_eq!(dialog.confirm(), None);
        assert!(dialog.error.is_some());
    }

    #[test]
    fn test_confirm_trims() {
        let mut dialog = NameDialog::rename("l1".to_string(), "  Back Wall ");
        assert_eq!(dialog.confirm(), Some("Back Wall".to_string()));
    }
}
