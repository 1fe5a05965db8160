//! Confirmation dialog for destructive actions.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

/// What gets deleted when the dialog is confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmTarget {
    Store { id: String, name: String },
    Location { id: String, name: String },
    Photo { id: String },
}

pub struct ConfirmDialog {
    pub target: ConfirmTarget,
    pub message: String,
}

impl ConfirmDialog {
    pub fn new(target: ConfirmTarget) -> Self {
        let message = match &target {
            ConfirmTarget::Store { name, .. } => format!(
                "Delete store '{}'? All of its markers, measurements, and photos go with it.",
                name
            ),
            ConfirmTarget::Location { name, .. } => format!(
                "Delete marker '{}'? Its measurement data and photos go with it.",
                name
            ),
            ConfirmTarget::Photo { .. } => "Delete this photo and its thumbnail?".to_string(),
        };
        Self { target, message }
    }
}

pub fn render(frame: &mut Frame, dialog: &ConfirmDialog, area: Rect) {
    let dialog_width = 60.min(area.width.saturating_sub(4));
    let dialog_height = 9;

    let x = (area.width - dialog_width) / 2;
    let y = (area.height.saturating_sub(dialog_height)) / 2;

    let dialog_area = Rect::new(x, y, dialog_width, dialog_height);

    frame.render_widget(Clear, dialog_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .margin(1)
        .split(dialog_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Confirm Delete ");
    frame.render_widget(block, dialog_area);

    let message = Paragraph::new(dialog.message.as_str())
        .wrap(ratatui::widgets::Wrap { trim: true })
        .alignment(Alignment::Center);
    frame.render_widget(message, chunks[0]);

    let buttons = Line::from(vec![
        Span::styled(
            "  [Enter/y] ",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("Yes"),
        Span::raw("    "),
        Span::styled(
            "[Esc/n] ",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Span::raw("No"),
    ]);
    let button_widget = Paragraph::new(buttons).alignment(Alignment::Center);
    frame.render_widget(button_widget, chunks[1]);
}
