//! Password prompt that unlocks edit mode.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

use super::input::TextInput;

pub struct PasswordDialog {
    pub input: TextInput,
    pub error: Option<String>,
}

impl PasswordDialog {
    pub fn new() -> Self {
        Self {
            input: TextInput::default(),
            error: None,
        }
    }

    pub fn reject(&mut self) {
        self.error = Some("Wrong password".to_string());
        self.input = TextInput::default();
    }
}

pub fn render(frame: &mut Frame, dialog: &PasswordDialog, area: Rect) {
    let dialog_width = 44.min(area.width.saturating_sub(4));
    let dialog_height = 8;

    let x = (area.width - dialog_width) / 2;
    let y = (area.height.saturating_sub(dialog_height)) / 2;

    let dialog_area = Rect::new(x, y, dialog_width, dialog_height);

    frame.render_widget(Clear, dialog_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // prompt
            Constraint::Length(3), // input
            Constraint::Length(1), // error
            Constraint::Length(1), // footer
        ])
        .margin(1)
        .split(dialog_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Unlock Edit Mode ");
    frame.render_widget(block, dialog_area);

    let prompt = Paragraph::new("Enter the edit password:");
    frame.render_widget(prompt, chunks[0]);

    let input = Paragraph::new(dialog.input.display_line(true, true)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(input, chunks[1]);

    if let Some(ref error) = dialog.error {
        let error = Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red));
        frame.render_widget(error, chunks[2]);
    }

    let footer = Paragraph::new("Enter: unlock | Esc: cancel")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);
}
