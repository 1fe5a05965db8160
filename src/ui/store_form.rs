//! Store create/edit form.
//!
//! Name, location, and address are required; the dialog blocks confirmation
//! with an inline message until they are filled. Manager and phone are
//! optional.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

use super::input::TextInput;
use crate::db::{Store, StoreForm};

const FIELD_LABELS: [&str; 5] = ["Name", "Location", "Address", "Manager", "Phone"];
const REQUIRED: usize = 3;

pub struct StoreFormDialog {
    /// Store being edited, None when creating.
    pub store_id: Option<String>,
    pub fields: [TextInput; 5],
    pub focus: usize,
    pub error: Option<String>,
}

impl StoreFormDialog {
    pub fn create() -> Self {
        Self {
            store_id: None,
            fields: Default::default(),
            focus: 0,
            error: None,
        }
    }

    pub fn edit(store: &Store) -> Self {
        Self {
            store_id: Some(store.id.clone()),
            fields: [
                TextInput::new(store.name.clone()),
                TextInput::new(store.location.clone()),
                TextInput::new(store.address.clone()),
                TextInput::new(store.manager.clone().unwrap_or_default()),
                TextInput::new(store.phone.clone().unwrap_or_default()),
            ],
            focus: 0,
            error: None,
        }
    }

    pub fn focused(&mut self) -> &mut TextInput {
        &mut self.fields[self.focus]
    }

    pub fn next_field(&mut self) {
        self.focus = (self.focus + 1) % self.fields.len();
    }

    pub fn prev_field(&mut self) {
        self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
    }

    /// Validate and build the form. Missing required fields set the inline
    /// error and move focus to the first offender.
    pub fn confirm(&mut self) -> Option<StoreForm> {
        for i in 0..REQUIRED {
            if self.fields[i].is_empty() {
                self.error = Some(format!("{} is required", FIELD_LABELS[i]));
                self.focus = i;
                return None;
            }
        }
        Some(StoreForm {
            name: self.fields[0].value.trim().to_string(),
            location: self.fields[1].value.trim().to_string(),
            address: self.fields[2].value.trim().to_string(),
            manager: self.fields[3].as_optional(),
            phone: self.fields[4].as_optional(),
        })
    }
}

pub fn render(frame: &mut Frame, dialog: &StoreFormDialog, area: Rect) {
    let dialog_width = 60.min(area.width.saturating_sub(4));
    let dialog_height = 22.min(area.height.saturating_sub(2));

    let x = (area.width - dialog_width) / 2;
    let y = (area.height.saturating_sub(dialog_height)) / 2;

    let dialog_area = Rect::new(x, y, dialog_width, dialog_height);

    frame.render_widget(Clear, dialog_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1), // error
            Constraint::Length(1), // footer
        ])
        .margin(1)
        .split(dialog_area);

    let title = if dialog.store_id.is_some() {
        " Edit Store "
    } else {
        " New Store "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(title)
        .title_style(Style::default().add_modifier(Modifier::BOLD));
    frame.render_widget(block, dialog_area);

    for (i, label) in FIELD_LABELS.iter().enumerate() {
        let focused = dialog.focus == i;
        let required_mark = if i < REQUIRED { "*" } else { "" };
        let border_color = if focused { Color::Yellow } else { Color::DarkGray };
        let input = Paragraph::new(dialog.fields[i].display_line(focused, false)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {}{} ", label, required_mark))
                .border_style(Style::default().fg(border_color)),
        );
        frame.render_widget(input, chunks[i]);
    }

    if let Some(ref error) = dialog.error {
        let error = Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red));
        frame.render_widget(error, chunks[5]);
    }

    let footer = Paragraph::new("Tab: next field | Enter: save | Esc: cancel")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[6]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_required_field_blocks_confirm() {
        let mut dialog = StoreFormDialog::create();
        dialog.fields[0] = TextInput::new("Store");
        // location and address still empty
        assert!(dialog.confirm().is_none());
        assert_eq!(dialog.error.as_deref(), Some("Location is required"));
        assert_eq!(dialog.focus, 1);
    }

    #[test]
    fn test_confirm_builds_form_with_optional_fields() {
        let mut dialog = StoreFormDialog::create();
        dialog.fields[0] = TextInput::new("Store");
        dialog.fields[1] = TextInput::new("Downtown");
        dialog.fields[2] = TextInput::new("1 Main St");
        dialog.fields[4] = TextInput::new(" 555-0101 ");

        let form = dialog.confirm().unwrap();
        assert_eq!(form.name, "Store");
        assert_eq!(form.manager, None);
        assert_eq!(form.phone.as_deref(), Some("555-0101"));
    }

    #[test]
    fn test_focus_wraps() {
        let mut dialog = StoreFormDialog::create();
        dialog.prev_field();
        assert_eq!(dialog.focus, 4);
        dialog.next_field();
        assert_eq!(dialog.focus, 0);
    }
}
