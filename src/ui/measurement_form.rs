//! Measurement form, conditioned on the measurement type tag.
//!
//! The form edits the whole `LocationData` record for one marker and builds
//! the measurement payload through exhaustive matching on the selected type,
//! so the discriminator and the payload shape can never disagree.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

use super::input::TextInput;
use crate::db::{LocationData, LocationDataForm, Measurement, MeasurementType};

pub struct MeasurementDialog {
    pub location_id: String,
    pub kind: MeasurementType,
    /// First measurement field (front/back, top, or description).
    pub m1: TextInput,
    /// Second measurement field (sides or bottom); unused for walls.
    pub m2: TextInput,
    pub audit_date: TextInput,
    pub install_date: TextInput,
    pub notes: TextInput,
    /// 0 is the type selector, then the visible inputs in order.
    pub focus: usize,
}

impl MeasurementDialog {
    pub fn new(location_id: String, existing: Option<&LocationData>) -> Self {
        let mut dialog = Self {
            location_id,
            kind: MeasurementType::Column,
            m1: TextInput::default(),
            m2: TextInput::default(),
            audit_date: TextInput::default(),
            install_date: TextInput::default(),
            notes: TextInput::default(),
            focus: 0,
        };
        if let Some(data) = existing {
            dialog.kind = data.measurement.kind();
            match &data.measurement {
                Measurement::Column { front_back, sides } => {
                    dialog.m1 = TextInput::new(front_back.clone());
                    dialog.m2 = TextInput::new(sides.clone());
                }
                Measurement::MirrorDoor { top, bottom } => {
                    dialog.m1 = TextInput::new(top.clone());
                    dialog.m2 = TextInput::new(bottom.clone());
                }
                Measurement::Wall { description } => {
                    dialog.m1 = TextInput::new(description.clone());
                }
            }
            dialog.audit_date = TextInput::new(data.last_audit_date.clone().unwrap_or_default());
            dialog.install_date =
                TextInput::new(data.last_install_date.clone().unwrap_or_default());
            dialog.notes = TextInput::new(data.notes.clone().unwrap_or_default());
        }
        dialog
    }

    fn measurement_fields(&self) -> usize {
        match self.kind {
            MeasurementType::Column | MeasurementType::MirrorDoor => 2,
            MeasurementType::Wall => 1,
        }
    }

    /// Labels of the measurement inputs for the current type.
    pub fn measurement_labels(&self) -> (&'static str, Option<&'static str>) {
        match self.kind {
            MeasurementType::Column => ("Front/Back Size", Some("Sides Size")),
            MeasurementType::MirrorDoor => ("Top Size", Some("Bottom Size")),
            MeasurementType::Wall => ("Description", None),
        }
    }

    fn field_count(&self) -> usize {
        // type selector + measurement inputs + audit date + install date + notes
        1 + self.measurement_fields() + 3
    }

    pub fn next_field(&mut self) {
        self.focus = (self.focus + 1) % self.field_count();
    }

    pub fn prev_field(&mut self) {
        let count = self.field_count();
        self.focus = (self.focus + count - 1) % count;
    }

    /// Switch the measurement type. The size inputs reset because their
    /// meaning changes with the type; dates and notes survive.
    pub fn set_kind(&mut self, kind: MeasurementType) {
        if self.kind != kind {
            self.kind = kind;
            self.m1 = TextInput::default();
            self.m2 = TextInput::default();
            self.focus = self.focus.min(self.field_count() - 1);
        }
    }

    pub fn cycle_kind(&mut self, forward: bool) {
        let all = MeasurementType::ALL;
        let i = all.iter().position(|k| *k == self.kind).unwrap_or(0);
        let next = if forward {
            (i + 1) % all.len()
        } else {
            (i + all.len() - 1) % all.len()
        };
        self.set_kind(all[next]);
    }

    /// The input under focus, or None when the type selector is focused.
    pub fn focused(&mut self) -> Option<&mut TextInput> {
        let measurement_fields = self.measurement_fields();
        match self.focus {
            0 => None,
            1 => Some(&mut self.m1),
            2 if measurement_fields == 2 => Some(&mut self.m2),
            i => {
                let offset = i - 1 - measurement_fields;
                match offset {
                    0 => Some(&mut self.audit_date),
                    1 => Some(&mut self.install_date),
                    _ => Some(&mut self.notes),
                }
            }
        }
    }

    pub fn build_form(&self) -> LocationDataForm {
        let measurement = match self.kind {
            MeasurementType::Column => Measurement::Column {
                front_back: self.m1.value.trim().to_string(),
                sides: self.m2.value.trim().to_string(),
            },
            MeasurementType::MirrorDoor => Measurement::MirrorDoor {
                top: self.m1.value.trim().to_string(),
                bottom: self.m2.value.trim().to_string(),
            },
            MeasurementType::Wall => Measurement::Wall {
                description: self.m1.value.trim().to_string(),
            },
        };
        LocationDataForm {
            measurement,
            notes: self.notes.as_optional(),
            last_audit_date: self.audit_date.as_optional(),
            last_install_date: self.install_date.as_optional(),
        }
    }
}

pub fn render(frame: &mut Frame, dialog: &MeasurementDialog, area: Rect) {
    let dialog_width = 62.min(area.width.saturating_sub(4));
    let dialog_height = 24.min(area.height.saturating_sub(2));

    let x = (area.width - dialog_width) / 2;
    let y = (area.height.saturating_sub(dialog_height)) / 2;

    let dialog_area = Rect::new(x, y, dialog_width, dialog_height);

    frame.render_widget(Clear, dialog_area);

    let two_fields = dialog.measurement_fields() == 2;
    let mut constraints = vec![
        Constraint::Length(2), // type selector
        Constraint::Length(3), // m1
    ];
    if two_fields {
        constraints.push(Constraint::Length(3)); // m2
    }
    constraints.extend([
        Constraint::Length(3), // audit date
        Constraint::Length(3), // install date
        Constraint::Length(3), // notes
        Constraint::Length(1), // footer
    ]);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .margin(1)
        .split(dialog_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(" Measurements ")
        .title_style(Style::default().add_modifier(Modifier::BOLD));
    frame.render_widget(block, dialog_area);

    // Type selector
    let mut spans = vec![Span::styled("Type: ", Style::default().fg(Color::DarkGray))];
    for kind in MeasurementType::ALL {
        let selected = kind == dialog.kind;
        let style = match (selected, dialog.focus == 0) {
            (true, true) => Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            (true, false) => Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            _ => Style::default().fg(Color::DarkGray),
        };
        spans.push(Span::styled(format!(" {} ", kind.label()), style));
        spans.push(Span::raw(" "));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), chunks[0]);

    let (label1, label2) = dialog.measurement_labels();
    let mut inputs: Vec<(&str, &TextInput)> = vec![(label1, &dialog.m1)];
    if let Some(label2) = label2 {
        inputs.push((label2, &dialog.m2));
    }
    inputs.push(("Last Audit Date", &dialog.audit_date));
    inputs.push(("Last Install Date", &dialog.install_date));
    inputs.push(("Notes", &dialog.notes));

    for (i, (label, input)) in inputs.iter().enumerate() {
        let focused = dialog.focus == i + 1;
        let border_color = if focused { Color::Yellow } else { Color::DarkGray };
        let widget = Paragraph::new(input.display_line(focused, false)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", label))
                .border_style(Style::default().fg(border_color)),
        );
        frame.render_widget(widget, chunks[i + 1]);
    }

    let footer =
        Paragraph::new("Tab: next field | \u{2190}/\u{2192}: change type | Enter: save | Esc: cancel")
            .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[chunks.len() - 1]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_form_matches_selected_type() {
        let mut dialog = MeasurementDialog::new("l1".to_string(), None);
        dialog.m1 = TextInput::new("42cm");
        dialog.m2 = TextInput::new("30cm");
        let form = dialog.build_form();
        assert_eq!(
            form.measurement,
            Measurement::Column {
                front_back: "42cm".to_string(),
                sides: "30cm".to_string(),
            }
        );
    }

    #[test]
    fn test_switching_kind_resets_size_inputs() {
        let mut dialog = MeasurementDialog::new("l1".to_string(), None);
        dialog.m1 = TextInput::new("42cm");
        dialog.notes = TextInput::new("keep me");
        dialog.set_kind(MeasurementType::Wall);

        let form = dialog.build_form();
        assert_eq!(
            form.measurement,
            Measurement::Wall {
                description: String::new(),
            }
        );
        assert_eq!(form.notes.as_deref(), Some("keep me"));
    }

    #[test]
    fn test_prefill_from_existing_record() {
        let existing = LocationData {
            id: "d1".to_string(),
            location_id: "l1".to_string(),
            measurement: Measurement::MirrorDoor {
                top: "180cm".to_string(),
                bottom: "175cm".to_string(),
            },
            notes: None,
            last_audit_date: Some("2026-08-01".to_string()),
            last_install_date: None,
            last_edited_by: None,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let dialog = MeasurementDialog::new("l1".to_string(), Some(&existing));
        assert_eq!(dialog.kind, MeasurementType::MirrorDoor);
        assert_eq!(dialog.m1.value, "180cm");
        assert_eq!(dialog.audit_date.value, "2026-08-01");
    }

    #[test]
    fn test_focus_skips_second_field_for_walls() {
        let mut dialog = MeasurementDialog::new("l1".to_string(), None);
        dialog.set_kind(MeasurementType::Wall);
        // type, description, audit, install, notes
        assert_eq!(dialog.field_count(), 5);
        dialog.audit_date = TextInput::new("2026-08-01");
        dialog.focus = 2;
        assert_eq!(dialog.focused().unwrap().value, "2026-08-01");
    }
}
