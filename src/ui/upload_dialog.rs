//! Path entry for floor-plan and photo uploads.
//!
//! The path may name a single file or a directory; directories expand to
//! their files (non-recursive) so a batch of photos can be uploaded in one
//! go. Non-image files in the batch are rejected per file by the pipeline,
//! not here.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};
use std::path::PathBuf;

use super::input::TextInput;
use crate::db::PhotoKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    FloorPlan,
    Photos(PhotoKind),
}

pub struct UploadDialog {
    pub mode: UploadMode,
    pub input: TextInput,
    pub error: Option<String>,
}

impl UploadDialog {
    pub fn floor_plan() -> Self {
        Self {
            mode: UploadMode::FloorPlan,
            input: TextInput::default(),
            error: None,
        }
    }

    pub fn photos() -> Self {
        Self {
            mode: UploadMode::Photos(PhotoKind::Audit),
            input: TextInput::default(),
            error: None,
        }
    }

    /// The upload UI offers audit and install; briefs come from elsewhere.
    pub fn toggle_kind(&mut self) {
        if let UploadMode::Photos(kind) = self.mode {
            let next = match kind {
                PhotoKind::Audit => PhotoKind::Install,
                _ => PhotoKind::Audit,
            };
            self.mode = UploadMode::Photos(next);
        }
    }

    /// Resolve the entered path into the files to upload. A directory
    /// expands to its files, sorted by name; an empty result is an error.
    pub fn confirm(&mut self) -> Option<Vec<PathBuf>> {
        let raw = self.input.value.trim();
        if raw.is_empty() {
            self.error = Some("Path is required".to_string());
            return None;
        }
        let path = PathBuf::from(raw);
        if !path.exists() {
            self.error = Some(format!("No such path: {}", path.display()));
            return None;
        }
        if path.is_dir() {
            let mut files: Vec<PathBuf> = match std::fs::read_dir(&path) {
                Ok(dir) => dir
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| p.is_file())
                    .collect(),
                Err(e) => {
                    self.error = Some(format!("Cannot read {}: {}", path.display(), e));
                    return None;
                }
            };
            if files.is_empty() {
                self.error = Some(format!("No files in {}", path.display()));
                return None;
            }
            files.sort();
            Some(files)
        } else {
            Some(vec![path])
        }
    }
}

pub fn render(frame: &mut Frame, dialog: &UploadDialog, area: Rect) {
    let dialog_width = 64.min(area.width.saturating_sub(4));
    let dialog_height = 10;

    let x = (area.width - dialog_width) / 2;
    let y = (area.height.saturating_sub(dialog_height)) / 2;

    let dialog_area = Rect::new(x, y, dialog_width, dialog_height);

    frame.render_widget(Clear, dialog_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // kind line / hint
            Constraint::Length(3), // path input
            Constraint::Length(1), // error
            Constraint::Length(1), // footer
        ])
        .margin(1)
        .split(dialog_area);

    let title = match dialog.mode {
        UploadMode::FloorPlan => " Upload Floor Plan ",
        UploadMode::Photos(_) => " Upload Photos ",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title);
    frame.render_widget(block, dialog_area);

    let hint = match dialog.mode {
        UploadMode::FloorPlan => Line::from("Image file to use as the floor plan:"),
        UploadMode::Photos(kind) => Line::from(vec![
            Span::raw("Kind: "),
            Span::styled(
                kind.label(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("  (Tab to switch)", Style::default().fg(Color::DarkGray)),
        ]),
    };
    frame.render_widget(Paragraph::new(hint), chunks[0]);

    let input = Paragraph::new(dialog.input.display_line(true, false)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" File or directory ")
            .border_style(Style::default().fg(Color::Yellow)),
    );
    frame.render_widget(input, chunks[1]);

    if let Some(ref error) = dialog.error {
        let error = Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red));
        frame.render_widget(error, chunks[2]);
    }

    let footer = Paragraph::new("Enter: upload | Esc: cancel")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_path_is_rejected() {
        let mut dialog = UploadDialog::floor_plan();
        assert!(dialog.confirm().is_none());
        assert!(dialog.error.is_some());
    }

    #[test]
    fn test_missing_path_is_rejected() {
        let mut dialog = UploadDialog::photos();
        dialog.input = TextInput::new("/definitely/not/here.png");
        assert!(dialog.confirm().is_none());
    }

    #[test]
    fn test_directory_expands_to_sorted_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let mut dialog = UploadDialog::photos();
        dialog.input = TextInput::new(dir.path().to_string_lossy().to_string());
        let files = dialog.confirm().unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.jpg"));
    }

    #[test]
    fn test_kind_toggles_between_audit_and_install() {
        let mut dialog = UploadDialog::photos();
        assert_eq!(dialog.mode, UploadMode::Photos(PhotoKind::Audit));
        dialog.toggle_kind();
        assert_eq!(dialog.mode, UploadMode::Photos(PhotoKind::Install));
        dialog.toggle_kind();
        assert_eq!(dialog.mode, UploadMode::Photos(PhotoKind::Audit));
    }
}
