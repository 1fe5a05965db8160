use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

pub fn render_help(frame: &mut Frame, area: Rect) {
    let dialog_width = 58.min(area.width.saturating_sub(4));
    let dialog_height = 31.min(area.height.saturating_sub(4));

    let x = (area.width - dialog_width) / 2;
    let y = (area.height - dialog_height) / 2;

    let dialog_area = Rect::new(x, y, dialog_width, dialog_height);

    frame.render_widget(Clear, dialog_area);

    let heading =
        |text: &'static str| Line::from(Span::styled(text, Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan)));

    let help_text = vec![
        heading("Navigation"),
        Line::from(""),
        Line::from("  j / ↓      Move down in the focused list"),
        Line::from("  k / ↑      Move up in the focused list"),
        Line::from("  Tab        Switch focus (stores / markers / photos)"),
        Line::from("  Enter      Select the highlighted marker"),
        Line::from("  Esc        Deselect marker / cancel placement"),
        Line::from(""),
        heading("Stores"),
        Line::from(""),
        Line::from("  n          New store"),
        Line::from("  e          Edit selected store"),
        Line::from("  u          Upload floor plan for selected store"),
        Line::from(""),
        heading("Markers"),
        Line::from(""),
        Line::from("  a          Add marker (then click on the floor plan)"),
        Line::from("  Drag       Move a marker with the mouse"),
        Line::from("  r          Rename selected marker"),
        Line::from("  m          Edit measurements of selected marker"),
        Line::from("  p          Upload photos for selected marker"),
        Line::from("  d          Delete the focused store/marker/photo"),
        Line::from(""),
        heading("Session"),
        Line::from(""),
        Line::from("  L          Lock edit mode"),
        Line::from("  q          Quit"),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key to close",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let paragraph = Paragraph::new(help_text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Help "),
    );
    frame.render_widget(paragraph, dialog_area);
}
