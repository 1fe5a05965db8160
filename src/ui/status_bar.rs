use ratatui::{prelude::*, widgets::Paragraph};

use crate::app::App;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    // A transient message takes over the whole bar
    if let Some(ref message) = app.status_message {
        let line = Line::from(vec![Span::styled(
            format!(" {} ", message),
            Style::default().fg(Color::Yellow).bg(Color::DarkGray),
        )]);
        frame.render_widget(Paragraph::new(line), area);
        return;
    }

    let mut spans = Vec::new();

    // Left: edit-mode indicator
    if app.edit_mode() {
        spans.push(Span::styled(
            " EDIT ",
            Style::default().fg(Color::Black).bg(Color::Green),
        ));
    } else {
        spans.push(Span::styled(
            " LOCKED ",
            Style::default().fg(Color::White).bg(Color::DarkGray),
        ));
    }

    // Store / marker summary
    let summary = match app.selected_store() {
        Some(store) => format!(" {} | {} markers ", store.name, app.locations.len()),
        None => format!(" {} stores ", app.stores.len()),
    };
    spans.push(Span::styled(summary, Style::default().fg(Color::Gray)));

    // Running task indicators
    let running_tasks = app.task_manager.running_tasks();
    if !running_tasks.is_empty() {
        let indicators: Vec<String> = running_tasks
            .iter()
            .map(|task| {
                if let Some(ref progress) = task.progress {
                    format!("[{}:{}%]", task.task_type.short_name(), progress.percent())
                } else {
                    format!("[{}:...]", task.task_type.short_name())
                }
            })
            .collect();
        spans.push(Span::styled(
            format!(" {} ", indicators.join(" ")),
            Style::default().fg(Color::Cyan),
        ));
    }

    let content_width = spans_width(&spans);
    let help_text = " a:add marker  m:measure  p:photos  ?:help  q:quit ";
    let available = area.width as usize;
    if available > content_width + help_text.len() {
        spans.push(Span::raw(" ".repeat(available - content_width - help_text.len())));
    }

    spans.push(Span::styled(
        help_text,
        Style::default().fg(Color::White).bg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Width of the bar content in cells, not bytes; multibyte store names
/// would otherwise push the right-aligned help block out of place.
fn spans_width(spans: &[Span]) -> usize {
    spans.iter().map(|s| s.content.chars().count()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_width_counts_chars_not_bytes() {
        let spans = [Span::raw(" Café Štúrovo ")];
        assert_eq!(spans_width(&spans), 14);
        assert!(" Café Štúrovo ".len() > 14);
    }

    #[test]
    fn test_spans_width_sums_all_spans() {
        let spans = [Span::raw(" EDIT "), Span::raw(" 3 stores ")];
        assert_eq!(spans_width(&spans), 16);
    }
}
