//! Detail pane: store metadata, or the selected marker's measurement data
//! and photos.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::app::{App, Focus};
use crate::db::{Location, Measurement, PhotoKind, Store};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let border_color = if app.focus == Focus::Photos {
        Color::Blue
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Details ");

    match (app.selected_store(), app.selected_location()) {
        (Some(_), Some(location)) => {
            let location = location.clone();
            render_location_detail(frame, app, &location, block, area);
        }
        (Some(store), None) => {
            let store = store.clone();
            render_store_detail(frame, app, &store, block, area);
        }
        _ => {
            let paragraph = Paragraph::new("No store selected")
                .block(block)
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(paragraph, area);
        }
    }
}

fn field_line(label: &str, value: impl Into<String>) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{}: ", label), Style::default().fg(Color::DarkGray)),
        Span::raw(value.into()),
    ])
}

fn render_store_detail(frame: &mut Frame, app: &App, store: &Store, block: Block, area: Rect) {
    let stats = app.store_stats.get(&store.id).copied().unwrap_or_default();

    let mut lines = vec![
        Line::from(Span::styled(
            store.name.clone(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        field_line("Location", store.location.clone()),
        field_line("Address", store.address.clone()),
        field_line("Manager", store.manager.clone().unwrap_or_else(|| "-".to_string())),
        field_line("Phone", store.phone.clone().unwrap_or_else(|| "-".to_string())),
        Line::from(""),
        field_line(
            "Floor plan",
            if store.floor_plan_path.is_some() {
                "uploaded"
            } else {
                "missing (press u)"
            },
        ),
        field_line(
            "Markers",
            format!(
                "{} ({} with measurements)",
                stats.total_locations, stats.completed_locations
            ),
        ),
        Line::from(""),
        field_line(
            "Last edited by",
            store.last_edited_by.clone().unwrap_or_else(|| "-".to_string()),
        ),
        field_line("Updated", store.updated_at.clone()),
    ];

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Select a marker to see its data",
        Style::default().fg(Color::DarkGray),
    )));

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_location_detail(
    frame: &mut Frame,
    app: &App,
    location: &Location,
    block: Block,
    area: Rect,
) {
    let mut lines = vec![
        Line::from(Span::styled(
            location.name.clone(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        field_line("Position", format!("{:.1}%, {:.1}%", location.x, location.y)),
        Line::from(""),
    ];

    match &app.location_data {
        Some(data) => {
            lines.push(Line::from(Span::styled(
                format!("Measurements ({})", data.measurement.kind().label()),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            match &data.measurement {
                Measurement::Column { front_back, sides } => {
                    lines.push(field_line("Front/Back", front_back.clone()));
                    lines.push(field_line("Sides", sides.clone()));
                }
                Measurement::MirrorDoor { top, bottom } => {
                    lines.push(field_line("Top", top.clone()));
                    lines.push(field_line("Bottom", bottom.clone()));
                }
                Measurement::Wall { description } => {
                    lines.push(field_line("Description", description.clone()));
                }
            }
            lines.push(field_line(
                "Last audit",
                data.last_audit_date.clone().unwrap_or_else(|| "-".to_string()),
            ));
            lines.push(field_line(
                "Last install",
                data.last_install_date
                    .clone()
                    .unwrap_or_else(|| "-".to_string()),
            ));
            if let Some(notes) = &data.notes {
                lines.push(field_line("Notes", notes.clone()));
            }
            if let Some(editor) = &data.last_edited_by {
                lines.push(field_line("Edited by", editor.clone()));
            }
        }
        None => {
            lines.push(Line::from(Span::styled(
                "No measurements yet (press m)",
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("Photos ({})", app.photos.len()),
        Style::default().add_modifier(Modifier::BOLD),
    )));

    for kind in PhotoKind::ALL {
        let of_kind: Vec<usize> = app
            .photos
            .iter()
            .enumerate()
            .filter(|(_, p)| p.kind == kind)
            .map(|(i, _)| i)
            .collect();
        if of_kind.is_empty() {
            continue;
        }
        lines.push(Line::from(Span::styled(
            format!("  {}", kind.label()),
            Style::default().fg(Color::DarkGray),
        )));
        for i in of_kind {
            let photo = &app.photos[i];
            let cursor = app.focus == Focus::Photos && app.photo_index == i;
            let style = if cursor {
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let uploader = photo
                .uploaded_by
                .clone()
                .map(|u| format!(" by {}", u))
                .unwrap_or_default();
            lines.push(Line::from(Span::styled(
                format!("    {}{}", photo.uploaded_at, uploader),
                style,
            )));
        }
    }

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}
