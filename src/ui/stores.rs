//! Store and marker list panes.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem},
};

use crate::app::{App, Focus};
use crate::markers::abbreviate;

pub fn render_store_list(frame: &mut Frame, app: &mut App, area: Rect) {
    let items: Vec<ListItem> = app
        .stores
        .iter()
        .map(|store| {
            let stats = app.store_stats.get(&store.id).copied().unwrap_or_default();
            let plan_marker = if store.floor_plan_path.is_some() {
                " "
            } else {
                "!"
            };
            ListItem::new(Line::from(vec![
                Span::styled(
                    plan_marker,
                    Style::default().fg(Color::Red),
                ),
                Span::raw(format!(" {} ", store.name)),
                Span::styled(
                    format!(
                        "{}/{}",
                        stats.completed_locations, stats.total_locations
                    ),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let border_color = if app.focus == Focus::Stores {
        Color::Blue
    } else {
        Color::DarkGray
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .title(format!(" Stores ({}) ", app.stores.len())),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );

    // The scroll offset lives on the App so mouse clicks can be mapped back
    // to the rows the list actually drew
    if app.stores.is_empty() {
        app.store_list_state.select(None);
    } else {
        app.store_list_state
            .select(Some(app.store_index.min(app.stores.len() - 1)));
    }

    frame.render_stateful_widget(list, area, &mut app.store_list_state);
}

pub fn render_location_list(frame: &mut Frame, app: &mut App, area: Rect) {
    let items: Vec<ListItem> = app
        .locations
        .iter()
        .map(|location| {
            let selected = app.selected_location.as_deref() == Some(location.id.as_str());
            let marker_style = if selected {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Cyan)
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<4}", abbreviate(&location.name)), marker_style),
                Span::raw(location.name.clone()),
            ]))
        })
        .collect();

    let border_color = if app.focus == Focus::Locations {
        Color::Blue
    } else {
        Color::DarkGray
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .title(format!(" Markers ({}) ", app.locations.len())),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );

    if app.locations.is_empty() {
        app.location_list_state.select(None);
    } else {
        app.location_list_state
            .select(Some(app.location_index.min(app.locations.len() - 1)));
    }

    frame.render_stateful_widget(list, area, &mut app.location_list_state);
}
