pub mod confirm_dialog;
mod detail;
mod dialogs;
pub mod floor_plan;
pub mod input;
pub mod measurement_form;
pub mod name_dialog;
pub mod password_dialog;
mod status_bar;
pub mod store_form;
mod stores;
pub mod upload_dialog;

use ratatui::prelude::*;

use crate::app::{App, AppMode};

/// Pane rectangles, computed identically by the renderer and the mouse
/// handler so click coordinates always agree with what is on screen.
pub struct Panes {
    pub stores: Rect,
    pub locations: Rect,
    pub floor_plan: Rect,
    pub detail: Rect,
    pub status: Rect,
}

pub fn layout(area: Rect) -> Panes {
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(24), // store + marker lists
            Constraint::Percentage(46), // floor plan
            Constraint::Percentage(30), // detail
        ])
        .split(main[0]);

    let lists = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(columns[0]);

    Panes {
        stores: lists[0],
        locations: lists[1],
        floor_plan: columns[1],
        detail: columns[2],
        status: main[1],
    }
}

/// The floor-plan drawing area inside the pane border; marker coordinate
/// mapping is relative to this Rect.
pub fn floor_plan_inner(area: Rect) -> Rect {
    Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    }
}

pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();
    let panes = layout(area);

    stores::render_store_list(frame, app, panes.stores);
    stores::render_location_list(frame, app, panes.locations);
    floor_plan::render(frame, app, panes.floor_plan);
    detail::render(frame, app, panes.detail);
    status_bar::render(frame, app, panes.status);

    match app.mode {
        AppMode::Help => dialogs::render_help(frame, area),
        AppMode::StoreForm => {
            if let Some(ref dialog) = app.store_form {
                store_form::render(frame, dialog, area);
            }
        }
        AppMode::NameEntry => {
            if let Some(ref dialog) = app.name_dialog {
                name_dialog::render(frame, dialog, area);
            }
        }
        AppMode::MeasurementForm => {
            if let Some(ref dialog) = app.measurement_dialog {
                measurement_form::render(frame, dialog, area);
            }
        }
        AppMode::Password => {
            if let Some(ref dialog) = app.password_dialog {
                password_dialog::render(frame, dialog, area);
            }
        }
        AppMode::Confirm => {
            if let Some(ref dialog) = app.confirm_dialog {
                confirm_dialog::render(frame, dialog, area);
            }
        }
        AppMode::Upload => {
            if let Some(ref dialog) = app.upload_dialog {
                upload_dialog::render(frame, dialog, area);
            }
        }
        AppMode::Normal => {}
    }
}
