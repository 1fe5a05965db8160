//! Floor-plan pane: the plan image with percentage-positioned markers
//! overlaid on top.

use image::DynamicImage;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};
use ratatui_image::{picker::Picker, protocol::StatefulProtocol, Resize, StatefulImage};
use std::path::PathBuf;
use std::sync::mpsc;

use crate::app::App;
use crate::config::ImageProtocol;
use crate::markers::{abbreviate, cell_from_position};

pub struct FloorPlanView {
    /// Image picker for protocol detection.
    picker: Option<Picker>,
    /// Cache key of the plan currently shown (blob key + updated stamp).
    current: Option<String>,
    protocol: Option<StatefulProtocol>,
    loading: Option<String>,
    receiver: mpsc::Receiver<(String, DynamicImage)>,
    sender: mpsc::Sender<(String, DynamicImage)>,
}

impl FloorPlanView {
    pub fn new(protocol: ImageProtocol) -> Self {
        let picker = match protocol {
            ImageProtocol::None => None,
            _ => Picker::from_query_stdio().ok(),
        };
        let (tx, rx) = mpsc::channel();
        Self {
            picker,
            current: None,
            protocol: None,
            loading: None,
            receiver: rx,
            sender: tx,
        }
    }

    /// Poll for completed async decodes.
    pub fn poll_async_loads(&mut self) {
        while let Ok((key, img)) = self.receiver.try_recv() {
            if self.loading.as_deref() == Some(key.as_str()) {
                self.loading = None;
                if let Some(ref mut picker) = self.picker {
                    self.protocol = Some(picker.new_resize_protocol(img));
                    self.current = Some(key);
                }
            }
        }
    }

    /// Point the view at a plan file. A changed key starts an async decode;
    /// the previous image keeps rendering until the new one is ready.
    pub fn show(&mut self, key: &str, path: PathBuf) {
        if self.picker.is_none()
            || self.current.as_deref() == Some(key)
            || self.loading.as_deref() == Some(key)
        {
            return;
        }
        self.loading = Some(key.to_string());
        let key = key.to_string();
        let sender = self.sender.clone();
        std::thread::spawn(move || {
            match image::ImageReader::open(&path).and_then(|r| {
                r.decode()
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
            }) {
                Ok(img) => {
                    let _ = sender.send((key, img));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to load floor plan {}", path.display());
                }
            }
        });
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.protocol = None;
        self.loading = None;
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }
}

pub fn render(frame: &mut Frame, app: &mut App, area: Rect) {
    let title = match (app.selected_store(), app.placing) {
        (Some(store), true) => format!(" {} — click to place marker, Esc cancels ", store.name),
        (Some(store), false) => format!(" {} ", store.name),
        (None, _) => " Floor Plan ".to_string(),
    };
    let border_color = if app.placing {
        Color::Yellow
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width < 2 || inner.height < 2 {
        return;
    }

    let has_plan = app
        .selected_store()
        .map(|s| s.floor_plan_path.is_some())
        .unwrap_or(false);

    if !has_plan {
        let message = if app.selected_store().is_some() {
            "No floor plan uploaded (press u)"
        } else {
            "Select a store"
        };
        let paragraph = Paragraph::new(message)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        let y = inner.y + inner.height / 2;
        frame.render_widget(paragraph, Rect::new(inner.x, y, inner.width, 1));
        return;
    }

    if let Some(ref mut protocol) = app.floor_plan.protocol {
        let image = StatefulImage::new(None).resize(Resize::Fit(None));
        frame.render_stateful_widget(image, inner, protocol);
    } else if app.floor_plan.is_loading() {
        let paragraph = Paragraph::new("Loading floor plan...")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        let y = inner.y + inner.height / 2;
        frame.render_widget(paragraph, Rect::new(inner.x, y, inner.width, 1));
    }

    render_markers(frame, app, inner);
}

fn render_markers(frame: &mut Frame, app: &App, inner: Rect) {
    for location in &app.locations {
        let dragging = app.dragging.as_deref() == Some(location.id.as_str())
            && app.drag_position.is_some();
        let (x, y) = if dragging {
            app.drag_position.unwrap_or((location.x, location.y))
        } else {
            (location.x, location.y)
        };
        let (col, row) = cell_from_position(x, y, inner);

        let label = abbreviate(&location.name);
        let width = (label.chars().count() as u16)
            .max(1)
            .min(inner.right().saturating_sub(col));
        if width == 0 || row >= inner.bottom() {
            continue;
        }

        let selected = app.selected_location.as_deref() == Some(location.id.as_str());
        let style = if dragging {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Green)
                .add_modifier(Modifier::BOLD)
        } else if selected {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .fg(Color::White)
                .bg(Color::Blue)
                .add_modifier(Modifier::BOLD)
        };

        let widget = Paragraph::new(Span::styled(label, style));
        frame.render_widget(widget, Rect::new(col, row, width, 1));
    }
}
