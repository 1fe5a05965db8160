use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::prelude::*;
use ratatui::widgets::ListState;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::cache::QueryCache;
use crate::config::Config;
use crate::db::{Database, Location, LocationData, Photo, PhotoKind, Store, StoreStats};
use crate::images::ImagePipeline;
use crate::markers::{marker_at_cell, position_from_cell};
use crate::session::EditSession;
use crate::storage::BlobStore;
use crate::tasks::{BackgroundTaskManager, TaskProgress, TaskType, TaskUpdate};
use crate::ui;
use crate::ui::confirm_dialog::{ConfirmDialog, ConfirmTarget};
use crate::ui::floor_plan::FloorPlanView;
use crate::ui::measurement_form::MeasurementDialog;
use crate::ui::name_dialog::{NameDialog, NamePurpose};
use crate::ui::password_dialog::PasswordDialog;
use crate::ui::store_form::StoreFormDialog;
use crate::ui::upload_dialog::{UploadDialog, UploadMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Normal,
    Help,
    StoreForm,
    NameEntry,
    MeasurementForm,
    Password,
    Confirm,
    Upload,
}

/// Which pane j/k and d act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Stores,
    Locations,
    Photos,
}

/// A privileged action deferred until the password dialog unlocks edit mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    CreateStore,
    EditStore,
    Delete,
    ArmPlacing,
    RenameLocation,
    EditMeasurements,
    UploadFloorPlan,
    UploadPhotos,
}

pub struct App {
    pub config: Config,
    pub db: Database,
    pub blobs: BlobStore,
    pub cache: QueryCache,
    pub session: EditSession,
    pub task_manager: BackgroundTaskManager,

    pub mode: AppMode,
    pub focus: Focus,
    pub should_quit: bool,
    pub status_message: Option<String>,
    unlocked: bool,

    // View data, refreshed through the query cache
    pub stores: Vec<Store>,
    pub store_stats: HashMap<String, StoreStats>,
    pub store_index: usize,
    pub locations: Vec<Location>,
    pub location_index: usize,
    pub selected_location: Option<String>,
    pub location_data: Option<LocationData>,
    pub photos: Vec<Photo>,
    pub photo_index: usize,

    // List scroll state, shared with the renderer so mouse clicks map to
    // the rows actually on screen
    pub store_list_state: ListState,
    pub location_list_state: ListState,

    // Marker editor state
    pub placing: bool,
    pub dragging: Option<String>,
    pub drag_position: Option<(f64, f64)>,

    pub floor_plan: FloorPlanView,

    // Dialogs
    pub store_form: Option<StoreFormDialog>,
    pub name_dialog: Option<NameDialog>,
    pub measurement_dialog: Option<MeasurementDialog>,
    pub password_dialog: Option<PasswordDialog>,
    pub confirm_dialog: Option<ConfirmDialog>,
    pub upload_dialog: Option<UploadDialog>,
    pending_action: Option<PendingAction>,
}

impl App {
    pub fn new(config: Config, db: Database) -> Result<Self> {
        let blobs = BlobStore::new(config.storage.root.clone());
        blobs.ensure_root()?;
        let session = EditSession::new(
            Config::session_state_path(),
            config.session.secret.clone(),
            config.session.timeout_hours,
        );
        let unlocked = session.is_unlocked();
        let floor_plan = FloorPlanView::new(config.preview.protocol);

        let mut app = Self {
            config,
            db,
            blobs,
            cache: QueryCache::new(),
            session,
            task_manager: BackgroundTaskManager::new(),
            mode: AppMode::Normal,
            focus: Focus::Stores,
            should_quit: false,
            status_message: None,
            unlocked,
            stores: Vec::new(),
            store_stats: HashMap::new(),
            store_index: 0,
            locations: Vec::new(),
            location_index: 0,
            selected_location: None,
            location_data: None,
            photos: Vec::new(),
            photo_index: 0,
            store_list_state: ListState::default(),
            location_list_state: ListState::default(),
            placing: false,
            dragging: None,
            drag_position: None,
            floor_plan,
            store_form: None,
            name_dialog: None,
            measurement_dialog: None,
            password_dialog: None,
            confirm_dialog: None,
            upload_dialog: None,
            pending_action: None,
        };
        app.refresh()?;
        Ok(app)
    }

    /// Whether edit mode is on. This is the cached answer; privileged
    /// actions re-check the session so an expiry mid-run locks them out.
    pub fn edit_mode(&self) -> bool {
        self.unlocked
    }

    pub fn selected_store(&self) -> Option<&Store> {
        self.stores.get(self.store_index)
    }

    pub fn selected_location(&self) -> Option<&Location> {
        let id = self.selected_location.as_deref()?;
        self.locations.iter().find(|l| l.id == id)
    }

    /// Re-read every collection the panes render and re-point the floor
    /// plan. Reads go through the cache, so this is cheap to call after
    /// every mutation and selection change.
    pub fn refresh(&mut self) -> Result<()> {
        self.stores = self.cache.stores(&self.db)?;
        if self.store_index >= self.stores.len() {
            self.store_index = self.stores.len().saturating_sub(1);
        }

        self.store_stats.clear();
        for store in &self.stores {
            self.store_stats
                .insert(store.id.clone(), self.db.store_stats(&store.id)?);
        }

        let store = self.selected_store().cloned();
        match &store {
            Some(store) => {
                self.locations = self.cache.locations(&self.db, &store.id)?;
                if self.location_index >= self.locations.len() {
                    self.location_index = self.locations.len().saturating_sub(1);
                }
                if let Some(id) = self.selected_location.clone() {
                    if !self.locations.iter().any(|l| l.id == id) {
                        self.selected_location = None;
                    }
                }
                match &store.floor_plan_path {
                    Some(blob_key) => {
                        let key = format!("{}@{}", blob_key, store.updated_at);
                        let path = self.blobs.path(blob_key);
                        self.floor_plan.show(&key, path);
                    }
                    None => self.floor_plan.clear(),
                }
            }
            None => {
                self.locations.clear();
                self.selected_location = None;
                self.floor_plan.clear();
            }
        }

        match self.selected_location.clone() {
            Some(id) => {
                self.location_data = self.cache.location_data(&self.db, &id)?;
                self.photos = self.cache.photos(&self.db, &id)?;
                if self.photo_index >= self.photos.len() {
                    self.photo_index = self.photos.len().saturating_sub(1);
                }
            }
            None => {
                self.location_data = None;
                self.photos.clear();
                self.photo_index = 0;
                if self.focus == Focus::Photos {
                    self.focus = Focus::Locations;
                }
            }
        }

        Ok(())
    }

    fn select_store(&mut self, index: usize) -> Result<()> {
        if index < self.stores.len() && index != self.store_index {
            self.store_index = index;
            self.location_index = 0;
            self.selected_location = None;
            self.placing = false;
            self.dragging = None;
            self.drag_position = None;
            self.refresh()?;
        }
        Ok(())
    }

    fn select_location(&mut self, id: Option<String>) -> Result<()> {
        self.selected_location = id;
        if let Some(id) = self.selected_location.as_deref() {
            if let Some(i) = self.locations.iter().position(|l| l.id == id) {
                self.location_index = i;
            }
        }
        self.photo_index = 0;
        self.refresh()
    }

    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    ) -> Result<()> {
        while !self.should_quit {
            self.floor_plan.poll_async_loads();

            let completions = self.task_manager.poll_updates();
            for completion in completions {
                let prefix = completion.task_type.display_name();
                if completion.success {
                    self.status_message = Some(format!("{}: {}", prefix, completion.message));
                } else {
                    self.status_message = Some(format!("{} - {}", prefix, completion.message));
                }
                // An upload changed rows and blobs behind the cache's back
                self.cache.invalidate_all();
                self.refresh()?;
            }

            terminal.draw(|frame| ui::render(frame, self))?;

            if event::poll(Duration::from_millis(100))? {
                match event::read()? {
                    Event::Key(key) => self.handle_key(key)?,
                    Event::Mouse(mouse) => {
                        let size = terminal.size()?;
                        let area = Rect::new(0, 0, size.width, size.height);
                        if self.mode == AppMode::Normal {
                            self.handle_mouse(mouse, area)?;
                        }
                    }
                    Event::Resize(_, _) => {}
                    _ => {}
                }
            }
        }

        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return Ok(());
        }

        match self.mode {
            AppMode::Help => {
                self.mode = AppMode::Normal;
                Ok(())
            }
            AppMode::StoreForm => self.handle_store_form_key(key),
            AppMode::NameEntry => self.handle_name_dialog_key(key),
            AppMode::MeasurementForm => self.handle_measurement_key(key),
            AppMode::Password => self.handle_password_key(key),
            AppMode::Confirm => self.handle_confirm_key(key),
            AppMode::Upload => self.handle_upload_key(key),
            AppMode::Normal => self.handle_normal_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('q') => {
                self.task_manager.cancel_all();
                self.should_quit = true;
            }
            KeyCode::Char('?') => self.mode = AppMode::Help,
            KeyCode::Esc => {
                if self.placing {
                    self.placing = false;
                    self.status_message = Some("Placement cancelled".to_string());
                } else if self.selected_location.is_some() {
                    self.select_location(None)?;
                } else if self.task_manager.has_running_tasks() {
                    self.task_manager.cancel_most_recent();
                    self.status_message = Some("Cancelling upload...".to_string());
                } else {
                    self.status_message = None;
                }
            }
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Stores => Focus::Locations,
                    Focus::Locations if self.selected_location.is_some() => Focus::Photos,
                    Focus::Locations => Focus::Stores,
                    Focus::Photos => Focus::Stores,
                };
            }
            KeyCode::Char('j') | KeyCode::Down => self.move_down()?,
            KeyCode::Char('k') | KeyCode::Up => self.move_up()?,
            KeyCode::Enter => match self.focus {
                Focus::Stores => self.focus = Focus::Locations,
                Focus::Locations => {
                    let id = self.locations.get(self.location_index).map(|l| l.id.clone());
                    self.select_location(id)?;
                }
                Focus::Photos => {}
            },
            KeyCode::Char('n') => self.request(PendingAction::CreateStore)?,
            KeyCode::Char('e') => self.request(PendingAction::EditStore)?,
            KeyCode::Char('d') => self.request(PendingAction::Delete)?,
            KeyCode::Char('a') => self.request(PendingAction::ArmPlacing)?,
            KeyCode::Char('r') => self.request(PendingAction::RenameLocation)?,
            KeyCode::Char('m') => self.request(PendingAction::EditMeasurements)?,
            KeyCode::Char('u') => self.request(PendingAction::UploadFloorPlan)?,
            KeyCode::Char('p') => self.request(PendingAction::UploadPhotos)?,
            KeyCode::Char('L') => {
                self.session.lock();
                self.unlocked = false;
                self.status_message = Some("Edit mode locked".to_string());
            }
            KeyCode::Char('R') => {
                self.cache.invalidate_all();
                self.refresh()?;
                self.status_message = Some("Refreshed".to_string());
            }
            _ => {}
        }
        Ok(())
    }

    fn move_down(&mut self) -> Result<()> {
        match self.focus {
            Focus::Stores => {
                if self.store_index + 1 < self.stores.len() {
                    self.select_store(self.store_index + 1)?;
                }
            }
            Focus::Locations => {
                if self.location_index + 1 < self.locations.len() {
                    self.location_index += 1;
                }
            }
            Focus::Photos => {
                if self.photo_index + 1 < self.photos.len() {
                    self.photo_index += 1;
                }
            }
        }
        Ok(())
    }

    fn move_up(&mut self) -> Result<()> {
        match self.focus {
            Focus::Stores => {
                if self.store_index > 0 {
                    self.select_store(self.store_index - 1)?;
                }
            }
            Focus::Locations => {
                self.location_index = self.location_index.saturating_sub(1);
            }
            Focus::Photos => {
                self.photo_index = self.photo_index.saturating_sub(1);
            }
        }
        Ok(())
    }

    /// Run a privileged action, or park it behind the password dialog when
    /// edit mode is locked or expired.
    fn request(&mut self, action: PendingAction) -> Result<()> {
        self.unlocked = self.session.is_unlocked();
        if self.unlocked {
            self.perform(action)
        } else {
            self.pending_action = Some(action);
            self.password_dialog = Some(PasswordDialog::new());
            self.mode = AppMode::Password;
            Ok(())
        }
    }

    fn perform(&mut self, action: PendingAction) -> Result<()> {
        match action {
            PendingAction::CreateStore => {
                self.store_form = Some(StoreFormDialog::create());
                self.mode = AppMode::StoreForm;
            }
            PendingAction::EditStore => {
                let store = self.selected_store().cloned();
                if let Some(store) = store {
                    self.store_form = Some(StoreFormDialog::edit(&store));
                    self.mode = AppMode::StoreForm;
                } else {
                    self.status_message = Some("No store selected".to_string());
                }
            }
            PendingAction::Delete => self.open_delete_confirm(),
            PendingAction::ArmPlacing => {
                match self.selected_store() {
                    Some(store) if store.floor_plan_path.is_some() => {
                        self.placing = true;
                        self.status_message =
                            Some("Click on the floor plan to place the marker".to_string());
                    }
                    Some(_) => {
                        self.status_message =
                            Some("Upload a floor plan before placing markers".to_string());
                    }
                    None => self.status_message = Some("No store selected".to_string()),
                }
            }
            PendingAction::RenameLocation => {
                let location = self.selected_location().cloned();
                if let Some(location) = location {
                    self.name_dialog = Some(NameDialog::rename(location.id, &location.name));
                    self.mode = AppMode::NameEntry;
                } else {
                    self.status_message = Some("No marker selected".to_string());
                }
            }
            PendingAction::EditMeasurements => {
                let location_id = self.selected_location().map(|l| l.id.clone());
                if let Some(location_id) = location_id {
                    let dialog = MeasurementDialog::new(location_id, self.location_data.as_ref());
                    self.measurement_dialog = Some(dialog);
                    self.mode = AppMode::MeasurementForm;
                } else {
                    self.status_message = Some("No marker selected".to_string());
                }
            }
            PendingAction::UploadFloorPlan => {
                if self.selected_store().is_some() {
                    self.upload_dialog = Some(UploadDialog::floor_plan());
                    self.mode = AppMode::Upload;
                } else {
                    self.status_message = Some("No store selected".to_string());
                }
            }
            PendingAction::UploadPhotos => {
                if self.selected_location().is_some() {
                    self.upload_dialog = Some(UploadDialog::photos());
                    self.mode = AppMode::Upload;
                } else {
                    self.status_message = Some("No marker selected".to_string());
                }
            }
        }
        Ok(())
    }

    fn open_delete_confirm(&mut self) {
        let target = match self.focus {
            Focus::Stores => self.selected_store().map(|s| ConfirmTarget::Store {
                id: s.id.clone(),
                name: s.name.clone(),
            }),
            Focus::Locations => {
                self.locations
                    .get(self.location_index)
                    .map(|l| ConfirmTarget::Location {
                        id: l.id.clone(),
                        name: l.name.clone(),
                    })
            }
            Focus::Photos => self
                .photos
                .get(self.photo_index)
                .map(|p| ConfirmTarget::Photo { id: p.id.clone() }),
        };
        match target {
            Some(target) => {
                self.confirm_dialog = Some(ConfirmDialog::new(target));
                self.mode = AppMode::Confirm;
            }
            None => self.status_message = Some("Nothing to delete".to_string()),
        }
    }

    // --- Dialog key handlers ---

    fn handle_store_form_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(dialog) = self.store_form.as_mut() else {
            self.mode = AppMode::Normal;
            return Ok(());
        };

        match key.code {
            KeyCode::Esc => {
                self.store_form = None;
                self.mode = AppMode::Normal;
            }
            KeyCode::Tab | KeyCode::Down => dialog.next_field(),
            KeyCode::BackTab | KeyCode::Up => dialog.prev_field(),
            KeyCode::Enter => {
                if let Some(form) = dialog.confirm() {
                    let store_id = dialog.store_id.clone();
                    let auditor = self.config.auditor.clone();
                    let result = match &store_id {
                        Some(id) => self
                            .db
                            .update_store(id, &form, auditor.as_deref())
                            .map(|_| ()),
                        None => self
                            .db
                            .create_store(&form, auditor.as_deref())
                            .map(|_| ()),
                    };
                    match result {
                        Ok(()) => {
                            self.cache.invalidate_stores();
                            self.store_form = None;
                            self.mode = AppMode::Normal;
                            self.refresh()?;
                            self.status_message = Some(format!("Saved store '{}'", form.name));
                        }
                        Err(e) => self.status_message = Some(format!("Save failed: {}", e)),
                    }
                }
            }
            KeyCode::Left => dialog.focused().move_left(),
            KeyCode::Right => dialog.focused().move_right(),
            KeyCode::Home => dialog.focused().move_home(),
            KeyCode::End => dialog.focused().move_end(),
            KeyCode::Backspace => dialog.focused().backspace(),
            KeyCode::Delete => dialog.focused().delete(),
            KeyCode::Char(c) => dialog.focused().handle_char(c),
            _ => {}
        }
        Ok(())
    }

    fn handle_name_dialog_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(dialog) = self.name_dialog.as_mut() else {
            self.mode = AppMode::Normal;
            return Ok(());
        };

        match key.code {
            KeyCode::Esc => {
                self.name_dialog = None;
                self.mode = AppMode::Normal;
            }
            KeyCode::Enter => {
                if let Some(name) = dialog.confirm() {
                    let purpose = dialog.purpose.clone();
                    let result = match &purpose {
                        NamePurpose::Place { x, y } => {
                            let store_id = self
                                .selected_store()
                                .map(|s| s.id.clone())
                                .ok_or_else(|| anyhow::anyhow!("no store selected"));
                            store_id.and_then(|store_id| {
                                let location =
                                    self.db.create_location(&store_id, &name, *x, *y)?;
                                self.cache.invalidate_locations(&store_id);
                                Ok(Some(location.id))
                            })
                        }
                        NamePurpose::Rename { location_id } => {
                            let store_id = self.stores.get(self.store_index).map(|s| s.id.clone());
                            self.db.rename_location(location_id, &name).map(|_| {
                                if let Some(store_id) = &store_id {
                                    self.cache.invalidate_locations(store_id);
                                }
                                None
                            })
                        }
                    };
                    match result {
                        Ok(select) => {
                            self.name_dialog = None;
                            self.mode = AppMode::Normal;
                            self.refresh()?;
                            if let Some(id) = select {
                                self.select_location(Some(id))?;
                            }
                            self.status_message = Some(format!("Saved marker '{}'", name));
                        }
                        Err(e) => self.status_message = Some(format!("Save failed: {}", e)),
                    }
                }
            }
            KeyCode::Left => dialog.input.move_left(),
            KeyCode::Right => dialog.input.move_right(),
            KeyCode::Home => dialog.input.move_home(),
            KeyCode::End => dialog.input.move_end(),
            KeyCode::Backspace => dialog.input.backspace(),
            KeyCode::Delete => dialog.input.delete(),
            KeyCode::Char(c) => dialog.input.handle_char(c),
            _ => {}
        }
        Ok(())
    }

    fn handle_measurement_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(dialog) = self.measurement_dialog.as_mut() else {
            self.mode = AppMode::Normal;
            return Ok(());
        };

        match key.code {
            KeyCode::Esc => {
                self.measurement_dialog = None;
                self.mode = AppMode::Normal;
            }
            KeyCode::Tab | KeyCode::Down => dialog.next_field(),
            KeyCode::BackTab | KeyCode::Up => dialog.prev_field(),
            KeyCode::Enter => {
                let form = dialog.build_form();
                let location_id = dialog.location_id.clone();
                let auditor = self.config.auditor.clone();
                match self
                    .db
                    .upsert_location_data(&location_id, &form, auditor.as_deref())
                {
                    Ok(_) => {
                        self.cache.invalidate_location_data(&location_id);
                        self.measurement_dialog = None;
                        self.mode = AppMode::Normal;
                        self.refresh()?;
                        self.status_message = Some("Measurements saved".to_string());
                    }
                    Err(e) => self.status_message = Some(format!("Save failed: {}", e)),
                }
            }
            KeyCode::Left if dialog.focus == 0 => dialog.cycle_kind(false),
            KeyCode::Right if dialog.focus == 0 => dialog.cycle_kind(true),
            KeyCode::Left => {
                if let Some(input) = dialog.focused() {
                    input.move_left();
                }
            }
            KeyCode::Right => {
                if let Some(input) = dialog.focused() {
                    input.move_right();
                }
            }
            KeyCode::Home => {
                if let Some(input) = dialog.focused() {
                    input.move_home();
                }
            }
            KeyCode::End => {
                if let Some(input) = dialog.focused() {
                    input.move_end();
                }
            }
            KeyCode::Backspace => {
                if let Some(input) = dialog.focused() {
                    input.backspace();
                }
            }
            KeyCode::Delete => {
                if let Some(input) = dialog.focused() {
                    input.delete();
                }
            }
            KeyCode::Char(c) => {
                if let Some(input) = dialog.focused() {
                    input.handle_char(c);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_password_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(dialog) = self.password_dialog.as_mut() else {
            self.mode = AppMode::Normal;
            return Ok(());
        };

        match key.code {
            KeyCode::Esc => {
                self.password_dialog = None;
                self.pending_action = None;
                self.mode = AppMode::Normal;
            }
            KeyCode::Enter => {
                let password = dialog.input.value.clone();
                match self.session.unlock(&password) {
                    Ok(true) => {
                        self.unlocked = true;
                        self.password_dialog = None;
                        self.mode = AppMode::Normal;
                        self.status_message = Some("Edit mode unlocked".to_string());
                        if let Some(action) = self.pending_action.take() {
                            self.perform(action)?;
                        }
                    }
                    Ok(false) => dialog.reject(),
                    Err(e) => {
                        self.status_message = Some(format!("Unlock failed: {}", e));
                        self.password_dialog = None;
                        self.pending_action = None;
                        self.mode = AppMode::Normal;
                    }
                }
            }
            KeyCode::Backspace => dialog.input.backspace(),
            KeyCode::Char(c) => dialog.input.handle_char(c),
            _ => {}
        }
        Ok(())
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Enter | KeyCode::Char('y') => {
                if let Some(dialog) = self.confirm_dialog.take() {
                    self.mode = AppMode::Normal;
                    self.execute_delete(dialog.target)?;
                } else {
                    self.mode = AppMode::Normal;
                }
            }
            KeyCode::Esc | KeyCode::Char('n') => {
                self.confirm_dialog = None;
                self.mode = AppMode::Normal;
            }
            _ => {}
        }
        Ok(())
    }

    fn execute_delete(&mut self, target: ConfirmTarget) -> Result<()> {
        match target {
            ConfirmTarget::Store { id, name } => match self.db.delete_store(&id) {
                Ok(()) => {
                    // Blob cleanup is best-effort; rows already cascaded
                    if let Err(e) = self.blobs.delete_prefix(&id) {
                        tracing::warn!(error = %e, "failed to remove blobs for store {}", id);
                    }
                    self.cache.invalidate_all();
                    self.selected_location = None;
                    self.floor_plan.clear();
                    self.refresh()?;
                    self.status_message = Some(format!("Deleted store '{}'", name));
                }
                Err(e) => self.status_message = Some(format!("Delete failed: {}", e)),
            },
            ConfirmTarget::Location { id, name } => {
                let store_id = self.selected_store().map(|s| s.id.clone());
                match self.db.delete_location(&id) {
                    Ok(()) => {
                        if let Some(store_id) = &store_id {
                            let prefix = format!("{}/{}", store_id, id);
                            if let Err(e) = self.blobs.delete_prefix(&prefix) {
                                tracing::warn!(error = %e, "failed to remove blobs for location {}", id);
                            }
                            self.cache.invalidate_locations(store_id);
                        }
                        self.cache.invalidate_location_data(&id);
                        self.cache.invalidate_photos(&id);
                        if self.selected_location.as_deref() == Some(id.as_str()) {
                            self.selected_location = None;
                        }
                        self.refresh()?;
                        self.status_message = Some(format!("Deleted marker '{}'", name));
                    }
                    Err(e) => self.status_message = Some(format!("Delete failed: {}", e)),
                }
            }
            ConfirmTarget::Photo { id } => match self.db.get_photo(&id) {
                Ok(Some(photo)) => match self.db.delete_photo(&id) {
                    Ok(()) => {
                        for key in [&photo.storage_path, &photo.thumbnail_path] {
                            if let Err(e) = self.blobs.delete(key) {
                                tracing::warn!(error = %e, "failed to remove photo blob {}", key);
                            }
                        }
                        self.cache.invalidate_photos(&photo.location_id);
                        self.refresh()?;
                        self.status_message = Some("Photo deleted".to_string());
                    }
                    Err(e) => self.status_message = Some(format!("Delete failed: {}", e)),
                },
                Ok(None) => self.refresh()?,
                Err(e) => self.status_message = Some(format!("Delete failed: {}", e)),
            },
        }
        Ok(())
    }

    fn handle_upload_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(dialog) = self.upload_dialog.as_mut() else {
            self.mode = AppMode::Normal;
            return Ok(());
        };

        match key.code {
            KeyCode::Esc => {
                self.upload_dialog = None;
                self.mode = AppMode::Normal;
            }
            KeyCode::Tab => dialog.toggle_kind(),
            KeyCode::Enter => {
                if let Some(files) = dialog.confirm() {
                    let mode = dialog.mode;
                    self.upload_dialog = None;
                    self.mode = AppMode::Normal;
                    match mode {
                        UploadMode::FloorPlan => self.start_floor_plan_upload(files)?,
                        UploadMode::Photos(kind) => self.start_photo_upload(files, kind)?,
                    }
                }
            }
            KeyCode::Left => dialog.input.move_left(),
            KeyCode::Right => dialog.input.move_right(),
            KeyCode::Home => dialog.input.move_home(),
            KeyCode::End => dialog.input.move_end(),
            KeyCode::Backspace => dialog.input.backspace(),
            KeyCode::Delete => dialog.input.delete(),
            KeyCode::Char(c) => dialog.input.handle_char(c),
            _ => {}
        }
        Ok(())
    }

    // --- Mouse handling (floor-plan marker editor) ---

    fn handle_mouse(&mut self, mouse: MouseEvent, area: Rect) -> Result<()> {
        let panes = ui::layout(area);
        let plan_inner = ui::floor_plan_inner(panes.floor_plan);

        let in_plan = plan_inner.contains(ratatui::layout::Position::new(mouse.column, mouse.row));

        match mouse.kind {
            MouseEventKind::Down(crossterm::event::MouseButton::Left) => {
                if in_plan {
                    self.handle_plan_click(mouse.column, mouse.row, plan_inner)?;
                } else if panes
                    .stores
                    .contains(ratatui::layout::Position::new(mouse.column, mouse.row))
                {
                    let clicked = (mouse.row.saturating_sub(panes.stores.y + 1)) as usize
                        + self.store_list_state.offset();
                    if clicked < self.stores.len() {
                        self.focus = Focus::Stores;
                        self.select_store(clicked)?;
                    }
                } else if panes
                    .locations
                    .contains(ratatui::layout::Position::new(mouse.column, mouse.row))
                {
                    let clicked = (mouse.row.saturating_sub(panes.locations.y + 1)) as usize
                        + self.location_list_state.offset();
                    if clicked < self.locations.len() {
                        self.focus = Focus::Locations;
                        self.location_index = clicked;
                        let id = self.locations[clicked].id.clone();
                        self.select_location(Some(id))?;
                    }
                }
            }
            MouseEventKind::Drag(crossterm::event::MouseButton::Left) => {
                // Position is tracked locally only; nothing is written until
                // the button is released.
                if self.dragging.is_some() {
                    self.drag_position =
                        Some(position_from_cell(mouse.column, mouse.row, plan_inner));
                }
            }
            MouseEventKind::Up(crossterm::event::MouseButton::Left) => {
                self.finish_drag()?;
            }
            _ => {}
        }

        Ok(())
    }

    fn handle_plan_click(&mut self, column: u16, row: u16, inner: Rect) -> Result<()> {
        if self.placing {
            // placing -> pending: the click fixes the position, the name
            // dialog confirms or cancels the marker
            self.placing = false;
            let (x, y) = position_from_cell(column, row, inner);
            let default_name = format!("Location {}", self.locations.len() + 1);
            self.name_dialog = Some(NameDialog::place(x, y, default_name));
            self.mode = AppMode::NameEntry;
            return Ok(());
        }

        if let Some(location) = marker_at_cell(&self.locations, column, row, inner) {
            let id = location.id.clone();
            self.focus = Focus::Locations;
            self.select_location(Some(id.clone()))?;
            self.unlocked = self.session.is_unlocked();
            if self.unlocked {
                // One drag at a time; the press only arms it. The gesture
                // becomes a drag on the first motion event, so a plain
                // click-select never writes anything.
                self.dragging = Some(id);
            }
        }
        Ok(())
    }

    /// Complete a drag gesture. The drag state is cleared whatever the
    /// mutation outcome; a failed write leaves the cache restored to the
    /// last confirmed positions. A press that never moved has no tracked
    /// position and writes nothing.
    fn finish_drag(&mut self) -> Result<()> {
        let dragging = self.dragging.take();
        let drag_position = self.drag_position.take();

        let (Some(location_id), Some((x, y))) = (dragging, drag_position) else {
            return Ok(());
        };
        let Some(store_id) = self.selected_store().map(|s| s.id.clone()) else {
            return Ok(());
        };

        let db = &self.db;
        let result = self
            .cache
            .update_location_position(&store_id, &location_id, x, y, |x, y| {
                db.update_location_position(&location_id, x, y)
            });

        if let Err(e) = result {
            self.status_message = Some(format!("Move failed: {}", e));
        }
        self.refresh()?;
        Ok(())
    }

    // --- Background uploads ---

    fn start_floor_plan_upload(&mut self, files: Vec<PathBuf>) -> Result<()> {
        if self.task_manager.is_running(TaskType::FloorPlanUpload) {
            self.status_message = Some("Floor plan upload already running".to_string());
            return Ok(());
        }
        let Some(store) = self.selected_store() else {
            return Ok(());
        };
        let store_id = store.id.clone();
        // A directory may have expanded to several files; the plan is one image
        let Some(file) = files.into_iter().next() else {
            return Ok(());
        };

        let (_task_id, tx, cancel_flag) = self.task_manager.register_task(TaskType::FloorPlanUpload);
        let images_config = self.config.images.clone();
        let blob_root = self.blobs.root().to_path_buf();
        let db_path = self.config.db_path.clone();

        std::thread::spawn(move || {
            let _ = tx.send(TaskUpdate::Started { total: 1 });
            if cancel_flag.load(Ordering::SeqCst) {
                let _ = tx.send(TaskUpdate::Cancelled);
                return;
            }

            let result = (|| -> Result<()> {
                let bytes = std::fs::read(&file)?;
                let name = file
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| file.display().to_string());
                let pipeline = ImagePipeline::new(&images_config);
                let img = pipeline.decode(&name, &bytes)?;
                let full = pipeline.compress_full(&name, &img)?;

                let blobs = BlobStore::new(blob_root);
                let key = BlobStore::floor_plan_key(&store_id);
                blobs.put(&key, &full)?;

                let db = Database::open(&db_path)?;
                db.set_store_floor_plan(&store_id, &key)?;
                Ok(())
            })();

            match result {
                Ok(()) => {
                    let _ = tx.send(TaskUpdate::Completed {
                        message: "Floor plan updated".to_string(),
                    });
                }
                Err(e) => {
                    let _ = tx.send(TaskUpdate::Failed {
                        error: e.to_string(),
                    });
                }
            }
        });

        self.status_message = Some("Uploading floor plan...".to_string());
        Ok(())
    }

    fn start_photo_upload(&mut self, files: Vec<PathBuf>, kind: PhotoKind) -> Result<()> {
        if self.task_manager.is_running(TaskType::PhotoUpload) {
            self.status_message = Some("Photo upload already running".to_string());
            return Ok(());
        }
        let Some(store) = self.selected_store() else {
            return Ok(());
        };
        let Some(location) = self.selected_location() else {
            return Ok(());
        };
        let store_id = store.id.clone();
        let location_id = location.id.clone();

        let total = files.len();
        let (_task_id, tx, cancel_flag) = self.task_manager.register_task(TaskType::PhotoUpload);
        let images_config = self.config.images.clone();
        let blob_root = self.blobs.root().to_path_buf();
        let db_path = self.config.db_path.clone();
        let auditor = self.config.auditor.clone();

        std::thread::spawn(move || {
            let _ = tx.send(TaskUpdate::Started { total });

            let db = match Database::open(&db_path) {
                Ok(db) => db,
                Err(e) => {
                    let _ = tx.send(TaskUpdate::Failed {
                        error: format!("Failed to open database: {}", e),
                    });
                    return;
                }
            };
            let blobs = BlobStore::new(blob_root);
            let pipeline = ImagePipeline::new(&images_config);

            let mut uploaded = 0usize;
            let mut failures: Vec<String> = Vec::new();

            for (i, file) in files.iter().enumerate() {
                if cancel_flag.load(Ordering::SeqCst) {
                    let _ = tx.send(TaskUpdate::Cancelled);
                    return;
                }
                let name = file
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| file.display().to_string());
                let _ = tx.send(TaskUpdate::Progress(
                    TaskProgress::new(i, total).with_item(name.clone()),
                ));

                let photo_id = uuid::Uuid::new_v4().to_string();
                match upload_one_photo(
                    &db,
                    &blobs,
                    &pipeline,
                    &store_id,
                    &location_id,
                    kind,
                    &photo_id,
                    file,
                    &name,
                    auditor.as_deref(),
                ) {
                    Ok(()) => uploaded += 1,
                    Err(e) => failures.push(format!("{} ({})", name, e)),
                }
            }

            let _ = tx.send(photo_batch_update(uploaded, &failures));
        });

        self.status_message = Some(format!("Uploading {} photo(s)...", total));
        Ok(())
    }
}

/// Summarize a finished photo batch. Per-file failures are reported in the
/// message rather than aborting the batch; the whole task fails only when
/// nothing uploaded.
fn photo_batch_update(uploaded: usize, failures: &[String]) -> TaskUpdate {
    if failures.is_empty() {
        TaskUpdate::Completed {
            message: format!("{} photo(s) uploaded", uploaded),
        }
    } else if uploaded > 0 {
        TaskUpdate::Completed {
            message: format!(
                "{} uploaded, {} failed: {}",
                uploaded,
                failures.len(),
                failures.join(", ")
            ),
        }
    } else {
        TaskUpdate::Failed {
            error: format!("all {} failed: {}", failures.len(), failures.join(", ")),
        }
    }
}

/// Upload a single photo: both variants are encoded first, then both blobs
/// are written, and the row is inserted only after both writes land. A
/// failed thumbnail write removes the already-written full blob, and a
/// failed row insert removes both blobs, so no orphaned half survives.
#[allow(clippy::too_many_arguments)]
fn upload_one_photo(
    db: &Database,
    blobs: &BlobStore,
    pipeline: &ImagePipeline,
    store_id: &str,
    location_id: &str,
    kind: PhotoKind,
    photo_id: &str,
    file: &std::path::Path,
    name: &str,
    auditor: Option<&str>,
) -> Result<()> {
    let bytes = std::fs::read(file)?;
    let processed = pipeline.process(name, &bytes)?;

    let full_key = BlobStore::photo_key(store_id, location_id, kind.as_str(), photo_id);
    let thumb_key = BlobStore::photo_thumb_key(store_id, location_id, kind.as_str(), photo_id);

    blobs.put(&full_key, &processed.full)?;
    if let Err(e) = blobs.put(&thumb_key, &processed.thumbnail) {
        let _ = blobs.delete(&full_key);
        return Err(e.into());
    }

    if let Err(e) = db.insert_photo(photo_id, location_id, kind, &full_key, &thumb_key, auditor) {
        let _ = blobs.delete(&full_key);
        let _ = blobs.delete(&thumb_key);
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ImageProtocol, ImagesConfig, PreviewConfig, StorageConfig};
    use crate::db::StoreForm;
    use crate::markers::cell_from_position;
    use crate::session::EditSession;
    use crossterm::event::MouseButton;
    use ratatui::backend::TestBackend;

    fn test_app(dir: &tempfile::TempDir) -> App {
        let config = Config {
            db_path: dir.path().join("audit.db"),
            storage: StorageConfig {
                root: dir.path().join("blobs"),
            },
            preview: PreviewConfig {
                protocol: ImageProtocol::None,
            },
            ..Config::default()
        };
        let db = Database::open(&config.db_path).unwrap();
        db.initialize().unwrap();
        let mut app = App::new(config, db).unwrap();
        // Keep session state inside the fixture directory
        app.session = EditSession::new(
            dir.path().join("session.json"),
            app.config.session.secret.clone(),
            app.config.session.timeout_hours,
        );
        app.unlocked = false;
        app
    }

    fn store_form(name: &str) -> StoreForm {
        StoreForm {
            name: name.to_string(),
            location: "Centrum".to_string(),
            address: "1 Main St".to_string(),
            manager: None,
            phone: None,
        }
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn png_file(dir: &std::path::Path, name: &str) -> PathBuf {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            64,
            48,
            image::Rgb([120, 80, 40]),
        ));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, buf.into_inner()).unwrap();
        path
    }

    #[test]
    fn test_click_on_scrolled_store_list_selects_row_under_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        for i in 0..40 {
            app.db.create_store(&store_form(&format!("Store {:03}", i)), None).unwrap();
        }
        app.cache.invalidate_all();
        app.refresh().unwrap();
        app.select_store(35).unwrap();

        let area = Rect::new(0, 0, 100, 20);
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|frame| ui::render(frame, &mut app)).unwrap();

        let offset = app.store_list_state.offset();
        assert!(offset > 0, "selection below the pane must scroll the list");

        // Click the top visible row
        let panes = ui::layout(area);
        app.handle_mouse(
            mouse(
                MouseEventKind::Down(MouseButton::Left),
                panes.stores.x + 2,
                panes.stores.y + 1,
            ),
            area,
        )
        .unwrap();

        assert_eq!(app.store_index, offset);
        assert_eq!(app.stores[offset].name, format!("Store {:03}", offset));
    }

    #[test]
    fn test_click_select_on_marker_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        let store = app.db.create_store(&store_form("Store A"), None).unwrap();
        let location = app
            .db
            .create_location(&store.id, "Back Left Column", 50.0, 50.0)
            .unwrap();
        app.db
            .conn
            .execute(
                "UPDATE locations SET updated_at = '2000-01-01T00:00:00Z' WHERE id = ?",
                [location.id.as_str()],
            )
            .unwrap();
        app.cache.invalidate_all();
        app.refresh().unwrap();
        let secret = app.config.session.secret.clone();
        assert!(app.session.unlock(&secret).unwrap());

        let area = Rect::new(0, 0, 100, 30);
        let inner = ui::floor_plan_inner(ui::layout(area).floor_plan);
        let (col, row) = cell_from_position(50.0, 50.0, inner);

        // Press on the marker and release without moving
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), col, row), area)
            .unwrap();
        assert_eq!(app.dragging.as_deref(), Some(location.id.as_str()));
        assert!(app.drag_position.is_none());
        assert_eq!(app.selected_location.as_deref(), Some(location.id.as_str()));

        app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), col, row), area)
            .unwrap();
        assert!(app.dragging.is_none());
        let after = app.db.get_location(&location.id).unwrap().unwrap();
        assert_eq!(after.updated_at, "2000-01-01T00:00:00Z");
    }

    #[test]
    fn test_drag_release_persists_final_position() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        let store = app.db.create_store(&store_form("Store A"), None).unwrap();
        let location = app
            .db
            .create_location(&store.id, "Wall", 50.0, 50.0)
            .unwrap();
        app.cache.invalidate_all();
        app.refresh().unwrap();
        let secret = app.config.session.secret.clone();
        assert!(app.session.unlock(&secret).unwrap());

        let area = Rect::new(0, 0, 100, 30);
        let inner = ui::floor_plan_inner(ui::layout(area).floor_plan);
        let (col, row) = cell_from_position(50.0, 50.0, inner);
        let (target_col, target_row) = cell_from_position(20.0, 80.0, inner);

        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), col, row), area)
            .unwrap();
        app.handle_mouse(
            mouse(MouseEventKind::Drag(MouseButton::Left), target_col, target_row),
            area,
        )
        .unwrap();
        assert!(app.drag_position.is_some());
        app.handle_mouse(
            mouse(MouseEventKind::Up(MouseButton::Left), target_col, target_row),
            area,
        )
        .unwrap();

        let moved = app.db.get_location(&location.id).unwrap().unwrap();
        let (expected_x, expected_y) = position_from_cell(target_col, target_row, inner);
        assert!((moved.x - expected_x).abs() < 1e-9);
        assert!((moved.y - expected_y).abs() < 1e-9);
        assert!(app.dragging.is_none());
        assert!(app.drag_position.is_none());
    }

    #[test]
    fn test_upload_one_photo_writes_pair_then_row() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().unwrap();
        let store = db.create_store(&store_form("Store A"), None).unwrap();
        let location = db.create_location(&store.id, "Wall", 10.0, 10.0).unwrap();
        let blobs = BlobStore::new(dir.path().join("blobs"));
        let pipeline = ImagePipeline::new(&ImagesConfig::default());
        let file = png_file(dir.path(), "shot.png");

        upload_one_photo(
            &db,
            &blobs,
            &pipeline,
            &store.id,
            &location.id,
            PhotoKind::Audit,
            "p1",
            &file,
            "shot.png",
            Some("pat"),
        )
        .unwrap();

        let full_key = BlobStore::photo_key(&store.id, &location.id, "audit", "p1");
        let thumb_key = BlobStore::photo_thumb_key(&store.id, &location.id, "audit", "p1");
        assert!(blobs.exists(&full_key));
        assert!(blobs.exists(&thumb_key));
        let photos = db.list_photos(&location.id).unwrap();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].storage_path, full_key);
        assert_eq!(photos[0].uploaded_by.as_deref(), Some("pat"));
    }

    #[test]
    fn test_failed_thumbnail_write_rolls_back_full_blob() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().unwrap();
        let store = db.create_store(&store_form("Store A"), None).unwrap();
        let location = db.create_location(&store.id, "Wall", 10.0, 10.0).unwrap();
        let blobs = BlobStore::new(dir.path().join("blobs"));
        let pipeline = ImagePipeline::new(&ImagesConfig::default());
        let file = png_file(dir.path(), "shot.png");

        // Occupy the thumbnail's final path with a directory so its rename
        // into place fails after the full blob is already written
        let thumb_key = BlobStore::photo_thumb_key(&store.id, &location.id, "audit", "p1");
        std::fs::create_dir_all(blobs.path(&thumb_key)).unwrap();

        let result = upload_one_photo(
            &db,
            &blobs,
            &pipeline,
            &store.id,
            &location.id,
            PhotoKind::Audit,
            "p1",
            &file,
            "shot.png",
            None,
        );
        assert!(result.is_err());
        let full_key = BlobStore::photo_key(&store.id, &location.id, "audit", "p1");
        assert!(!blobs.exists(&full_key));
        assert!(db.list_photos(&location.id).unwrap().is_empty());
    }

    #[test]
    fn test_failed_row_insert_removes_both_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().unwrap();
        let store = db.create_store(&store_form("Store A"), None).unwrap();
        let blobs = BlobStore::new(dir.path().join("blobs"));
        let pipeline = ImagePipeline::new(&ImagesConfig::default());
        let file = png_file(dir.path(), "shot.png");

        // No such location: the insert violates the foreign key after both
        // blobs are written
        let result = upload_one_photo(
            &db,
            &blobs,
            &pipeline,
            &store.id,
            "no-such-location",
            PhotoKind::Install,
            "p2",
            &file,
            "shot.png",
            None,
        );
        assert!(result.is_err());
        assert!(!blobs.exists(&BlobStore::photo_key(
            &store.id,
            "no-such-location",
            "install",
            "p2"
        )));
        assert!(!blobs.exists(&BlobStore::photo_thumb_key(
            &store.id,
            "no-such-location",
            "install",
            "p2"
        )));
    }

    #[test]
    fn test_photo_batch_mixed_outcome_reports_each_failure() {
        let update = photo_batch_update(2, &["bad.txt (bad.txt is not an image)".to_string()]);
        match update {
            TaskUpdate::Completed { message } => {
                assert!(message.contains("2 uploaded"));
                assert!(message.contains("1 failed"));
                assert!(message.contains("bad.txt"));
            }
            other => panic!("unexpected update: {:?}", other),
        }
    }

    #[test]
    fn test_photo_batch_with_no_successes_fails() {
        let update = photo_batch_update(0, &["a.png (unreadable)".to_string()]);
        assert!(matches!(update, TaskUpdate::Failed { .. }));
    }

    #[test]
    fn test_photo_batch_all_uploaded() {
        assert!(matches!(
            photo_batch_update(3, &[]),
            TaskUpdate::Completed { message } if message == "3 photo(s) uploaded"
        ));
    }
}
