//! Background task management for non-blocking uploads.
//!
//! Floor-plan and photo uploads read files, run the image pipeline, and talk
//! to the blob store, all of which would stall the event loop. They run on
//! plain threads instead and report back over mpsc channels.

pub mod manager;

use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Instant;

pub use manager::BackgroundTaskManager;

/// Unique identifier for a background task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u64);

impl TaskId {
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        TaskId(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    FloorPlanUpload,
    PhotoUpload,
}

impl TaskType {
    /// Short display name for the status bar.
    pub fn short_name(&self) -> &'static str {
        match self {
            TaskType::FloorPlanUpload => "FP",
            TaskType::PhotoUpload => "PH",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TaskType::FloorPlanUpload => "Floor Plan Upload",
            TaskType::PhotoUpload => "Photo Upload",
        }
    }
}

/// Progress information for a task.
#[derive(Debug, Clone)]
pub struct TaskProgress {
    pub current: usize,
    pub total: usize,
    pub current_item: Option<String>,
}

impl TaskProgress {
    pub fn new(current: usize, total: usize) -> Self {
        Self {
            current,
            total,
            current_item: None,
        }
    }

    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.current_item = Some(item.into());
        self
    }

    /// Progress percentage (0-100).
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            0
        } else {
            ((self.current as f64 / self.total as f64) * 100.0).min(100.0) as u8
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Completed,
    Cancelled,
    Failed(String),
}

/// Update messages sent from background tasks via channels.
#[derive(Debug, Clone)]
pub enum TaskUpdate {
    Started { total: usize },
    Progress(TaskProgress),
    Completed { message: String },
    Cancelled,
    Failed { error: String },
}

/// A running background task with its state and communication channels.
pub struct BackgroundTask {
    pub id: TaskId,
    pub task_type: TaskType,
    pub state: TaskState,
    pub progress: Option<TaskProgress>,
    pub cancel_flag: Arc<AtomicBool>,
    pub receiver: mpsc::Receiver<TaskUpdate>,
    pub started_at: Instant,
}

impl BackgroundTask {
    pub fn new(
        task_type: TaskType,
        cancel_flag: Arc<AtomicBool>,
        receiver: mpsc::Receiver<TaskUpdate>,
    ) -> Self {
        Self {
            id: TaskId::new(),
            task_type,
            state: TaskState::Running,
            progress: None,
            cancel_flag,
            receiver,
            started_at: Instant::now(),
        }
    }

    pub fn cancel(&self) {
        self.cancel_flag
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.state == TaskState::Running
    }
}

/// Result of polling task updates.
#[derive(Debug, Clone)]
pub struct TaskCompletionInfo {
    pub id: TaskId,
    pub task_type: TaskType,
    pub message: String,
    pub success: bool,
}
