//! Background task manager for tracking and controlling upload tasks.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::sync::Arc;

use super::{
    BackgroundTask, TaskCompletionInfo, TaskId, TaskProgress, TaskState, TaskType, TaskUpdate,
};

pub struct BackgroundTaskManager {
    tasks: HashMap<TaskId, BackgroundTask>,
    /// Order in which tasks were added (for "most recent" cancellation).
    task_order: Vec<TaskId>,
}

impl BackgroundTaskManager {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            task_order: Vec::new(),
        }
    }

    /// Register a new background task.
    /// Returns the TaskId, a sender for the task to report updates on, and
    /// the cancel flag the task is expected to poll.
    pub fn register_task(
        &mut self,
        task_type: TaskType,
    ) -> (TaskId, mpsc::Sender<TaskUpdate>, Arc<AtomicBool>) {
        let (tx, rx) = mpsc::channel();
        let cancel_flag = Arc::new(AtomicBool::new(false));
        let task = BackgroundTask::new(task_type, cancel_flag.clone(), rx);
        let id = task.id;

        self.tasks.insert(id, task);
        self.task_order.push(id);

        (id, tx, cancel_flag)
    }

    /// Check if a task of the given type is already running.
    pub fn is_running(&self, task_type: TaskType) -> bool {
        self.tasks
            .values()
            .any(|t| t.task_type == task_type && t.is_running())
    }

    /// Cancel the most recently started running task.
    pub fn cancel_most_recent(&mut self) -> bool {
        for id in self.task_order.iter().rev() {
            if let Some(task) = self.tasks.get(id) {
                if task.is_running() {
                    task.cancel();
                    return true;
                }
            }
        }
        false
    }

    /// Cancel all running tasks.
    pub fn cancel_all(&mut self) {
        for task in self.tasks.values() {
            if task.is_running() {
                task.cancel();
            }
        }
    }

    /// Poll all task channels for updates.
    /// Returns completion messages that should be surfaced to the user.
    pub fn poll_updates(&mut self) -> Vec<TaskCompletionInfo> {
        let mut completed = Vec::new();

        let task_ids: Vec<TaskId> = self.tasks.keys().copied().collect();

        for id in task_ids {
            if let Some(task) = self.tasks.get_mut(&id) {
                while let Ok(update) = task.receiver.try_recv() {
                    match update {
                        TaskUpdate::Started { total } => {
                            task.progress = Some(TaskProgress::new(0, total));
                        }
                        TaskUpdate::Progress(progress) => {
                            task.progress = Some(progress);
                        }
                        TaskUpdate::Completed { message } => {
                            task.state = TaskState::Completed;
                            completed.push(TaskCompletionInfo {
                                id,
                                task_type: task.task_type,
                                message,
                                success: true,
                            });
                        }
                        TaskUpdate::Cancelled => {
                            task.state = TaskState::Cancelled;
                            completed.push(TaskCompletionInfo {
                                id,
                                task_type: task.task_type,
                                message: "Cancelled".to_string(),
                                success: false,
                            });
                        }
                        TaskUpdate::Failed { error } => {
                            task.state = TaskState::Failed(error.clone());
                            completed.push(TaskCompletionInfo {
                                id,
                                task_type: task.task_type,
                                message: error,
                                success: false,
                            });
                        }
                    }
                }
            }
        }

        for info in &completed {
            self.tasks.remove(&info.id);
            self.task_order.retain(|id| *id != info.id);
        }

        completed
    }

    /// Get all running tasks for display.
    pub fn running_tasks(&self) -> Vec<&BackgroundTask> {
        self.task_order
            .iter()
            .filter_map(|id| self.tasks.get(id))
            .filter(|t| t.is_running())
            .collect()
    }

    pub fn has_running_tasks(&self) -> bool {
        self.tasks.values().any(|t| t.is_running())
    }
}

impl Default for BackgroundTaskManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_removes_task() {
        let mut manager = BackgroundTaskManager::new();
        let (_id, tx, _cancel) = manager.register_task(TaskType::PhotoUpload);
        assert!(manager.is_running(TaskType::PhotoUpload));

        tx.send(TaskUpdate::Completed {
            message: "3 photos uploaded".to_string(),
        })
        .unwrap();

        let completed = manager.poll_updates();
        assert_eq!(completed.len(), 1);
        assert!(completed[0].success);
        assert!(!manager.has_running_tasks());
    }

    #[test]
    fn test_failure_is_reported_as_unsuccessful() {
        let mut manager = BackgroundTaskManager::new();
        let (_id, tx, _cancel) = manager.register_task(TaskType::FloorPlanUpload);
        tx.send(TaskUpdate::Failed {
            error: "decode failed".to_string(),
        })
        .unwrap();

        let completed = manager.poll_updates();
        assert_eq!(completed.len(), 1);
        assert!(!completed[0].success);
        assert_eq!(completed[0].message, "decode failed");
    }

    #[test]
    fn test_cancel_most_recent_sets_flag() {
        let mut manager = BackgroundTaskManager::new();
        let (_id, _tx, cancel) = manager.register_task(TaskType::PhotoUpload);
        assert!(manager.cancel_most_recent());
        assert!(cancel.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn test_progress_percent() {
        let progress = TaskProgress::new(3, 12);
        assert_eq!(progress.percent(), 25);
        assert_eq!(TaskProgress::new(0, 0).percent(), 0);
    }
}
