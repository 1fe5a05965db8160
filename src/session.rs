//! Password-gated edit session with a fixed expiry from unlock time.
//!
//! This is access convenience, not security: the shared secret sits in the
//! config file and the unlock state in a plain JSON file. The state file is
//! what lets an unlock survive an application restart within the expiry
//! window. The clock is injected so expiry is testable.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub trait Clock: Send {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionState {
    unlocked_at: i64, // epoch milliseconds
}

pub struct EditSession {
    state_path: PathBuf,
    secret: String,
    timeout: Duration,
    clock: Box<dyn Clock>,
}

impl EditSession {
    pub fn new(state_path: PathBuf, secret: String, timeout_hours: i64) -> Self {
        Self::with_clock(state_path, secret, timeout_hours, Box::new(SystemClock))
    }

    pub fn with_clock(
        state_path: PathBuf,
        secret: String,
        timeout_hours: i64,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            state_path,
            secret,
            timeout: Duration::hours(timeout_hours),
            clock,
        }
    }

    /// Attempt an unlock. On a match the unlock time is persisted so the
    /// session survives a restart within the expiry window.
    pub fn unlock(&self, password: &str) -> Result<bool> {
        if password != self.secret {
            return Ok(false);
        }
        let state = SessionState {
            unlocked_at: self.clock.now().timestamp_millis(),
        };
        if let Some(parent) = self.state_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.state_path, serde_json::to_string(&state)?)?;
        Ok(true)
    }

    /// Whether a persisted unlock is still within its expiry window. An
    /// expired or unreadable state file counts as locked and is removed.
    pub fn is_unlocked(&self) -> bool {
        let Ok(raw) = fs::read_to_string(&self.state_path) else {
            return false;
        };
        let Ok(state) = serde_json::from_str::<SessionState>(&raw) else {
            let _ = fs::remove_file(&self.state_path);
            return false;
        };
        let elapsed = self.clock.now().timestamp_millis() - state.unlocked_at;
        if elapsed < 0 || elapsed >= self.timeout.num_milliseconds() {
            let _ = fs::remove_file(&self.state_path);
            return false;
        }
        true
    }

    pub fn lock(&self) {
        let _ = fs::remove_file(&self.state_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct TestClock(Arc<Mutex<DateTime<Utc>>>);

    impl TestClock {
        fn new() -> Self {
            Self(Arc::new(Mutex::new(Utc::now())))
        }

        fn advance_hours(&self, hours: i64) {
            let mut now = self.0.lock().unwrap();
            *now += Duration::hours(hours);
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn session(path: PathBuf, clock: &TestClock) -> EditSession {
        EditSession::with_clock(path, "hunter2".to_string(), 4, Box::new(clock.clone()))
    }

    #[test]
    fn test_wrong_password_stays_locked() {
        let dir = tempfile::tempdir().unwrap();
        let clock = TestClock::new();
        let s = session(dir.path().join("session.json"), &clock);
        assert!(!s.unlock("guess").unwrap());
        assert!(!s.is_unlocked());
    }

    #[test]
    fn test_unlock_persists_across_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let clock = TestClock::new();

        let s = session(path.clone(), &clock);
        assert!(s.unlock("hunter2").unwrap());
        assert!(s.is_unlocked());

        // A fresh session over the same state file sees the unlock
        let reloaded = session(path, &clock);
        assert!(reloaded.is_unlocked());
    }

    #[test]
    fn test_expired_unlock_counts_as_locked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let clock = TestClock::new();

        let s = session(path.clone(), &clock);
        s.unlock("hunter2").unwrap();
        clock.advance_hours(5);
        assert!(!s.is_unlocked());
        // Expiry removed the state file
        assert!(!path.exists());
    }

    #[test]
    fn test_garbage_state_file_counts_as_locked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        let clock = TestClock::new();
        let s = session(path.clone(), &clock);
        assert!(!s.is_unlocked());
        assert!(!path.exists());
    }

    #[test]
    fn test_lock_discards_unlock() {
        let dir = tempfile::tempdir().unwrap();
        let clock = TestClock::new();
        let s = session(dir.path().join("session.json"), &clock);
        s.unlock("hunter2").unwrap();
        s.lock();
        assert!(!s.is_unlocked());
    }
}
