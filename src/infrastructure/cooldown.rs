//! Advisory write-action cooldowns persisted between runs
//!
//! Timestamps live in a small JSON file so restarting the client does
//! not reset the platform's posting limits. The checks are advisory:
//! the platform still enforces its own limits, this store just avoids
//! burning rate-limited calls.

use crate::constants::{COMMENT_COOLDOWN_SECS, POST_COOLDOWN_SECS};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CooldownState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_post_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_comment_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_periodic_check_at: Option<DateTime<Utc>>,
}

/// Thread-safe cooldown tracker persisted after every recorded action.
pub struct CooldownTracker {
    path: PathBuf,
    state: Mutex<CooldownState>,
}

impl CooldownTracker {
    /// Load persisted state from `path`, degrading to a clean slate
    /// when the file is absent or unreadable.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = read_state(&path);
        Self {
            path,
            state: Mutex::new(state),
        }
    }

    pub fn can_post(&self) -> bool {
        self.can_post_at(Utc::now())
    }

    pub fn can_comment(&self) -> bool {
        self.can_comment_at(Utc::now())
    }

    pub fn record_post(&self) {
        self.record_post_at(Utc::now());
    }

    pub fn record_comment(&self) {
        self.record_comment_at(Utc::now());
    }

    /// Time left until posting is allowed again.
    pub fn post_wait_remaining(&self) -> Option<Duration> {
        self.wait_remaining(self.lock().last_post_at, POST_COOLDOWN_SECS)
    }

    pub fn comment_wait_remaining(&self) -> Option<Duration> {
        self.wait_remaining(self.lock().last_comment_at, COMMENT_COOLDOWN_SECS)
    }

    /// True once per `interval`: the first call after the interval
    /// elapses claims the slot and persists the new timestamp.
    pub fn should_run_periodic_check(&self, interval: Duration) -> bool {
        self.should_run_periodic_check_at(interval, Utc::now())
    }

    pub fn state(&self) -> CooldownState {
        *self.lock()
    }

    fn can_post_at(&self, now: DateTime<Utc>) -> bool {
        match self.lock().last_post_at {
            None => true,
            Some(last) => now - last >= Duration::seconds(POST_COOLDOWN_SECS as i64),
        }
    }

    fn can_comment_at(&self, now: DateTime<Utc>) -> bool {
        match self.lock().last_comment_at {
            None => true,
            Some(last) => now - last >= Duration::seconds(COMMENT_COOLDOWN_SECS as i64),
        }
    }

    fn record_post_at(&self, now: DateTime<Utc>) {
        let mut state = self.lock();
        // Timestamps never move backwards, even under clock skew.
        state.last_post_at = Some(state.last_post_at.map_or(now, |previous| previous.max(now)));
        self.persist(&state);
    }

    fn record_comment_at(&self, now: DateTime<Utc>) {
        let mut state = self.lock();
        state.last_comment_at = Some(
            state
                .last_comment_at
                .map_or(now, |previous| previous.max(now)),
        );
        self.persist(&state);
    }

    fn should_run_periodic_check_at(&self, interval: Duration, now: DateTime<Utc>) -> bool {
        let mut state = self.lock();
        let due = match state.last_periodic_check_at {
            None => true,
            Some(last) => now - last >= interval,
        };
        if due {
            state.last_periodic_check_at = Some(now);
            self.persist(&state);
        }
        due
    }

    fn wait_remaining(&self, last: Option<DateTime<Utc>>, threshold_secs: u64) -> Option<Duration> {
        let last = last?;
        let remaining = Duration::seconds(threshold_secs as i64) - (Utc::now() - last);
        (remaining > Duration::zero()).then_some(remaining)
    }

    fn lock(&self) -> MutexGuard<'_, CooldownState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, state: &CooldownState) {
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let serialized = match serde_json::to_string_pretty(state) {
            Ok(serialized) => serialized,
            Err(error) => {
                warn!(path = %self.path.display(), %error, "Failed to serialize cooldown state");
                return;
            }
        };
        if let Err(error) = fs::write(&self.path, serialized) {
            warn!(path = %self.path.display(), %error, "Failed to persist cooldown state");
        }
    }
}

/// Human-readable wait hint, rounded up to whole minutes when long.
pub fn human_wait(duration: Duration) -> String {
    crate::infrastructure::platform::error::human_wait_secs(duration.num_seconds().max(0) as u64)
}

fn read_state(path: &Path) -> CooldownState {
    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(state) => state,
            Err(error) => {
                warn!(path = %path.display(), %error, "Cooldown file is malformed, starting fresh");
                CooldownState::default()
            }
        },
        Err(error) if error.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "Cooldown file not found, starting fresh");
            CooldownState::default()
        }
        Err(error) => {
            warn!(path = %path.display(), %error, "Cooldown file is unreadable, starting fresh");
            CooldownState::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tracker(dir: &TempDir) -> CooldownTracker {
        CooldownTracker::load(dir.path().join("cooldowns.json"))
    }

    #[test]
    fn post_allowed_only_after_full_window() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir);
        let start = Utc::now();

        assert!(tracker.can_post_at(start));
        tracker.record_post_at(start);

        assert!(!tracker.can_post_at(start + Duration::minutes(29)));
        assert!(!tracker.can_post_at(start + Duration::minutes(30) - Duration::seconds(1)));
        assert!(tracker.can_post_at(start + Duration::minutes(30)));
    }

    #[test]
    fn comment_window_is_twenty_seconds() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir);
        let start = Utc::now();

        tracker.record_comment_at(start);
        assert!(!tracker.can_comment_at(start + Duration::seconds(19)));
        assert!(tracker.can_comment_at(start + Duration::seconds(20)));
    }

    #[test]
    fn comment_cooldown_does_not_block_posting() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir);
        let start = Utc::now();

        tracker.record_comment_at(start);
        assert!(tracker.can_post_at(start + Duration::seconds(1)));
    }

    #[test]
    fn timestamps_never_move_backwards() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir);
        let start = Utc::now();

        tracker.record_post_at(start);
        tracker.record_post_at(start - Duration::minutes(10));
        assert_eq!(tracker.state().last_post_at, Some(start));
    }

    #[test]
    fn state_survives_a_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cooldowns.json");
        let start = Utc::now();

        let first = CooldownTracker::load(&path);
        first.record_post_at(start);

        let second = CooldownTracker::load(&path);
        assert!(!second.can_post_at(start + Duration::minutes(5)));
        assert_eq!(second.state().last_post_at, Some(start));
    }

    #[test]
    fn corrupt_state_degrades_to_clean_slate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cooldowns.json");
        fs::write(&path, "not json at all").unwrap();

        let tracker = CooldownTracker::load(&path);
        assert!(tracker.can_post());
        assert_eq!(tracker.state(), CooldownState::default());
    }

    #[test]
    fn periodic_check_claims_one_slot_per_interval() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir);
        let start = Utc::now();
        let interval = Duration::minutes(60);

        assert!(tracker.should_run_periodic_check_at(interval, start));
        assert!(!tracker.should_run_periodic_check_at(interval, start + Duration::minutes(30)));
        assert!(tracker.should_run_periodic_check_at(interval, start + Duration::minutes(61)));
    }

    #[test]
    fn wait_hints_read_naturally() {
        assert_eq!(human_wait(Duration::seconds(5)), "5 seconds");
        assert_eq!(human_wait(Duration::seconds(1)), "1 second");
        assert_eq!(human_wait(Duration::seconds(61)), "2 minutes");
        assert_eq!(human_wait(Duration::minutes(14)), "14 minutes");
        assert_eq!(human_wait(Duration::seconds(-3)), "0 seconds");
    }
}
