//! Polls the bridge's state file and yields each new snapshot once.
//!
//! A snapshot is "new" when the file's modification time or length differs
//! from the last one read. A file that fails to parse is reported and
//! skipped; the next write is picked up normally.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use scout_types::{ScoutError, WorldSnapshot};
use tracing::{debug, info, warn};

const MISSING_WARN_EVERY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    modified: SystemTime,
    len: u64,
}

pub struct StateWatcher {
    path: PathBuf,
    last: Option<Stamp>,
    last_missing_warn: Option<Instant>,
}

impl StateWatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last: None,
            last_missing_warn: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next unseen snapshot, if the file changed since the last call.
    pub fn poll(&mut self) -> Result<Option<WorldSnapshot>, ScoutError> {
        let meta = match fs::metadata(&self.path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.warn_missing();
                return Ok(None);
            }
            Err(e) => return Err(self.persistence(e)),
        };
        let stamp = Stamp {
            modified: meta.modified().map_err(|e| self.persistence(e))?,
            len: meta.len(),
        };
        if self.last == Some(stamp) {
            return Ok(None);
        }
        self.last = Some(stamp);
        self.last_missing_warn = None;

        let raw = fs::read_to_string(&self.path).map_err(|e| self.persistence(e))?;
        let snapshot = serde_json::from_str::<WorldSnapshot>(&raw)
            .map_err(|e| ScoutError::InvalidSnapshot(e.to_string()))?;
        debug!(ts = snapshot.timestamp_ms, "new snapshot");
        Ok(Some(snapshot))
    }

    fn warn_missing(&mut self) {
        let due = self
            .last_missing_warn
            .is_none_or(|t| t.elapsed() >= MISSING_WARN_EVERY);
        if due {
            warn!(path = %self.path.display(), "state file not found; waiting for the game");
            self.last_missing_warn = Some(Instant::now());
        }
    }

    fn persistence(&self, e: std::io::Error) -> ScoutError {
        ScoutError::Persistence {
            path: self.path.display().to_string(),
            details: e.to_string(),
        }
    }
}

/// Delete a state file older than `max_age`, left over from a previous game.
/// A younger file means the game is already running and is kept.
///
/// Returns `true` when the file was removed.
pub fn remove_stale_state(path: &Path, max_age: Duration) -> bool {
    let Ok(modified) = fs::metadata(path).and_then(|m| m.modified()) else {
        return false;
    };
    let age = SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO);
    if age < max_age {
        info!(age_ms = age.as_millis() as u64, "state file is fresh; attaching to running game");
        return false;
    }
    match fs::remove_file(path) {
        Ok(()) => {
            info!(path = %path.display(), "removed stale state file");
            true
        }
        Err(e) => {
            warn!(error = %e, path = %path.display(), "failed to remove stale state file");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn write_state(path: &Path, ts: i64, modified: SystemTime) {
        fs::write(path, format!(r#"{{"timestamp_ms": {ts}}}"#)).unwrap();
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(modified)
            .unwrap();
    }

    #[test]
    fn missing_file_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = StateWatcher::new(dir.path().join("state.json"));
        assert!(watcher.poll().unwrap().is_none());
        assert!(watcher.poll().unwrap().is_none());
    }

    #[test]
    fn each_write_is_seen_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let mut watcher = StateWatcher::new(&path);

        write_state(&path, 100, t0);
        assert_eq!(watcher.poll().unwrap().unwrap().timestamp_ms, 100);
        assert!(watcher.poll().unwrap().is_none());

        write_state(&path, 200, t0 + Duration::from_secs(1));
        assert_eq!(watcher.poll().unwrap().unwrap().timestamp_ms, 200);
        assert!(watcher.poll().unwrap().is_none());
    }

    #[test]
    fn same_mtime_but_different_length_is_new() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let mut watcher = StateWatcher::new(&path);

        write_state(&path, 5, t0);
        watcher.poll().unwrap();
        write_state(&path, 50_000, t0);
        assert_eq!(watcher.poll().unwrap().unwrap().timestamp_ms, 50_000);
    }

    #[test]
    fn malformed_snapshot_is_reported_then_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ truncated").unwrap();
        let mut watcher = StateWatcher::new(&path);

        assert!(matches!(watcher.poll(), Err(ScoutError::InvalidSnapshot(_))));
        assert!(watcher.poll().unwrap().is_none());
    }

    #[test]
    fn stale_state_is_removed_fresh_state_kept() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("old.json");
        write_state(&stale, 1, SystemTime::now() - Duration::from_secs(60));
        assert!(remove_stale_state(&stale, Duration::from_secs(5)));
        assert!(!stale.exists());

        let fresh = dir.path().join("new.json");
        write_state(&fresh, 1, SystemTime::now());
        assert!(!remove_stale_state(&fresh, Duration::from_secs(5)));
        assert!(fresh.exists());

        assert!(!remove_stale_state(&dir.path().join("absent.json"), Duration::ZERO));
    }
}
