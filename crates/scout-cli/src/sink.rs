//! Action packet file consumed by the game bridge.
//!
//! Each dispatch replaces the file with one packet:
//!
//! ```json
//! { "sequence_number": 7, "id": "cmd_1718000000000", "timestamp": 1718000000000,
//!   "clear_queue": false, "actions": [ { "id": "...", "type": "MoveTo", "params": {} } ] }
//! ```
//!
//! The bridge executes packets in sequence order and skips numbers it has
//! already seen, so the counter resumes from the file left by a previous run.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use scout_perception::write_atomic;
use scout_runtime::ActionSink;
use scout_types::{Action, ScoutError};
use serde::Serialize;
use tracing::{info, warn};

const WRITE_ATTEMPTS: u32 = 5;
const WRITE_BACKOFF: Duration = Duration::from_millis(10);

#[derive(Debug, Serialize)]
struct ActionPacket {
    sequence_number: u64,
    id: String,
    timestamp: i64,
    clear_queue: bool,
    actions: Vec<Action>,
}

pub struct ActionFileSink {
    path: PathBuf,
    sequence: u64,
}

impl ActionFileSink {
    /// Sink writing to `path`, continuing the sequence found there.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let sequence = match read_sequence(&path) {
            Ok(Some(seq)) => {
                info!(seq, path = %path.display(), "resuming action sequence");
                seq
            }
            Ok(None) => 0,
            Err(e) => {
                warn!(error = %e, path = %path.display(), "could not read previous action packet");
                0
            }
        };
        Self { path, sequence }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Tell the bridge to drop whatever a previous run left queued.
    pub fn clear(&mut self) -> Result<u64, ScoutError> {
        self.write_packet(&[], true, Some("init_clear"))
    }

    /// Write one packet and return its sequence number.
    pub fn write_packet(
        &mut self,
        actions: &[Action],
        clear_queue: bool,
        packet_id: Option<&str>,
    ) -> Result<u64, ScoutError> {
        let now = Utc::now().timestamp_millis();
        let packet = ActionPacket {
            sequence_number: self.sequence + 1,
            id: packet_id
                .map(str::to_string)
                .unwrap_or_else(|| format!("cmd_{now}")),
            timestamp: now,
            clear_queue,
            actions: actions.to_vec(),
        };
        let raw = serde_json::to_vec_pretty(&packet)
            .map_err(|e| ScoutError::Serialization(e.to_string()))?;
        write_with_retry(&self.path, &raw).map_err(|e| {
            ScoutError::Dispatch(format!("writing {}: {e}", self.path.display()))
        })?;
        self.sequence = packet.sequence_number;
        info!(seq = self.sequence, count = actions.len(), "wrote action packet");
        Ok(self.sequence)
    }
}

impl ActionSink for ActionFileSink {
    fn dispatch(&mut self, actions: &[Action]) -> Result<(), ScoutError> {
        self.write_packet(actions, false, None).map(|_| ())
    }
}

fn read_sequence(path: &Path) -> Result<Option<u64>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| e.to_string())?;
    let doc: serde_json::Value = serde_json::from_str(&raw).map_err(|e| e.to_string())?;
    Ok(doc.get("sequence_number").and_then(|v| v.as_u64()))
}

/// Atomic replace, retried briefly because the reader may hold the file open.
fn write_with_retry(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut attempt = 1;
    loop {
        match write_atomic(path, bytes) {
            Ok(()) => return Ok(()),
            Err(e) if attempt >= WRITE_ATTEMPTS => return Err(e),
            Err(_) => {
                attempt += 1;
                std::thread::sleep(WRITE_BACKOFF);
            }
        }
    }
}
