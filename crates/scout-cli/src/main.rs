//! `scout` – Scout agent runtime
//!
//! This binary connects the cognitive core to the game bridge. It:
//!
//! 1. Loads `scout.toml` (or `$SCOUT_CONFIG`), writing a default file on the
//!    first run, and applies `SCOUT_*` environment overrides.
//! 2. Installs the `tracing` subscriber from the `[log]` section.
//! 3. Opens the chunk store and memory, then polls the state file. Every new
//!    snapshot runs one [`AgentLoop`] tick; emitted actions go to the action
//!    file.
//! 4. Writes the visualisation snapshot every `snapshot_interval_ms` from a
//!    separate task.
//! 5. Intercepts **Ctrl-C** / `SIGTERM` to flush dirty chunks and write a
//!    final snapshot before exiting.

mod config;
mod sink;
mod watcher;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use scout_memory::MemorySystem;
use scout_perception::GridSystem;
use scout_runtime::{AgentLoop, SnapshotExporter, init_tracing};

use crate::config::Config;
use crate::sink::ActionFileSink;
use crate::watcher::StateWatcher;

fn main() -> ExitCode {
    // ── Configuration ─────────────────────────────────────────────────────
    let path = config::config_path();
    let loaded = config::load_from(&path);
    let mut cfg = match &loaded {
        Ok(Some(cfg)) => cfg.clone(),
        _ => Config::default(),
    };
    config::apply_env_overrides(&mut cfg);

    // ── Structured logging ────────────────────────────────────────────────
    // Hold the guard until exit so pending spans are flushed.
    let _guard = init_tracing(&cfg.log);
    info!(version = env!("CARGO_PKG_VERSION"), "starting scout");

    match loaded {
        Ok(Some(_)) => info!(path = %path.display(), "config loaded"),
        Ok(None) => write_default_config(&path),
        Err(e) => warn!(error = %e, "using default configuration"),
    }

    // ── Runtime ───────────────────────────────────────────────────────────
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start the async runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cfg)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal");
            ExitCode::FAILURE
        }
    }
}

async fn run(cfg: Config) -> Result<(), String> {
    let grid = GridSystem::open(&cfg.data_dir, cfg.grid.clone())
        .map_err(|e| format!("opening chunk store: {e}"))?;
    let grid = Arc::new(grid);
    let memory = Arc::new(MemorySystem::new(cfg.memory.clone()));
    let mut agent = AgentLoop::new(Arc::clone(&grid), memory, &cfg.planner, cfg.loot.clone());
    let exporter = agent.exporter();
    if let Some(parent) = cfg.snapshot_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("creating {}: {e}", parent.display()))?;
    }

    watcher::remove_stale_state(&cfg.state_file, Duration::from_millis(cfg.hot_attach_ms));
    let mut watcher = StateWatcher::new(&cfg.state_file);
    let mut sink = ActionFileSink::open(&cfg.action_file);
    match sink.clear() {
        Ok(seq) => info!(seq, "cleared bridge action queue"),
        Err(e) => warn!(error = %e, "could not clear the bridge action queue"),
    }

    // ── Shutdown signal ───────────────────────────────────────────────────
    let (stop_tx, mut stop) = watch::channel(false);
    let stop_tx = Arc::new(stop_tx);
    let handler_tx = Arc::clone(&stop_tx);
    if let Err(e) = ctrlc::set_handler(move || {
        signal_stop(&handler_tx);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler; shutdown will skip the final flush");
    }

    // ── Periodic snapshot ─────────────────────────────────────────────────
    let snapshots = tokio::spawn(export_snapshots(
        exporter.clone(),
        cfg.snapshot_file.clone(),
        interval_of(cfg.snapshot_interval_ms),
        stop.clone(),
    ));

    // ── Tick loop ─────────────────────────────────────────────────────────
    info!(
        state = %watcher.path().display(),
        actions = %cfg.action_file.display(),
        seq = sink.sequence(),
        "waiting for snapshots"
    );
    let mut ticker = time::interval(interval_of(cfg.poll_interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            Ok(()) = stop.changed() => break,
        }
        match watcher.poll() {
            Ok(Some(snapshot)) => {
                if let Err(e) = agent.tick_into(&snapshot, &mut sink) {
                    error!(error = %e, "action dispatch failed");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "skipping state update"),
        }
    }

    // ── Shutdown ──────────────────────────────────────────────────────────
    info!("shutdown requested");
    if let Err(e) = snapshots.await {
        error!(error = %e, "snapshot task ended abnormally");
    }
    match grid.flush() {
        Ok(n) => info!(chunks = n, "flushed chunk store"),
        Err(e) => error!(error = %e, "chunk flush failed"),
    }
    final_snapshot(&exporter, &cfg.snapshot_file);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Snapshot export
// ─────────────────────────────────────────────────────────────────────────────

async fn export_snapshots(
    exporter: SnapshotExporter,
    path: PathBuf,
    every: Duration,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            Ok(()) = stop.changed() => break,
        }
        let exporter = exporter.clone();
        let path = path.clone();
        match tokio::task::spawn_blocking(move || exporter.export_current(&path)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "snapshot export failed"),
            Err(e) => error!(error = %e, "snapshot export panicked"),
        }
    }
}

fn final_snapshot(exporter: &SnapshotExporter, path: &Path) {
    match exporter.export_current(path) {
        Ok(summary) => info!(tiles = summary.tiles, path = %path.display(), "final snapshot written"),
        Err(e) => error!(error = %e, "final snapshot failed"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Tell every task to stop. Returns `false` when nobody is listening anymore.
fn signal_stop(tx: &watch::Sender<bool>) -> bool {
    match tx.send(true) {
        Ok(()) => true,
        Err(_) => {
            debug!("shutdown signal received after the tasks ended");
            false
        }
    }
}

/// `tokio::time::interval` rejects a zero period.
fn interval_of(ms: u64) -> Duration {
    Duration::from_millis(ms.max(1))
}

fn write_default_config(path: &Path) {
    match config::save_to(&Config::default(), path) {
        Ok(()) => info!(path = %path.display(), "no config found; wrote defaults"),
        Err(e) => warn!(error = %e, "no config found and defaults could not be written"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_signal_reaches_listeners() {
        let (tx, rx) = watch::channel(false);
        assert!(signal_stop(&tx));
        assert!(*rx.borrow());
    }

    #[test]
    fn stop_signal_without_listeners_is_reported() {
        let (tx, rx) = watch::channel(false);
        drop(rx);
        assert!(!signal_stop(&tx));
    }

    #[test]
    fn zero_interval_is_clamped() {
        assert_eq!(interval_of(0), Duration::from_millis(1));
        assert_eq!(interval_of(250), Duration::from_millis(250));
    }
}
