//! File-watch hot-reload (spec §4.8 "Hot-reload contract").
//!
//! `notify` delivers one event per filesystem write, and editors often
//! produce several in quick succession for a single logical save. This
//! coalesces bursts with a fixed quiet period before triggering a reload,
//! rather than reloading once per raw event.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::manager::ConfigManager;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Watches `paths` for changes and calls `ConfigManager::reload` after a
/// quiet period with no further events. Runs until the returned
/// `JoinHandle` is dropped or aborted; intended to be spawned once at
/// startup and held for the process lifetime.
pub fn spawn(
    manager: Arc<ConfigManager>,
    paths: Vec<PathBuf>,
    debounce: Duration,
) -> Result<(tokio::task::JoinHandle<()>, RecommendedWatcher), notify::Error> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| {
            if let Ok(event) = res {
                if event.kind.is_modify() || event.kind.is_create() {
                    let _ = tx.send(());
                }
            }
        },
        notify::Config::default(),
    )?;

    for path in &paths {
        if path.exists() {
            watcher.watch(path, RecursiveMode::NonRecursive)?;
        } else {
            tracing::warn!(path = %path.display(), "hot-reload watch target does not exist yet");
        }
    }

    let handle = tokio::spawn(async move {
        loop {
            if rx.recv().await.is_none() {
                return;
            }
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(debounce) => break,
                    more = rx.recv() => if more.is_none() { return },
                }
            }
            match manager.reload() {
                Ok(snapshot) => {
                    tracing::info!(reload_count = snapshot.reload_count, "config hot-reloaded");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "config hot-reload rejected, keeping prior snapshot");
                }
            }
        }
    });

    Ok((handle, watcher))
}
