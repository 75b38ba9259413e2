use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::RwLock;

use super::MachineConfig;

/// Watches a [`MachineConfig`] file on disk and hot-swaps the in-memory
/// config behind an `RwLock` when it changes. A reload that fails to parse
/// or validate is logged and discarded — the previous config stays in
/// effect rather than aborting the process.
pub struct ConfigWatcher {
    current: Arc<RwLock<Arc<MachineConfig>>>,
    // Kept alive for as long as the watcher should keep watching; dropping
    // it stops filesystem notifications.
    _watcher: RecommendedWatcher,
}

impl ConfigWatcher {
    pub fn start(path: impl Into<PathBuf>, initial: MachineConfig) -> notify::Result<Self> {
        let path = path.into();
        let current = Arc::new(RwLock::new(Arc::new(initial)));
        let current_for_events = current.clone();
        let watch_path = path.clone();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = tx.send(res);
        })?;
        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    Ok(event) if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) => {
                        reload(&watch_path, &current_for_events).await;
                    }
                    Ok(_) => {}
                    Err(err) => tracing::warn!(error = %err, "config watcher error"),
                }
            }
        });

        Ok(Self {
            current,
            _watcher: watcher,
        })
    }

    pub async fn current(&self) -> Arc<MachineConfig> {
        self.current.read().await.clone()
    }
}

async fn reload(path: &Path, slot: &RwLock<Arc<MachineConfig>>) {
    match MachineConfig::load(path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "reloaded machine config");
            *slot.write().await = Arc::new(config);
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "discarding invalid config reload");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn starts_with_initial_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("machine.toml");
        std::fs::write(&path, "max_load = 0.4\n").unwrap();

        let watcher = ConfigWatcher::start(&path, MachineConfig::default()).unwrap();
        assert_eq!(watcher.current().await.max_load, 0.8);
    }

    #[tokio::test]
    async fn reload_swaps_config_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("machine.toml");
        std::fs::write(&path, "max_load = 0.4\n").unwrap();

        let watcher = ConfigWatcher::start(&path, MachineConfig::default()).unwrap();

        std::fs::write(&path, "max_load = 0.6\n").unwrap();
        // Filesystem notifications are not instant; poll briefly.
        for _ in 0..50 {
            if watcher.current().await.max_load == 0.6 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(watcher.current().await.max_load, 0.6);
    }
}
