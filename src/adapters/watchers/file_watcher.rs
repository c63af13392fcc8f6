// SPDX-License-Identifier: MIT OR Apache-2.0

//! File system coordinator for configuration files.

use crate::domain::{ConfigError, Result};
use crate::ports::{ChangeCallback, ChangeCoordinator, ChangeNotice};
use async_trait::async_trait;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Default quiet period after the last event before a notice is raised.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Watches one configuration file.
///
/// Editors often write a file in several steps, so events are debounced:
/// the notice is raised once the file has been quiet for the debounce period.
/// The parent directory is watched, which keeps working when the file is
/// replaced by a rename.
///
/// # Examples
///
/// ```rust,no_run
/// use cfgweave::adapters::watchers::FileWatchCoordinator;
/// use cfgweave::ports::{channel_callback, spawn_coordinator};
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn run() -> cfgweave::domain::Result<()> {
/// let coordinator = Arc::new(FileWatchCoordinator::new("config/app.yaml")?);
/// let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
/// let cancel = CancellationToken::new();
/// let task = spawn_coordinator(coordinator, cancel.clone(), channel_callback(tx));
///
/// if let Some(notice) = rx.recv().await {
///     println!("{:?} changed", notice.keys);
/// }
/// cancel.cancel();
/// # let _ = task.await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FileWatchCoordinator {
    path: PathBuf,
    debounce: Duration,
    name: String,
}

impl FileWatchCoordinator {
    /// Creates a coordinator for an existing file.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(ConfigError::WatcherError {
                message: format!("file does not exist: {}", path.display()),
                source: None,
            });
        }
        let name = format!("file[{}]", path.display());
        Ok(Self {
            path,
            debounce: DEFAULT_DEBOUNCE,
            name,
        })
    }

    /// Sets the debounce period.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Returns the watched file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn concerns(&self, event: &Event) -> bool {
        if matches!(event.kind, EventKind::Access(_)) {
            return false;
        }
        let file_name = self.path.file_name();
        event
            .paths
            .iter()
            .any(|p| p == &self.path || (file_name.is_some() && p.file_name() == file_name))
    }

    fn watch_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

#[async_trait]
impl ChangeCoordinator for FileWatchCoordinator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, cancel: CancellationToken, on_change: ChangeCallback) -> Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher = RecommendedWatcher::new(
            move |event: notify::Result<Event>| {
                let _ = tx.send(event);
            },
            notify::Config::default(),
        )
        .map_err(|e| ConfigError::watcher_error("failed to create file watcher", e))?;

        let dir = self.watch_dir();
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| ConfigError::watcher_error(format!("failed to watch {}", dir.display()), e))?;
        tracing::info!("watching {}", self.path.display());

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                event = rx.recv() => event,
            };

            match event {
                None => {
                    return Err(ConfigError::WatcherError {
                        message: "file watcher stopped delivering events".to_string(),
                        source: None,
                    })
                }
                Some(Err(e)) => {
                    tracing::warn!("{}: watch error: {}", self.name, e);
                    continue;
                }
                Some(Ok(event)) if !self.concerns(&event) => continue,
                Some(Ok(_)) => {}
            }

            // quiet period: absorb the burst that follows the first event
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(self.debounce) => break,
                    more = rx.recv() => {
                        if more.is_none() {
                            break;
                        }
                    }
                }
            }

            tracing::debug!("{}: file changed", self.name);
            on_change(ChangeNotice::new(self.name.as_str()).with_keys([self.path.display().to_string()]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_rejected() {
        assert!(FileWatchCoordinator::new("/nonexistent/path/to/app.yaml").is_err());
    }

    #[test]
    fn test_custom_debounce() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.yaml");
        fs::write(&path, "a: 1").unwrap();
        let coordinator = FileWatchCoordinator::new(&path)
            .unwrap()
            .with_debounce(Duration::from_secs(1));
        assert_eq!(coordinator.debounce, Duration::from_secs(1));
        assert_eq!(coordinator.watch_dir(), dir.path());
    }

    #[tokio::test]
    async fn test_cancel_stops_watch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.yaml");
        fs::write(&path, "a: 1").unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let coordinator = FileWatchCoordinator::new(&path).unwrap();
        assert!(coordinator.start(cancel, Arc::new(|_| {})).await.is_ok());
    }

    #[tokio::test]
    async fn test_write_raises_one_debounced_notice() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.yaml");
        fs::write(&path, "a: 1").unwrap();

        let coordinator = Arc::new(
            FileWatchCoordinator::new(&path)
                .unwrap()
                .with_debounce(Duration::from_millis(100)),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = crate::ports::spawn_coordinator(
            coordinator,
            cancel.clone(),
            crate::ports::channel_callback(tx),
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        fs::write(&path, "a: 2").unwrap();
        fs::write(&path, "a: 3").unwrap();

        // file system notification delivery is platform dependent
        if let Ok(Some(notice)) = tokio::time::timeout(Duration::from_secs(3), rx.recv()).await {
            assert!(notice.origin.starts_with("file["));
            assert_eq!(notice.keys.len(), 1);
        }

        cancel.cancel();
        assert!(task.await.unwrap().is_ok());
    }
}
