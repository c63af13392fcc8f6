// SPDX-License-Identifier: MIT OR Apache-2.0

//! Polling coordinator.

use crate::domain::Result;
use crate::ports::{ChangeCallback, ChangeCoordinator, ChangeNotice, ConfigSource};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Re-fetches a source on a fixed period and reports byte-level changes.
///
/// The content seen at start is the baseline, so only later edits raise a
/// notice. A failed fetch is logged and leaves the baseline alone: the next
/// successful fetch is still compared with the last good content.
///
/// Loads run on Tokio's blocking pool, since [`ConfigSource::load`] is
/// synchronous.
///
/// # Examples
///
/// ```rust,no_run
/// use cfgweave::adapters::{FileSource, watchers::PollingCoordinator};
/// use cfgweave::ports::{ChangeCoordinator, ConfigSource};
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn run() -> cfgweave::domain::Result<()> {
/// let source: Arc<dyn ConfigSource> = Arc::new(FileSource::new("config/app.yaml"));
/// let coordinator = PollingCoordinator::new(source, Duration::from_secs(30));
/// coordinator
///     .start(CancellationToken::new(), Arc::new(|_| println!("changed")))
///     .await
/// # }
/// ```
pub struct PollingCoordinator {
    source: Arc<dyn ConfigSource>,
    period: Duration,
    name: String,
}

impl PollingCoordinator {
    /// Creates a coordinator polling `source` every `period`.
    ///
    /// A zero period is raised to one millisecond.
    pub fn new(source: Arc<dyn ConfigSource>, period: Duration) -> Self {
        let name = format!("poll[{}]", source.name());
        Self {
            source,
            period: period.max(Duration::from_millis(1)),
            name,
        }
    }

    /// Returns the polling period.
    pub fn period(&self) -> Duration {
        self.period
    }

    async fn fetch(&self) -> Option<Vec<u8>> {
        let source = Arc::clone(&self.source);
        match tokio::task::spawn_blocking(move || source.load()).await {
            Ok(Ok(payload)) => Some(payload.bytes),
            Ok(Err(e)) => {
                tracing::warn!("{}: fetch failed: {}", self.name, e);
                None
            }
            Err(e) => {
                tracing::warn!("{}: fetch task failed: {}", self.name, e);
                None
            }
        }
    }
}

impl std::fmt::Debug for PollingCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingCoordinator")
            .field("name", &self.name)
            .field("period", &self.period)
            .finish()
    }
}

#[async_trait]
impl ChangeCoordinator for PollingCoordinator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, cancel: CancellationToken, on_change: ChangeCallback) -> Result<()> {
        let mut last = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            baseline = self.fetch() => baseline,
        };

        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                _ = ticker.tick() => {}
            }

            let Some(content) = (tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                content = self.fetch() => content,
            }) else {
                continue;
            };

            if last.as_deref() != Some(content.as_slice()) {
                tracing::debug!("{}: content changed", self.name);
                last = Some(content);
                on_change(ChangeNotice::new(self.name.as_str()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConfigError;
    use crate::ports::Payload;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays scripted fetch results; `None` is a failure. Cancels when empty.
    struct Replay {
        script: Mutex<VecDeque<Option<&'static str>>>,
        done: CancellationToken,
    }

    impl ConfigSource for Replay {
        fn name(&self) -> &str {
            "replay"
        }

        fn load(&self) -> Result<Payload> {
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Some(body)) => Ok(Payload::new(body, "json", "replay")),
                Some(None) => Err(ConfigError::SourceError {
                    source_name: "replay".to_string(),
                    message: "unreachable".to_string(),
                    source: None,
                }),
                None => {
                    self.done.cancel();
                    Err(ConfigError::SourceError {
                        source_name: "replay".to_string(),
                        message: "script exhausted".to_string(),
                        source: None,
                    })
                }
            }
        }
    }

    async fn run(script: Vec<Option<&'static str>>) -> usize {
        let cancel = CancellationToken::new();
        let source = Arc::new(Replay {
            script: Mutex::new(script.into()),
            done: cancel.clone(),
        });
        let coordinator = PollingCoordinator::new(source, Duration::from_millis(5));
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        coordinator
            .start(cancel, Arc::new(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            }))
            .await
            .unwrap();
        calls.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_unchanged_content_is_silent() {
        assert_eq!(run(vec![Some("a"), Some("a"), Some("a")]).await, 0);
    }

    #[tokio::test]
    async fn test_each_difference_notifies() {
        assert_eq!(run(vec![Some("a"), Some("b"), Some("b"), Some("c")]).await, 2);
    }

    #[tokio::test]
    async fn test_failures_do_not_move_baseline() {
        // a -> fail -> a: no change; then b: one change
        assert_eq!(run(vec![Some("a"), None, Some("a"), None, Some("b")]).await, 1);
    }

    #[tokio::test]
    async fn test_failed_baseline_then_content_notifies() {
        assert_eq!(run(vec![None, Some("a"), Some("a")]).await, 1);
    }

    #[test]
    fn test_name_and_period() {
        let source = Arc::new(Replay {
            script: Mutex::new(VecDeque::new()),
            done: CancellationToken::new(),
        });
        let coordinator = PollingCoordinator::new(source, Duration::ZERO);
        assert_eq!(coordinator.name(), "poll[replay]");
        assert_eq!(coordinator.period(), Duration::from_millis(1));
    }
}
