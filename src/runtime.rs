// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared Tokio runtime for synchronous sources.
//!
//! [`ConfigSource::load`](crate::ports::ConfigSource::load) is synchronous, but
//! the network clients behind the remote sources are async. `block_on` drives
//! such a future to completion from any calling context.

use crate::domain::{ConfigError, Result};
use once_cell::sync::OnceCell;
use std::future::Future;
use tokio::runtime::{Builder, Handle, Runtime};

static SHARED: OnceCell<Runtime> = OnceCell::new();

fn shared() -> Result<&'static Runtime> {
    SHARED.get_or_try_init(|| {
        tracing::debug!("starting shared runtime for remote sources");
        Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("cfgweave-io")
            .enable_all()
            .build()
            .map_err(|e| ConfigError::SourceError {
                source_name: "runtime".to_string(),
                message: "failed to start shared runtime".to_string(),
                source: Some(Box::new(e)),
            })
    })
}

/// Runs `future` to completion and returns its output.
///
/// Outside a Tokio context the shared runtime drives the future directly.
/// Inside one, the future is driven on the shared runtime from a scoped helper
/// thread, so the caller's executor is never re-entered.
pub fn block_on<F>(future: F) -> Result<F::Output>
where
    F: Future + Send,
    F::Output: Send,
{
    let runtime = shared()?;
    if Handle::try_current().is_err() {
        return Ok(runtime.block_on(future));
    }

    std::thread::scope(|scope| {
        scope
            .spawn(|| runtime.block_on(future))
            .join()
            .map_err(|_| ConfigError::SourceError {
                source_name: "runtime".to_string(),
                message: "blocking helper thread panicked".to_string(),
                source: None,
            })
    })
}
