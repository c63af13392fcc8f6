// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared helpers for integration tests: in-memory sources and Docker checks.

#![allow(dead_code)]

use cfgweave::domain::{ConfigError, Result};
use cfgweave::ports::{ConfigSource, Payload};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};

/// An in-memory source whose document can be replaced between loads.
#[derive(Debug)]
pub struct MockSource {
    name: String,
    format: String,
    body: Mutex<String>,
    loads: AtomicUsize,
}

impl MockSource {
    /// Creates a source serving `body` tagged as `format`.
    pub fn new(name: &str, format: &str, body: &str) -> Self {
        Self {
            name: name.to_string(),
            format: format.to_string(),
            body: Mutex::new(body.to_string()),
            loads: AtomicUsize::new(0),
        }
    }

    /// Shorthand for a JSON source.
    pub fn json(name: &str, body: &str) -> Self {
        Self::new(name, "json", body)
    }

    /// Replaces the served document.
    pub fn set(&self, body: &str) {
        *self.body.lock().unwrap() = body.to_string();
    }

    /// Returns how many times `load` was called.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ConfigSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Payload> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let body = self.body.lock().unwrap().clone();
        Ok(Payload::new(body, self.format.as_str(), self.name.as_str()))
    }
}

/// A source that always fails to load.
#[derive(Debug)]
pub struct FailingSource(pub &'static str);

impl ConfigSource for FailingSource {
    fn name(&self) -> &str {
        self.0
    }

    fn load(&self) -> Result<Payload> {
        Err(ConfigError::SourceError {
            source_name: self.0.to_string(),
            message: "connection refused".to_string(),
            source: None,
        })
    }
}

/// Routes `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Cached result of Docker availability check.
static DOCKER_AVAILABLE: OnceLock<bool> = OnceLock::new();

/// Checks if Docker is available on the system.
///
/// This check is cached after the first call.
pub fn is_docker_available() -> bool {
    *DOCKER_AVAILABLE.get_or_init(|| {
        std::process::Command::new("docker")
            .args(["ps"])
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    })
}

/// Prints a warning message that a test is skipped due to Docker being unavailable.
pub fn print_docker_unavailable_warning(test_name: &str) {
    eprintln!("\nSKIPPED: {} - Docker is not available", test_name);
    eprintln!("   To run this test, ensure Docker is installed and running.\n");
}
