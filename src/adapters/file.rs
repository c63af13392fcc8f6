// SPDX-License-Identifier: MIT OR Apache-2.0

//! File configuration source.

use crate::domain::{detect_format_from_path, normalize_format, ConfigError, Result};
use crate::ports::{ConfigSource, Payload};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/// Files larger than this are refused before they are read.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Reads one configuration file per load.
///
/// The file is read again on every [`load`](ConfigSource::load), so a reload
/// picks up edits. Unless set explicitly, the format comes from the file
/// extension.
///
/// # Examples
///
/// ```rust
/// use cfgweave::adapters::FileSource;
/// use cfgweave::ports::ConfigSource;
/// use std::io::Write;
///
/// let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
/// write!(file, r#"{{"port": 8080}}"#).unwrap();
///
/// let source = FileSource::new(file.path());
/// let payload = source.load().unwrap();
/// assert_eq!(payload.metadata.format, "json");
/// ```
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    format: Option<String>,
    name: String,
}

impl FileSource {
    /// Creates a source for `path`. The display name defaults to the path.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = PathBuf::from(path.as_ref().to_string_lossy().trim());
        let name = path.display().to_string();
        Self {
            path,
            format: None,
            name,
        }
    }

    /// Resolves `file_name` inside the platform configuration directory of an
    /// application, for example `~/.config/<app>/` on Linux.
    pub fn from_default_location(
        qualifier: &str,
        organization: &str,
        application: &str,
        file_name: &str,
    ) -> Result<Self> {
        let dirs = ProjectDirs::from(qualifier, organization, application).ok_or_else(|| {
            ConfigError::SourceError {
                source_name: "file".to_string(),
                message: "failed to determine project directories".to_string(),
                source: None,
            }
        })?;
        Ok(Self::new(dirs.config_dir().join(file_name)))
    }

    /// Overrides extension-based format detection.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(normalize_format(&format.into()));
        self
    }

    /// Overrides the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the path this source reads.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn format(&self) -> Result<String> {
        match &self.format {
            Some(format) => Ok(format.clone()),
            None => detect_format_from_path(&self.path),
        }
    }

    fn read(&self) -> Result<Vec<u8>> {
        let metadata = fs::metadata(&self.path).map_err(|e| {
            ConfigError::source_error(self.name.as_str(), "failed to read file metadata", e)
        })?;

        if metadata.len() > MAX_FILE_SIZE {
            return Err(ConfigError::SourceError {
                source_name: self.name.clone(),
                message: format!(
                    "configuration file too large: {} bytes (max {} bytes)",
                    metadata.len(),
                    MAX_FILE_SIZE
                ),
                source: None,
            });
        }

        fs::read(&self.path)
            .map_err(|e| ConfigError::source_error(self.name.as_str(), "failed to read file", e))
    }
}

impl ConfigSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Payload> {
        let format = self.format()?;
        let bytes = self.read()?;
        tracing::debug!("read {} bytes from {}", bytes.len(), self.path.display());
        Ok(Payload::new(bytes, format, self.name.as_str()))
    }
}
