//! Best-effort on-disk copy of the last good snapshot
//!
//! The mirror is a static fallback artifact (e.g. `public/timetables.json`) in
//! the same shape as the API response. It is never read back into the live
//! store.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::Builder;
use thiserror::Error;

use crate::data::Snapshot;

/// Errors that can occur when writing the mirror file
#[derive(Debug, Error)]
pub enum MirrorError {
    /// Directory creation, write, or rename failed
    #[error("failed to write mirror {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Snapshot could not be serialized
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Writes snapshots to a single JSON file
#[derive(Debug, Clone)]
pub struct SnapshotMirror {
    /// Destination of the mirror file
    path: PathBuf,
}

impl SnapshotMirror {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> MirrorError {
        MirrorError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Writes the snapshot, creating parent directories as needed
    ///
    /// The file is staged under a hidden, randomly named file in the same
    /// directory and renamed into place. The destination path only ever holds
    /// a complete snapshot, and the staging name cannot be guessed by clients
    /// of a static file server.
    pub fn write(&self, snapshot: &Snapshot) -> Result<(), MirrorError> {
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
                parent
            }
            None => Path::new("."),
        };

        let json = serde_json::to_string_pretty(snapshot)?;

        let mut staged = Builder::new()
            .prefix(".mirror-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| self.io_error(e))?;
        staged
            .write_all(json.as_bytes())
            .map_err(|e| self.io_error(e))?;
        staged
            .persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;
        Ok(())
    }

    /// Reads the mirror file back
    ///
    /// Returns `None` if the file doesn't exist or cannot be parsed.
    #[cfg(test)]
    pub(crate) fn load(&self) -> Option<Snapshot> {
        let content = fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&content).ok()
    }
}
