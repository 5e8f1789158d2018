//! PID file held for the lifetime of the server

use crate::core::validation::ValidationError;
use std::path::{Path, PathBuf};

/// Writes the current process id on creation and removes the file on drop
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, ValidationError> {
        let path = path.as_ref().to_path_buf();
        std::fs::write(&path, format!("{}\n", std::process::id())).map_err(|e| {
            ValidationError::new(format!("Cannot write PID file {}: {}", path.display(), e))
        })?;
        log::debug!("pid file {} written", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            log::warn!("could not remove pid file {}: {}", self.path.display(), e);
        }
    }
}
