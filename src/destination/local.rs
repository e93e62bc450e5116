//! Filesystem destination (spec.md §4.D): copy into a directory, no-op if
//! the artifact is already there.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::BackupError;
use crate::model::{is_backup_filename, BackupArtifact};

use super::{Destination, DestinationEntry};

pub struct LocalDestination {
    name: String,
    directory: PathBuf,
}

impl LocalDestination {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            name: "local".to_string(),
            directory: directory.into(),
        }
    }
}

impl Destination for LocalDestination {
    fn name(&self) -> &str {
        &self.name
    }

    fn deliver(&self, local_path: &Path) -> Result<BackupArtifact, BackupError> {
        std::fs::create_dir_all(&self.directory).map_err(BackupError::WriteFailed)?;

        let file_name = local_path
            .file_name()
            .ok_or_else(|| BackupError::WriteFailed(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "artifact path has no file name",
            )))?;
        let target = self.directory.join(file_name);

        if target != local_path {
            if target.exists() {
                std::fs::remove_file(&target).map_err(BackupError::WriteFailed)?;
            }
            // Always copy, never rename/move: the orchestrator owns the
            // scratch file for the duration of delivery to every enabled
            // destination (spec §4.D/§5's "local first, then remote" order),
            // and a move would delete it out from under a later destination.
            // The orchestrator removes the scratch file itself once every
            // destination has had a chance to read it.
            std::fs::copy(local_path, &target).map_err(BackupError::WriteFailed)?;
        }

        let metadata = std::fs::metadata(&target).map_err(BackupError::WriteFailed)?;
        Ok(BackupArtifact {
            path: target,
            byte_size: metadata.len(),
            checksum: None,
            destination: self.name.clone(),
            created_at: Utc::now(),
        })
    }

    fn list(&self) -> Result<Vec<DestinationEntry>, BackupError> {
        if !self.directory.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        let dir = std::fs::read_dir(&self.directory).map_err(BackupError::WriteFailed)?;
        for entry in dir {
            let entry = entry.map_err(BackupError::WriteFailed)?;
            let file_name = entry.file_name().to_string_lossy().to_string();
            if !is_backup_filename(&file_name) {
                continue;
            }
            let metadata = entry.metadata().map_err(BackupError::WriteFailed)?;
            let modified_at: DateTime<Utc> = metadata
                .modified()
                .map_err(BackupError::WriteFailed)?
                .into();
            entries.push(DestinationEntry {
                name: file_name,
                modified_at,
                size: metadata.len(),
            });
        }
        Ok(entries)
    }

    fn delete(&self, name: &str) -> Result<(), BackupError> {
        std::fs::remove_file(self.directory.join(name)).map_err(BackupError::WriteFailed)
    }
}
