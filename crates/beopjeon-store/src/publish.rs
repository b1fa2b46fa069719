//! Two-phase publish: stage next to the target, then atomically rename.
//!
//! Readers of the target path see either the previous file or the complete
//! new one, never a partial write. A staged file that is dropped without
//! [`Staged::commit`] is removed and leaves the target untouched.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::StoreError;

/// A fully written, synced temporary file waiting to replace `target`.
#[derive(Debug)]
pub struct Staged {
    file: NamedTempFile,
    target: PathBuf,
}

impl Staged {
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Atomically replace the target with the staged bytes.
    pub fn commit(self) -> Result<(), StoreError> {
        let Staged { file, target } = self;
        file.persist(&target).map_err(|e| StoreError::Persist {
            path: target.clone(),
            source: e.error,
        })?;
        info!(path = %target.display(), "published");
        Ok(())
    }
}

fn parent_dir(target: &Path) -> &Path {
    match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Write `bytes` to a temporary file in the target's directory.
pub fn stage(target: &Path, bytes: &[u8]) -> Result<Staged, StoreError> {
    let dir = parent_dir(target);
    std::fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

    let mut file = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    file.write_all(bytes).map_err(|e| StoreError::io(file.path(), e))?;
    file.flush().map_err(|e| StoreError::io(file.path(), e))?;
    file.as_file().sync_all().map_err(|e| StoreError::io(file.path(), e))?;
    debug!(path = %target.display(), bytes = bytes.len(), "staged");

    Ok(Staged {
        file,
        target: target.to_path_buf(),
    })
}

pub fn publish(target: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    stage(target, bytes)?.commit()
}
