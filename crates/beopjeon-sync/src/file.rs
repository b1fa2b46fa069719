//! Local filesystem and zip-archive source adapters.

use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use beopjeon_core::{Format, RawPayload, SourceRef};
use chrono::Utc;
use tracing::debug;

use crate::adapter::{declared_format, SourceAdapter};
use crate::error::FetchError;

/// Reads targets as paths relative to a base directory.
pub struct FileSource {
    id: String,
    root: PathBuf,
    format: Option<Format>,
}

impl FileSource {
    pub fn new(id: impl Into<String>, root: impl Into<PathBuf>, format: Option<Format>) -> Self {
        Self {
            id: id.into(),
            root: root.into(),
            format,
        }
    }

    pub fn path_for(&self, target: &SourceRef) -> PathBuf {
        self.root.join(&target.uri)
    }
}

#[async_trait]
impl SourceAdapter for FileSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch(&self, target: &SourceRef) -> Result<RawPayload, FetchError> {
        let path = self.path_for(target);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| FetchError::from_io(e, &path.display().to_string()))?;
        debug!(source_id = %self.id, path = %path.display(), bytes = bytes.len(), "read file");

        Ok(RawPayload {
            source: target.stamped(&bytes, Utc::now()),
            format: declared_format(self.format, target),
            bytes,
        })
    }
}

/// Reads targets as entry names inside a local zip archive.
pub struct ArchiveSource {
    id: String,
    archive: PathBuf,
    format: Option<Format>,
}

impl ArchiveSource {
    pub fn new(id: impl Into<String>, archive: impl Into<PathBuf>, format: Option<Format>) -> Self {
        Self {
            id: id.into(),
            archive: archive.into(),
            format,
        }
    }
}

fn read_entry(archive: &Path, name: &str) -> Result<Vec<u8>, FetchError> {
    let file = std::fs::File::open(archive)
        .map_err(|e| FetchError::from_io(e, &archive.display().to_string()))?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| FetchError::Io(format!("{}: {e}", archive.display())))?;
    let mut entry = zip.by_name(name).map_err(|e| match e {
        zip::result::ZipError::FileNotFound => FetchError::NotFound(name.to_string()),
        other => FetchError::Io(format!("{name}: {other}")),
    })?;

    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| FetchError::Io(format!("{name}: {e}")))?;
    Ok(bytes)
}

#[async_trait]
impl SourceAdapter for ArchiveSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch(&self, target: &SourceRef) -> Result<RawPayload, FetchError> {
        let archive = self.archive.clone();
        let name = target.uri.clone();
        let bytes = tokio::task::spawn_blocking(move || read_entry(&archive, &name))
            .await
            .map_err(|e| FetchError::Io(format!("archive reader panicked: {e}")))??;
        debug!(source_id = %self.id, entry = %target.uri, bytes = bytes.len(), "read archive entry");

        Ok(RawPayload {
            source: target.stamped(&bytes, Utc::now()),
            format: declared_format(self.format, target),
            bytes,
        })
    }
}
