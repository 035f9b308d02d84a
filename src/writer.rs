//! Artifact persistence.
//!
//! Every artifact is written to a temporary file next to its target and then
//! renamed into place, so readers of the output tree never observe a
//! half-written page. Parent directories are created on demand. A replaced
//! file keeps its permissions; new files are created `0644`.
//!
//! Writes are not transactional across artifacts: if a later write fails the
//! earlier ones stay on disk.

use crate::types::{ArtifactCategory, PageArtifact};
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Write failed for {}: {source}", path.display())]
    Failure { path: PathBuf, source: io::Error },
    #[error("Refusing to publish internal artifact {}", .0.display())]
    InternalArtifact(PathBuf),
    #[error("Artifact path escapes the output root: {}", .0.display())]
    OutsideRoot(PathBuf),
}

/// Writes artifacts under a fixed output root.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    root: PathBuf,
}

impl ArtifactWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist `artifact` and return its absolute path.
    pub fn write(&self, artifact: &PageArtifact) -> Result<PathBuf, WriteError> {
        if artifact.category == ArtifactCategory::Internal {
            return Err(WriteError::InternalArtifact(artifact.output_path.clone()));
        }
        self.write_bytes(&artifact.output_path, artifact.content.as_bytes())
    }

    /// Atomically write raw bytes at `rel_path` under the root.
    pub fn write_bytes(&self, rel_path: &Path, bytes: &[u8]) -> Result<PathBuf, WriteError> {
        let is_contained = rel_path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !is_contained || rel_path.as_os_str().is_empty() {
            return Err(WriteError::OutsideRoot(rel_path.to_path_buf()));
        }

        let target = self.root.join(rel_path);
        let failure = |source| WriteError::Failure {
            path: target.clone(),
            source,
        };

        let parent = target.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent).map_err(failure)?;

        let mut tmp = NamedTempFile::new_in(parent).map_err(failure)?;
        tmp.write_all(bytes).map_err(failure)?;
        // Temp files are created owner-only
        set_publish_permissions(tmp.as_file(), &target).map_err(failure)?;
        tmp.as_file().sync_all().map_err(failure)?;
        tmp.persist(&target).map_err(|e| failure(e.error))?;

        Ok(target)
    }
}

/// Give a staged file the permissions of the file it replaces, or `0644`
/// for a new one.
#[cfg(unix)]
fn set_publish_permissions(file: &fs::File, target: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = fs::metadata(target)
        .map(|meta| meta.permissions().mode() & 0o7777)
        .unwrap_or(0o644);
    file.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_publish_permissions(_file: &fs::File, _target: &Path) -> io::Result<()> {
    Ok(())
}
