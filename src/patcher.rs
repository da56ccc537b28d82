//! In-place version patching.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::domain::VersionFile;
use crate::error::{ReleaseError, Result};
use crate::formats;

/// Replace the version value of `file` inside `content`.
///
/// Only the located value span changes. Returns `PatchConflict` when the span
/// no longer holds the version recorded at discovery.
pub fn replace_version(file: &VersionFile, content: &str, target: &str) -> Result<String> {
    let conflict = || ReleaseError::PatchConflict {
        path: file.path.clone(),
        expected: file.version.clone(),
    };

    let span = formats::locate(&file.path, file.format, content).map_err(|_| conflict())?;
    if content[span.clone()] != file.version {
        return Err(conflict());
    }

    let mut patched = String::with_capacity(content.len() + target.len());
    patched.push_str(&content[..span.start]);
    patched.push_str(target);
    patched.push_str(&content[span.end..]);
    Ok(patched)
}

/// Write `content` to a sibling temp file and atomically move it over `path`.
///
/// Readers observe either the old or the new file, never a partial write.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let permissions = fs::metadata(path)?.permissions();

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(content.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.as_file().set_permissions(permissions)?;
    temp.persist(path).map_err(|e| ReleaseError::Io(e.error))?;
    Ok(())
}

/// Patches applied during one release, with enough state to undo them
#[derive(Debug, Default)]
pub struct PatchSession {
    originals: Vec<(PathBuf, String)>,
}

impl PatchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Patch one file to `target`, remembering its original contents
    pub fn apply(&mut self, file: &VersionFile, target: &str) -> Result<()> {
        let content = fs::read_to_string(&file.path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ReleaseError::PatchConflict {
                    path: file.path.clone(),
                    expected: file.version.clone(),
                }
            } else {
                ReleaseError::Io(e)
            }
        })?;

        let patched = replace_version(file, &content, target)?;
        write_atomic(&file.path, &patched)?;
        debug!(path = %file.path.display(), from = %file.version, to = %target, "patched");

        self.originals.push((file.path.clone(), content));
        Ok(())
    }

    /// Files mutated so far, in patch order
    pub fn patched_files(&self) -> Vec<PathBuf> {
        self.originals.iter().map(|(path, _)| path.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }

    /// Restore every patched file to its original contents.
    ///
    /// Returns the restored paths. Files that could not be restored are
    /// reported through the error and stay recorded in the session.
    pub fn revert(&mut self) -> Result<Vec<PathBuf>> {
        let mut restored = Vec::new();

        while let Some((path, original)) = self.originals.pop() {
            if let Err(e) = write_atomic(&path, &original) {
                warn!(path = %path.display(), error = %e, "failed to restore file");
                self.originals.push((path, original));
                return Err(e);
            }
            restored.push(path);
        }

        restored.reverse();
        Ok(restored)
    }
}
