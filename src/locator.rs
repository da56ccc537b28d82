//! Version file discovery.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::{FormatKind, VersionFile};
use crate::error::{ReleaseError, Result};
use crate::formats::{self, KNOWN_SOURCES};

/// Read a single version file.
///
/// Returns `NotFound` when the file is absent and `Parse` when it exists but
/// holds no recognizable version.
pub fn read_version_file(path: &Path, format: FormatKind) -> Result<VersionFile> {
    if !path.is_file() {
        return Err(ReleaseError::NotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path)?;
    let version = formats::extract(path, format, &content)?;
    Ok(VersionFile::new(path, format, version))
}

/// Scan `root` for every recognized version file.
///
/// Well-known files come first, then root-level Markdown files carrying the
/// version marker (sorted by name), then `extra_files` from configuration.
/// Absent files are skipped; a present file without a version fails the scan.
pub fn scan(root: &Path, extra_files: &[PathBuf]) -> Result<Vec<VersionFile>> {
    let mut found = Vec::new();

    for source in KNOWN_SOURCES {
        push_if_present(&mut found, &root.join(source.file_name), source.format)?;
    }

    for path in markdown_candidates(root)? {
        let content = fs::read_to_string(&path)?;
        if !formats::has_version_marker(&content) {
            continue;
        }
        let version = formats::extract(&path, FormatKind::Markdown, &content)?;
        found.push(VersionFile::new(path, FormatKind::Markdown, version));
    }

    for extra in extra_files {
        let path = if extra.is_absolute() {
            extra.clone()
        } else {
            root.join(extra)
        };
        if found.iter().any(|f| f.path == path) {
            continue;
        }
        push_if_present(&mut found, &path, FormatKind::infer(&path))?;
    }

    debug!(count = found.len(), root = %root.display(), "version files discovered");
    Ok(found)
}

fn push_if_present(found: &mut Vec<VersionFile>, path: &Path, format: FormatKind) -> Result<()> {
    match read_version_file(path, format) {
        Ok(file) => {
            debug!(path = %file.path.display(), version = %file.version, %format, "found version");
            found.push(file);
            Ok(())
        }
        Err(e) if e.is_soft() => {
            debug!(path = %path.display(), "not present, skipping");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn markdown_candidates(root: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && FormatKind::infer(path) == FormatKind::Markdown)
        .collect();
    paths.sort();
    Ok(paths)
}
