//! Target version planning.

use std::path::PathBuf;

use crate::domain::{BumpRequest, Version, VersionFile};
use crate::error::{ReleaseError, Result};

/// Current and target versions of a release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionPlan {
    pub current: Version,
    pub target: Version,
}

/// The single version recorded across all files.
///
/// Files that disagree produce `InconsistentVersions` listing every file, so
/// the operator decides; no value is ever picked by majority.
pub fn current_version(files: &[VersionFile]) -> Result<String> {
    let first = files
        .first()
        .ok_or_else(|| ReleaseError::NoVersionFiles(PathBuf::from(".")))?;

    if files.iter().all(|f| f.version == first.version) {
        return Ok(first.version.clone());
    }

    Err(ReleaseError::InconsistentVersions(
        files
            .iter()
            .map(|f| (f.path.clone(), f.version.clone()))
            .collect(),
    ))
}

/// Compute the target version for `request` starting from `current`.
pub fn compute_target(current: &str, request: &BumpRequest) -> Result<VersionPlan> {
    let current = Version::parse(current)?;

    let target = match request {
        BumpRequest::Relative(bump) => current.bump(*bump)?,
        BumpRequest::Explicit(literal) => {
            let target = Version::parse(literal)?;
            if target <= current {
                return Err(ReleaseError::NotAnIncrease {
                    current: current.to_string(),
                    target: target.to_string(),
                });
            }
            target
        }
    };

    Ok(VersionPlan { current, target })
}

/// Plan a release from discovered files.
///
/// `resolution` is the operator's answer to an earlier `InconsistentVersions`
/// error and replaces the consistency check when present.
pub fn plan(
    files: &[VersionFile],
    request: &BumpRequest,
    resolution: Option<&str>,
) -> Result<VersionPlan> {
    let current = match resolution {
        Some(resolved) => {
            if files.is_empty() {
                return Err(ReleaseError::NoVersionFiles(PathBuf::from(".")));
            }
            resolved.to_string()
        }
        None => current_version(files)?,
    };

    compute_target(&current, request)
}
