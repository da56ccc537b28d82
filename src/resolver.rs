//! Decision points where a release needs an operator's answer.

use std::path::{Path, PathBuf};

use crate::domain::{BumpRequest, Version, VersionFile};
use crate::error::{ReleaseError, Result};
use crate::sequencer::ReleasePlan;

/// Entries to add to the Unreleased section, grouped by subsection name
pub type ChangelogEntries = Vec<(String, Vec<String>)>;

/// Answers the questions the sequencer cannot decide on its own.
///
/// Every method is called synchronously at a fixed point of the sequence.
/// Returning an error aborts the release at the current stage.
pub trait Resolver {
    /// The working tree is dirty and no override was given. `true` continues.
    fn allow_dirty_tree(&mut self, branch: &str) -> Result<bool>;

    /// No bump was requested; choose one for `current`
    fn choose_bump(&mut self, current: &str, files: &[VersionFile]) -> Result<BumpRequest>;

    /// Version files disagree. Return the version to treat as current, or
    /// `None` to abort.
    fn resolve_inconsistency(&mut self, versions: &[(PathBuf, String)]) -> Result<Option<String>>;

    /// The changelog file or its Unreleased section is missing. `true` skips
    /// the changelog update, `false` aborts.
    fn skip_changelog(&mut self, path: &Path, reason: &ReleaseError) -> Result<bool>;

    /// The Unreleased section is empty. Return entries to release, or `None`
    /// to abort.
    fn supply_changelog_entries(&mut self, version: &Version) -> Result<Option<ChangelogEntries>>;

    /// Last confirmation before any file is modified
    fn confirm_plan(&mut self, plan: &ReleasePlan) -> Result<bool>;
}

/// Non-interactive resolver that rejects every ambiguity.
///
/// Only a missing changelog *file* is skipped: a project without a changelog
/// is not ambiguous.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictResolver;

impl Resolver for StrictResolver {
    fn allow_dirty_tree(&mut self, _branch: &str) -> Result<bool> {
        Ok(false)
    }

    fn choose_bump(&mut self, current: &str, _files: &[VersionFile]) -> Result<BumpRequest> {
        Err(ReleaseError::cancelled(format!(
            "no version bump requested for current version {}",
            current
        )))
    }

    fn resolve_inconsistency(&mut self, _versions: &[(PathBuf, String)]) -> Result<Option<String>> {
        Ok(None)
    }

    fn skip_changelog(&mut self, _path: &Path, reason: &ReleaseError) -> Result<bool> {
        Ok(matches!(reason, ReleaseError::NotFound(_)))
    }

    fn supply_changelog_entries(&mut self, _version: &Version) -> Result<Option<ChangelogEntries>> {
        Ok(None)
    }

    fn confirm_plan(&mut self, _plan: &ReleasePlan) -> Result<bool> {
        Ok(true)
    }
}
