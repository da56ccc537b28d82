use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Non-fatal conditions met during a release.
/// These are reported to the user but do not stop the sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BoundaryWarning {
    /// Release continued on a working tree with uncommitted changes
    DirtyTreeOverridden { branch: String },
    /// Changelog update skipped (file or Unreleased section missing)
    ChangelogSkipped { path: PathBuf, reason: String },
    /// No test or build commands were configured or detected
    NoTestOrBuildCommands,
    /// Changelog footer has no `[Unreleased]` compare link to move forward
    CompareLinksUnchanged { path: PathBuf },
    /// Tag created locally but not pushed
    PushSkipped { tag: String, remote: String },
}

impl fmt::Display for BoundaryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryWarning::DirtyTreeOverridden { branch } => {
                write!(
                    f,
                    "Releasing from branch '{}' with uncommitted changes",
                    branch
                )
            }
            BoundaryWarning::ChangelogSkipped { path, reason } => {
                write!(f, "Skipped changelog {}: {}", path.display(), reason)
            }
            BoundaryWarning::NoTestOrBuildCommands => {
                write!(f, "No test or build commands found; nothing was verified")
            }
            BoundaryWarning::CompareLinksUnchanged { path } => {
                write!(
                    f,
                    "No [Unreleased] compare link in {}; links left unchanged",
                    path.display()
                )
            }
            BoundaryWarning::PushSkipped { tag, remote } => {
                write!(f, "Tag '{}' was not pushed to '{}'", tag, remote)
            }
        }
    }
}
