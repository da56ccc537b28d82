use std::path::{Path, PathBuf};

use thiserror::Error;

/// Unified error type for git-release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Version file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Cannot read version from {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("Invalid version '{0}' - expected X.Y.Z")]
    InvalidVersion(String),

    #[error("No version files found in {}", .0.display())]
    NoVersionFiles(PathBuf),

    #[error("Version files disagree: {}", format_versions(.0))]
    InconsistentVersions(Vec<(PathBuf, String)>),

    #[error("Cannot apply a {bump} bump to {version}: version component overflows")]
    VersionOverflow { version: String, bump: String },

    #[error("Target version {target} is not greater than current version {current}")]
    NotAnIncrease { current: String, target: String },

    #[error("Patch conflict in {}: expected version '{expected}' is no longer present", path.display())]
    PatchConflict { path: PathBuf, expected: String },

    #[error("Changelog has no [Unreleased] section")]
    MissingUnreleasedSection,

    #[error("The [Unreleased] section has no entries")]
    EmptyRelease,

    #[error("Malformed changelog: {0}")]
    MalformedChangelog(String),

    #[error("Working tree has uncommitted changes")]
    DirtyWorkingTree,

    #[error("Command '{command}' failed: {reason}")]
    ExternalCommandFailure { command: String, reason: String },

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),
}

/// Convenience type alias for Results in git-release
pub type Result<T> = std::result::Result<T, ReleaseError>;

fn format_versions(versions: &[(PathBuf, String)]) -> String {
    versions
        .iter()
        .map(|(path, version)| format!("{}={}", path.display(), version))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ReleaseError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    /// Create a parse error for a version file
    pub fn parse(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        ReleaseError::Parse {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Create a failure for an external command (test runner, build tool, git)
    pub fn command(command: impl Into<String>, reason: impl Into<String>) -> Self {
        ReleaseError::ExternalCommandFailure {
            command: command.into(),
            reason: reason.into(),
        }
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        ReleaseError::Cancelled(msg.into())
    }

    /// Stable snake_case name of the variant for machine-readable output
    pub fn kind(&self) -> &'static str {
        match self {
            ReleaseError::NotFound(_) => "not_found",
            ReleaseError::Parse { .. } => "parse",
            ReleaseError::InvalidVersion(_) => "invalid_version",
            ReleaseError::NoVersionFiles(_) => "no_version_files",
            ReleaseError::InconsistentVersions(_) => "inconsistent_versions",
            ReleaseError::VersionOverflow { .. } => "version_overflow",
            ReleaseError::NotAnIncrease { .. } => "not_an_increase",
            ReleaseError::PatchConflict { .. } => "patch_conflict",
            ReleaseError::MissingUnreleasedSection => "missing_unreleased_section",
            ReleaseError::EmptyRelease => "empty_release",
            ReleaseError::MalformedChangelog(_) => "malformed_changelog",
            ReleaseError::DirtyWorkingTree => "dirty_working_tree",
            ReleaseError::ExternalCommandFailure { .. } => "external_command_failure",
            ReleaseError::Git(_) => "git",
            ReleaseError::Config(_) => "config",
            ReleaseError::Io(_) => "io",
            ReleaseError::Cancelled(_) => "cancelled",
        }
    }

    /// Soft errors may be skipped by the caller instead of halting a release.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            ReleaseError::NotFound(_) | ReleaseError::MissingUnreleasedSection
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReleaseError::config("test config issue");
        assert_eq!(err.to_string(), "Configuration error: test config issue");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ReleaseError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_inconsistent_versions_lists_every_file() {
        let err = ReleaseError::InconsistentVersions(vec![
            (PathBuf::from("package.json"), "1.0.0".to_string()),
            (PathBuf::from("Cargo.toml"), "1.0.0".to_string()),
            (PathBuf::from("version.txt"), "1.0.1".to_string()),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("package.json=1.0.0"));
        assert!(msg.contains("Cargo.toml=1.0.0"));
        assert!(msg.contains("version.txt=1.0.1"));
    }

    #[test]
    fn test_soft_errors() {
        assert!(ReleaseError::NotFound(PathBuf::from("x")).is_soft());
        assert!(ReleaseError::MissingUnreleasedSection.is_soft());
        assert!(!ReleaseError::EmptyRelease.is_soft());
        assert!(!ReleaseError::DirtyWorkingTree.is_soft());
        assert!(!ReleaseError::parse("x", "no match").is_soft());
    }

    #[test]
    fn test_error_messages_are_descriptive() {
        let error_pairs = vec![
            (ReleaseError::config("x"), "Configuration error"),
            (ReleaseError::parse("a.json", "x"), "Cannot read version"),
            (ReleaseError::command("npm test", "exit code 1"), "Command 'npm test'"),
            (ReleaseError::cancelled("x"), "Operation cancelled"),
            (ReleaseError::InvalidVersion("1.2".into()), "Invalid version"),
        ];

        for (err, expected_prefix) in error_pairs {
            let msg = err.to_string();
            assert!(
                msg.starts_with(expected_prefix),
                "Error message should start with '{}', but got '{}'",
                expected_prefix,
                msg
            );
        }
    }

    #[test]
    fn test_error_kinds() {
        let kinds = vec![
            (ReleaseError::NotFound(PathBuf::from("x")), "not_found"),
            (ReleaseError::InvalidVersion("01.0.0".into()), "invalid_version"),
            (
                ReleaseError::VersionOverflow {
                    version: "1.2.3".into(),
                    bump: "major".into(),
                },
                "version_overflow",
            ),
            (ReleaseError::EmptyRelease, "empty_release"),
            (ReleaseError::DirtyWorkingTree, "dirty_working_tree"),
            (ReleaseError::command("git push", "rejected"), "external_command_failure"),
            (ReleaseError::cancelled("x"), "cancelled"),
        ];

        for (err, expected) in kinds {
            assert_eq!(err.kind(), expected, "wrong kind for '{}'", err);
        }
    }

    #[test]
    fn test_not_an_increase_message() {
        let err = ReleaseError::NotAnIncrease {
            current: "1.2.3".into(),
            target: "1.2.3".into(),
        };
        assert_eq!(
            err.to_string(),
            "Target version 1.2.3 is not greater than current version 1.2.3"
        );
    }
}
