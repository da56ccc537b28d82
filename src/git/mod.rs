//! Version-control abstraction layer
//!
//! The release sequencer only talks to git through the [VersionControl]
//! trait. Implementations:
//!
//! - [repository::Git2Repository]: real repository access using the `git2` crate
//! - [mock::MockRepository]: in-memory recorder for tests
//!
//! Every operation is a binary succeed/fail call from the sequencer's point
//! of view; failures surface as [crate::error::ReleaseError].

pub mod mock;
pub mod repository;

pub use mock::{MockOperation, MockRepository};
pub use repository::Git2Repository;

use crate::error::Result;
use std::path::PathBuf;

/// Working tree state as seen by the precondition check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeStatus {
    Clean,
    Dirty,
}

/// Git operations needed to publish a release
pub trait VersionControl {
    /// Whether the working tree has uncommitted changes to tracked files
    fn status(&self) -> Result<TreeStatus>;

    /// Name of the checked-out branch
    ///
    /// # Returns
    /// * `Err` - On a detached or unborn HEAD
    fn current_branch(&self) -> Result<String>;

    /// Stage files for the next commit
    fn add(&self, paths: &[PathBuf]) -> Result<()>;

    /// Commit the staged changes on HEAD
    fn commit(&self, message: &str) -> Result<()>;

    /// Create an annotated tag on HEAD
    fn tag(&self, name: &str, message: &str) -> Result<()>;

    /// Push a ref (e.g. `refs/heads/main`, `refs/tags/v1.0.0`) to a remote
    fn push(&self, remote: &str, refname: &str) -> Result<()>;
}
