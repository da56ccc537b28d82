use crate::error::{ReleaseError, Result};
use crate::git::{TreeStatus, VersionControl};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// Operations a [MockRepository] can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOperation {
    Status,
    Add,
    Commit,
    Tag,
    Push,
}

#[derive(Debug, Default)]
struct MockState {
    dirty: bool,
    branch: Option<String>,
    staged: Vec<PathBuf>,
    committed: Vec<PathBuf>,
    commits: Vec<String>,
    tags: Vec<(String, String)>,
    pushes: Vec<(String, String)>,
    rejected_refs: Vec<String>,
    fail_on: Option<MockOperation>,
}

/// Mock repository recording every call instead of touching git
pub struct MockRepository {
    state: Mutex<MockState>,
}

impl MockRepository {
    /// Create a clean mock repository on branch `main`
    pub fn new() -> Self {
        MockRepository {
            state: Mutex::new(MockState {
                branch: Some("main".to_string()),
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_dirty(&self, dirty: bool) {
        self.state().dirty = dirty;
    }

    /// `None` simulates a detached HEAD
    pub fn set_branch(&self, branch: Option<&str>) {
        self.state().branch = branch.map(str::to_string);
    }

    pub fn fail_on(&self, operation: MockOperation) {
        self.state().fail_on = Some(operation);
    }

    /// Make the remote reject pushes of `refname` only
    pub fn reject_ref(&self, refname: &str) {
        self.state().rejected_refs.push(refname.to_string());
    }

    pub fn staged(&self) -> Vec<PathBuf> {
        self.state().staged.clone()
    }

    /// Every path included in a commit so far
    pub fn committed_files(&self) -> Vec<PathBuf> {
        self.state().committed.clone()
    }

    pub fn commits(&self) -> Vec<String> {
        self.state().commits.clone()
    }

    /// Tags as (name, annotation) pairs
    pub fn tags(&self) -> Vec<(String, String)> {
        self.state().tags.clone()
    }

    /// Pushes as (remote, ref) pairs
    pub fn pushes(&self) -> Vec<(String, String)> {
        self.state().pushes.clone()
    }

    fn check(&self, operation: MockOperation, command: &str) -> Result<()> {
        if self.state().fail_on == Some(operation) {
            return Err(ReleaseError::command(command, "simulated failure"));
        }
        Ok(())
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionControl for MockRepository {
    fn status(&self) -> Result<TreeStatus> {
        self.check(MockOperation::Status, "git status")?;
        Ok(if self.state().dirty {
            TreeStatus::Dirty
        } else {
            TreeStatus::Clean
        })
    }

    fn current_branch(&self) -> Result<String> {
        self.state()
            .branch
            .clone()
            .ok_or_else(|| ReleaseError::command("git symbolic-ref HEAD", "HEAD is detached"))
    }

    fn add(&self, paths: &[PathBuf]) -> Result<()> {
        self.check(MockOperation::Add, "git add")?;
        self.state().staged.extend(paths.iter().cloned());
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<()> {
        self.check(MockOperation::Commit, "git commit")?;
        let mut state = self.state();
        state.commits.push(message.to_string());
        let staged = std::mem::take(&mut state.staged);
        state.committed.extend(staged);
        state.dirty = false;
        Ok(())
    }

    fn tag(&self, name: &str, message: &str) -> Result<()> {
        self.check(MockOperation::Tag, "git tag")?;
        let mut state = self.state();
        if state.tags.iter().any(|(existing, _)| existing == name) {
            return Err(ReleaseError::command(
                format!("git tag -a {}", name),
                "tag already exists",
            ));
        }
        state.tags.push((name.to_string(), message.to_string()));
        Ok(())
    }

    fn push(&self, remote: &str, refname: &str) -> Result<()> {
        self.check(MockOperation::Push, "git push")?;
        let mut state = self.state();
        if state.rejected_refs.iter().any(|rejected| rejected == refname) {
            return Err(ReleaseError::command(
                format!("git push {} {}", remote, refname),
                "rejected by remote",
            ));
        }
        state.pushes.push((remote.to_string(), refname.to_string()));
        Ok(())
    }
}
