//! Release workflow orchestration
//!
//! Runs the release as a strictly ordered sequence of stages:
//!
//! `Init → PreconditionCheck → Plan → Patch → ChangelogUpdate → TestBuild →
//! Commit → Tag → Push → Done`
//!
//! The first hard error moves the sequence to `Aborted` and is reported as a
//! [ReleaseFailure] naming the failed stage and every file modified so far.
//! Nothing is committed, tagged or pushed after a failure.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::boundary::BoundaryWarning;
use crate::changelog::Changelog;
use crate::config::{Config, PatchFailurePolicy};
use crate::domain::{BumpRequest, Version, VersionFile};
use crate::error::{ReleaseError, Result};
use crate::git::{TreeStatus, VersionControl};
use crate::locator;
use crate::patcher::PatchSession;
use crate::planner;
use crate::resolver::Resolver;
use crate::runner::{detect_commands, CommandRunner, ProjectCommands};

/// Release stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    PreconditionCheck,
    Plan,
    Patch,
    ChangelogUpdate,
    TestBuild,
    Commit,
    Tag,
    Push,
    Done,
    Aborted,
}

impl Stage {
    /// The only stage this one may advance to (besides `Aborted`)
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Init => Some(Stage::PreconditionCheck),
            Stage::PreconditionCheck => Some(Stage::Plan),
            Stage::Plan => Some(Stage::Patch),
            Stage::Patch => Some(Stage::ChangelogUpdate),
            Stage::ChangelogUpdate => Some(Stage::TestBuild),
            Stage::TestBuild => Some(Stage::Commit),
            Stage::Commit => Some(Stage::Tag),
            Stage::Tag => Some(Stage::Push),
            Stage::Push => Some(Stage::Done),
            Stage::Done | Stage::Aborted => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Aborted)
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::PreconditionCheck => "precondition check",
            Stage::Plan => "plan",
            Stage::Patch => "patch",
            Stage::ChangelogUpdate => "changelog update",
            Stage::TestBuild => "test/build",
            Stage::Commit => "commit",
            Stage::Tag => "tag",
            Stage::Push => "push",
            Stage::Done => "done",
            Stage::Aborted => "aborted",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Options of one release attempt
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseRequest {
    /// `None` lets the resolver choose
    pub bump: Option<BumpRequest>,
    pub allow_dirty: bool,
    /// Stop after planning without touching anything
    pub dry_run: bool,
    pub push: bool,
}

impl Default for ReleaseRequest {
    fn default() -> Self {
        ReleaseRequest {
            bump: None,
            allow_dirty: false,
            dry_run: false,
            push: true,
        }
    }
}

/// Everything decided before the first file is modified
#[derive(Debug, Clone, Serialize)]
pub struct ReleasePlan {
    pub current: Version,
    pub target: Version,
    pub files: Vec<VersionFile>,
    pub changelog: PathBuf,
    pub commands: ProjectCommands,
    pub branch: String,
    pub dirty: bool,
    pub tag: String,
    pub commit_message: String,
    pub tag_message: String,
    pub remote: String,
}

/// Result of a release that reached `Done`, or of a dry run
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseSummary {
    pub version: String,
    pub tag: String,
    pub remote: String,
    pub stage: Stage,
    pub dry_run: bool,
    pub patched_files: Vec<PathBuf>,
    pub changelog_updated: bool,
    pub tag_created: bool,
    pub tag_pushed: bool,
    pub warnings: Vec<BoundaryWarning>,
    /// Only set for dry runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<ReleasePlan>,
}

/// An aborted release
#[derive(Debug, Error)]
#[error("release aborted during {stage}: {error}")]
pub struct ReleaseFailure {
    /// Stage that failed
    pub stage: Stage,
    pub last_completed: Stage,
    #[source]
    pub error: ReleaseError,
    /// Files changed on disk before the failure
    pub modified_files: Vec<PathBuf>,
    /// Whether `modified_files` were restored to their original contents
    pub reverted: bool,
    /// Refs that reached the remote before the failure
    pub pushed_refs: Vec<String>,
    pub warnings: Vec<BoundaryWarning>,
}

impl ReleaseFailure {
    /// JSON form of the failure, with the error kind for scripts
    pub fn report(&self) -> serde_json::Value {
        serde_json::json!({
            "stage": self.stage,
            "last_completed": self.last_completed,
            "kind": self.error.kind(),
            "error": self.error.to_string(),
            "modified_files": self.modified_files,
            "reverted": self.reverted,
            "pushed_refs": self.pushed_refs,
            "warnings": self.warnings,
        })
    }
}

/// Drives one release attempt through every stage
pub struct Sequencer<'a> {
    root: PathBuf,
    config: &'a Config,
    vcs: &'a dyn VersionControl,
    runner: &'a dyn CommandRunner,
    resolver: &'a mut dyn Resolver,
    release_date: Option<String>,
    stage: Stage,
    last_completed: Stage,
    patches: PatchSession,
    changelog_written: Option<PathBuf>,
    tag_created: bool,
    tag_pushed: bool,
    pushed_refs: Vec<String>,
    warnings: Vec<BoundaryWarning>,
}

impl<'a> Sequencer<'a> {
    pub fn new(
        root: impl Into<PathBuf>,
        config: &'a Config,
        vcs: &'a dyn VersionControl,
        runner: &'a dyn CommandRunner,
        resolver: &'a mut dyn Resolver,
    ) -> Self {
        Sequencer {
            root: root.into(),
            config,
            vcs,
            runner,
            resolver,
            release_date: None,
            stage: Stage::Init,
            last_completed: Stage::Init,
            patches: PatchSession::new(),
            changelog_written: None,
            tag_created: false,
            tag_pushed: false,
            pushed_refs: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Use a fixed `YYYY-MM-DD` release date instead of today's local date
    pub fn with_release_date(mut self, date: impl Into<String>) -> Self {
        self.release_date = Some(date.into());
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Run the release to completion or to the first hard error
    pub fn run(mut self, request: &ReleaseRequest) -> std::result::Result<ReleaseSummary, ReleaseFailure> {
        match self.execute(request) {
            Ok(summary) => Ok(summary),
            Err(error) => Err(self.abort(error)),
        }
    }

    fn advance(&mut self, next: Stage) {
        debug_assert_eq!(
            self.stage.next(),
            Some(next),
            "invalid stage transition {} -> {}",
            self.stage,
            next
        );
        self.last_completed = self.stage;
        self.stage = next;
        info!(stage = %next, "entering stage");
    }

    fn execute(&mut self, request: &ReleaseRequest) -> Result<ReleaseSummary> {
        self.advance(Stage::PreconditionCheck);
        let (branch, dirty) = self.check_preconditions(request)?;

        self.advance(Stage::Plan);
        let plan = self.plan(request, branch, dirty)?;
        if request.dry_run {
            self.last_completed = Stage::Plan;
            return Ok(self.summary(&plan, true));
        }
        if !self.resolver.confirm_plan(&plan)? {
            return Err(ReleaseError::cancelled("release plan declined"));
        }

        self.advance(Stage::Patch);
        self.patch(&plan)?;

        self.advance(Stage::ChangelogUpdate);
        self.update_changelog(&plan)?;

        self.advance(Stage::TestBuild);
        self.test_and_build(&plan)?;

        self.advance(Stage::Commit);
        self.commit(&plan)?;

        self.advance(Stage::Tag);
        self.vcs.tag(&plan.tag, &plan.tag_message)?;
        self.tag_created = true;

        self.advance(Stage::Push);
        self.push(request, &plan)?;

        self.advance(Stage::Done);
        self.last_completed = Stage::Done;
        Ok(self.summary(&plan, false))
    }

    fn check_preconditions(&mut self, request: &ReleaseRequest) -> Result<(String, bool)> {
        let dirty = self.vcs.status()? == TreeStatus::Dirty;
        let branch = self.vcs.current_branch()?;
        debug!(%branch, dirty, "working tree checked");

        if dirty {
            let allowed = request.allow_dirty
                || self.config.behavior.allow_dirty
                || self.resolver.allow_dirty_tree(&branch)?;
            if !allowed {
                return Err(ReleaseError::DirtyWorkingTree);
            }
            self.warnings.push(BoundaryWarning::DirtyTreeOverridden {
                branch: branch.clone(),
            });
        }

        Ok((branch, dirty))
    }

    fn plan(&mut self, request: &ReleaseRequest, branch: String, dirty: bool) -> Result<ReleasePlan> {
        let files = locator::scan(&self.root, &self.config.version_files)?;
        if files.is_empty() {
            return Err(ReleaseError::NoVersionFiles(self.root.clone()));
        }

        let resolution = match planner::current_version(&files) {
            Ok(_) => None,
            Err(ReleaseError::InconsistentVersions(versions)) => {
                match self.resolver.resolve_inconsistency(&versions)? {
                    Some(resolved) => Some(resolved),
                    None => return Err(ReleaseError::InconsistentVersions(versions)),
                }
            }
            Err(e) => return Err(e),
        };

        let bump = match &request.bump {
            Some(bump) => bump.clone(),
            None => {
                let current = resolution.as_deref().unwrap_or(&files[0].version);
                self.resolver.choose_bump(current, &files)?
            }
        };

        let versions = planner::plan(&files, &bump, resolution.as_deref())?;
        let commands = detect_commands(&self.root).with_overrides(&self.config.commands);

        let plan = ReleasePlan {
            current: versions.current,
            target: versions.target,
            files,
            changelog: self.root.join(&self.config.changelog),
            commands,
            branch,
            dirty,
            tag: self.config.tag_pattern()?.format(&versions.target),
            commit_message: self.config.commit_pattern()?.format(&versions.target),
            tag_message: self.config.tag_message_pattern()?.format(&versions.target),
            remote: self.config.remote.clone(),
        };

        info!(current = %plan.current, target = %plan.target, files = plan.files.len(), "release planned");
        Ok(plan)
    }

    fn patch(&mut self, plan: &ReleasePlan) -> Result<()> {
        let target = plan.target.to_string();
        for file in &plan.files {
            self.patches.apply(file, &target)?;
        }
        Ok(())
    }

    fn release_date(&self) -> String {
        self.release_date
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string())
    }

    fn update_changelog(&mut self, plan: &ReleasePlan) -> Result<()> {
        let path = plan.changelog.as_path();

        let mut changelog = match Changelog::load(path) {
            Ok(changelog) => changelog,
            Err(e) if e.is_soft() => return self.skip_changelog(path, e),
            Err(e) => return Err(e),
        };
        if changelog.unreleased().is_none() {
            return self.skip_changelog(path, ReleaseError::MissingUnreleasedSection);
        }

        let version = plan.target.to_string();
        let date = self.release_date();

        match changelog.release(&version, &date) {
            Ok(()) => {}
            Err(ReleaseError::EmptyRelease) => {
                let entries = self
                    .resolver
                    .supply_changelog_entries(&plan.target)?
                    .ok_or(ReleaseError::EmptyRelease)?;
                for (subsection, lines) in &entries {
                    changelog.add_unreleased_entries(subsection, lines)?;
                }
                changelog.release(&version, &date)?;
            }
            Err(e) => return Err(e),
        }

        if !changelog.update_compare_links(&version, &plan.tag) && !changelog.links.is_empty() {
            self.warnings.push(BoundaryWarning::CompareLinksUnchanged {
                path: path.to_path_buf(),
            });
        }

        changelog.save(path)?;
        self.changelog_written = Some(path.to_path_buf());
        Ok(())
    }

    fn skip_changelog(&mut self, path: &Path, reason: ReleaseError) -> Result<()> {
        if !self.resolver.skip_changelog(path, &reason)? {
            return Err(reason);
        }
        warn!(path = %path.display(), %reason, "skipping changelog update");
        self.warnings.push(BoundaryWarning::ChangelogSkipped {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        });
        Ok(())
    }

    fn test_and_build(&mut self, plan: &ReleasePlan) -> Result<()> {
        if plan.commands.is_empty() {
            self.warnings.push(BoundaryWarning::NoTestOrBuildCommands);
            return Ok(());
        }

        for command in plan.commands.test.iter().chain(&plan.commands.build) {
            let code = self.runner.run(command, &self.root)?;
            if code != 0 {
                return Err(ReleaseError::command(
                    command,
                    format!("exited with code {}", code),
                ));
            }
        }
        Ok(())
    }

    fn commit(&mut self, plan: &ReleasePlan) -> Result<()> {
        let mut paths = self.patches.patched_files();
        paths.extend(self.changelog_written.iter().cloned());

        self.vcs.add(&paths)?;
        self.vcs.commit(&plan.commit_message)
    }

    fn push(&mut self, request: &ReleaseRequest, plan: &ReleasePlan) -> Result<()> {
        if !request.push || !self.config.behavior.push {
            self.warnings.push(BoundaryWarning::PushSkipped {
                tag: plan.tag.clone(),
                remote: plan.remote.clone(),
            });
            return Ok(());
        }

        // Branch first, then tag
        let refs = [
            format!("refs/heads/{}", plan.branch),
            format!("refs/tags/{}", plan.tag),
        ];
        for refname in refs {
            self.vcs.push(&plan.remote, &refname)?;
            info!(remote = %plan.remote, %refname, "pushed");
            self.pushed_refs.push(refname);
        }
        self.tag_pushed = true;
        Ok(())
    }

    fn modified_files(&self) -> Vec<PathBuf> {
        let mut files = self.patches.patched_files();
        files.extend(self.changelog_written.iter().cloned());
        files
    }

    fn abort(mut self, error: ReleaseError) -> ReleaseFailure {
        let stage = self.stage;
        let mut modified_files = self.modified_files();
        let mut reverted = false;

        if stage == Stage::Patch
            && self.config.behavior.on_patch_failure == PatchFailurePolicy::Revert
            && !self.patches.is_empty()
        {
            match self.patches.revert() {
                Ok(restored) => {
                    info!(files = restored.len(), "reverted patched files");
                    modified_files = restored;
                    reverted = true;
                }
                Err(e) => warn!(error = %e, "could not revert patched files"),
            }
        }

        warn!(%stage, last_completed = %self.last_completed, error = %error, "release aborted");
        self.stage = Stage::Aborted;

        ReleaseFailure {
            stage,
            last_completed: self.last_completed,
            error,
            modified_files,
            reverted,
            pushed_refs: self.pushed_refs,
            warnings: self.warnings,
        }
    }

    fn summary(&self, plan: &ReleasePlan, dry_run: bool) -> ReleaseSummary {
        ReleaseSummary {
            version: plan.target.to_string(),
            tag: plan.tag.clone(),
            remote: plan.remote.clone(),
            stage: self.stage,
            dry_run,
            patched_files: self.patches.patched_files(),
            changelog_updated: self.changelog_written.is_some(),
            tag_created: self.tag_created,
            tag_pushed: self.tag_pushed,
            warnings: self.warnings.clone(),
            plan: dry_run.then(|| plan.clone()),
        }
    }
}
