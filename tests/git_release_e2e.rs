// tests/git_release_e2e.rs
//
// Full releases against real git repositories, pushing to a bare remote on
// the local filesystem.
use std::fs;
use std::path::Path;

use git2::{Repository, RepositoryInitOptions};
use git_release::config::Config;
use git_release::domain::{BumpRequest, VersionBump};
use git_release::error::ReleaseError;
use git_release::git::Git2Repository;
use git_release::resolver::StrictResolver;
use git_release::runner::RecordingRunner;
use git_release::sequencer::{ReleaseRequest, Sequencer, Stage};
use tempfile::TempDir;

const CHANGELOG: &str = "# Changelog

## [Unreleased]

### Fixed
- Handle empty input
";

struct Fixture {
    _remote_dir: TempDir,
    work_dir: TempDir,
    remote: Repository,
}

fn commit_all(repo: &Repository, message: &str) {
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let signature = repo.signature().unwrap();
    let parents = match repo.head() {
        Ok(head) => vec![head.peel_to_commit().unwrap()],
        Err(_) => Vec::new(),
    };
    let parents: Vec<&git2::Commit> = parents.iter().collect();
    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
        .unwrap();
}

fn setup() -> Fixture {
    let remote_dir = TempDir::new().unwrap();
    let remote = Repository::init_bare(remote_dir.path()).unwrap();

    let work_dir = TempDir::new().unwrap();
    let mut options = RepositoryInitOptions::new();
    options.initial_head("main");
    let repo = Repository::init_opts(work_dir.path(), &options).unwrap();
    {
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Test User").unwrap();
        config.set_str("user.email", "test@example.com").unwrap();
    }

    fs::write(
        work_dir.path().join("Cargo.toml"),
        "[package]\nname = \"demo\"\nversion = \"0.3.9\"\n\n[dependencies]\nserde = { version = \"0.3.9\" }\n",
    )
    .unwrap();
    fs::write(work_dir.path().join("CHANGELOG.md"), CHANGELOG).unwrap();
    commit_all(&repo, "initial commit");

    let url = remote_dir.path().to_str().unwrap().to_string();
    repo.remote("origin", &url).unwrap();

    Fixture {
        _remote_dir: remote_dir,
        work_dir,
        remote,
    }
}

fn patch_request() -> ReleaseRequest {
    ReleaseRequest {
        bump: Some(BumpRequest::Relative(VersionBump::Patch)),
        ..Default::default()
    }
}

fn run_release(root: &Path, request: &ReleaseRequest) -> Result<Stage, ReleaseError> {
    let config = Config::default();
    let repo = Git2Repository::open(root).unwrap();
    let runner = RecordingRunner::new();
    let mut resolver = StrictResolver;

    Sequencer::new(root, &config, &repo, &runner, &mut resolver)
        .with_release_date("2024-03-01")
        .run(request)
        .map(|summary| summary.stage)
        .map_err(|failure| failure.error)
}

#[test]
fn test_release_commits_tags_and_pushes() {
    let fixture = setup();
    let root = fixture.work_dir.path();

    let stage = run_release(root, &patch_request()).unwrap();
    assert_eq!(stage, Stage::Done);

    let local = Repository::open(root).unwrap();
    let head = local.head().unwrap().peel_to_commit().unwrap();
    assert_eq!(head.message(), Some("release: v0.3.10"));

    // Both patched files are in the release commit and the tree is clean
    let statuses = local.statuses(None).unwrap();
    assert!(statuses.is_empty());
    let cargo = fs::read_to_string(root.join("Cargo.toml")).unwrap();
    assert!(cargo.contains("version = \"0.3.10\"\n\n[dependencies]"));
    assert!(cargo.contains("serde = { version = \"0.3.9\" }"));
    let changelog = fs::read_to_string(root.join("CHANGELOG.md")).unwrap();
    assert!(changelog.contains("## [0.3.10] - 2024-03-01"));

    let tag = local
        .find_reference("refs/tags/v0.3.10")
        .unwrap()
        .peel_to_tag()
        .unwrap();
    assert_eq!(tag.message(), Some("Release v0.3.10"));
    assert_eq!(tag.target_id(), head.id());

    let remote_main = fixture
        .remote
        .find_reference("refs/heads/main")
        .unwrap()
        .peel_to_commit()
        .unwrap();
    assert_eq!(remote_main.id(), head.id());
    let remote_tag = fixture
        .remote
        .find_reference("refs/tags/v0.3.10")
        .unwrap()
        .peel_to_commit()
        .unwrap();
    assert_eq!(remote_tag.id(), head.id());
}

#[test]
fn test_dirty_repository_is_refused() {
    let fixture = setup();
    let root = fixture.work_dir.path();
    fs::write(root.join("CHANGELOG.md"), format!("{}- Uncommitted\n", CHANGELOG)).unwrap();

    let error = run_release(root, &patch_request()).unwrap_err();
    assert!(matches!(error, ReleaseError::DirtyWorkingTree));

    let cargo = fs::read_to_string(root.join("Cargo.toml")).unwrap();
    assert!(cargo.contains("version = \"0.3.9\"\n"));
}

#[test]
fn test_existing_tag_aborts_after_commit() {
    let fixture = setup();
    let root = fixture.work_dir.path();
    {
        let local = Repository::open(root).unwrap();
        let head = local.head().unwrap().peel(git2::ObjectType::Commit).unwrap();
        let signature = local.signature().unwrap();
        local
            .tag("v0.3.10", &head, &signature, "stale tag", false)
            .unwrap();
    }

    let error = run_release(root, &patch_request()).unwrap_err();
    assert!(matches!(error, ReleaseError::ExternalCommandFailure { .. }));
    assert!(fixture.remote.find_reference("refs/tags/v0.3.10").is_err());
}

#[test]
fn test_local_only_release() {
    let fixture = setup();
    let root = fixture.work_dir.path();

    let request = ReleaseRequest {
        push: false,
        ..patch_request()
    };
    let stage = run_release(root, &request).unwrap();
    assert_eq!(stage, Stage::Done);

    let local = Repository::open(root).unwrap();
    assert!(local.find_reference("refs/tags/v0.3.10").is_ok());
    assert!(fixture.remote.find_reference("refs/heads/main").is_err());
}
