use crate::error::{ReleaseError, Result};
use crate::git::{TreeStatus, VersionControl};
use git2::{ObjectType, Repository as Git2Repo, StatusOptions};
use std::path::{Path, PathBuf};

/// Wrapper around git2::Repository implementing [VersionControl]
pub struct Git2Repository {
    repo: Git2Repo,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;

        Ok(Git2Repository { repo })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository { repo }
    }

    /// Path of `path` relative to the working directory, as the index expects
    fn index_path(&self, path: &Path) -> Result<PathBuf> {
        let workdir = self
            .repo
            .workdir()
            .ok_or_else(|| ReleaseError::command("git add", "repository has no working directory"))?;

        let workdir = workdir.canonicalize()?;
        let absolute = path.canonicalize()?;

        absolute
            .strip_prefix(&workdir)
            .map(Path::to_path_buf)
            .map_err(|_| {
                ReleaseError::command(
                    "git add",
                    format!("{} is outside the repository", path.display()),
                )
            })
    }
}

/// Credentials callback: SSH keys from ~/.ssh, then the SSH agent, then the
/// configured credential helper.
fn credentials(
    config: &git2::Config,
    url: &str,
    username_from_url: Option<&str>,
    allowed_types: git2::CredentialType,
) -> std::result::Result<git2::Cred, git2::Error> {
    let username = username_from_url.unwrap_or("git");

    if allowed_types.contains(git2::CredentialType::SSH_KEY) {
        if let Some(home) = dirs::home_dir() {
            for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                let path = home.join(".ssh").join(key);
                if path.exists() {
                    if let Ok(cred) = git2::Cred::ssh_key(username, None, &path, None) {
                        return Ok(cred);
                    }
                }
            }
        }

        if let Ok(cred) = git2::Cred::ssh_key_from_agent(username) {
            return Ok(cred);
        }
    }

    if allowed_types.contains(git2::CredentialType::USER_PASS_PLAINTEXT) {
        if let Ok(cred) = git2::Cred::credential_helper(config, url, username_from_url) {
            return Ok(cred);
        }
    }

    git2::Cred::default()
}

impl VersionControl for Git2Repository {
    fn status(&self) -> Result<TreeStatus> {
        let mut options = StatusOptions::new();
        options.include_untracked(false).include_ignored(false);

        let statuses = self.repo.statuses(Some(&mut options))?;
        if statuses.is_empty() {
            Ok(TreeStatus::Clean)
        } else {
            Ok(TreeStatus::Dirty)
        }
    }

    fn current_branch(&self) -> Result<String> {
        let head = self.repo.head()?;

        if !head.is_branch() {
            return Err(ReleaseError::command(
                "git symbolic-ref HEAD",
                "HEAD is detached",
            ));
        }

        head.shorthand()
            .map(str::to_string)
            .ok_or_else(|| ReleaseError::command("git symbolic-ref HEAD", "branch name is not UTF-8"))
    }

    fn add(&self, paths: &[PathBuf]) -> Result<()> {
        let mut index = self.repo.index()?;

        for path in paths {
            index.add_path(&self.index_path(path)?)?;
        }

        index.write()?;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<()> {
        let mut index = self.repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;
        let signature = self.repo.signature()?;
        let parent = self.repo.head()?.peel_to_commit()?;

        self.repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &[&parent])?;
        Ok(())
    }

    fn tag(&self, name: &str, message: &str) -> Result<()> {
        let target = self.repo.head()?.peel(ObjectType::Commit)?;
        let signature = self.repo.signature()?;

        self.repo
            .tag(name, &target, &signature, message, false)
            .map_err(|e| ReleaseError::command(format!("git tag -a {}", name), e.message()))?;
        Ok(())
    }

    fn push(&self, remote: &str, refname: &str) -> Result<()> {
        let command = format!("git push {} {}", remote, refname);
        let mut git_remote = self
            .repo
            .find_remote(remote)
            .map_err(|_| ReleaseError::command(&command, format!("no remote named '{}'", remote)))?;

        let config = self.repo.config()?;
        let mut callbacks = git2::RemoteCallbacks::new();
        callbacks.credentials(|url, username, allowed| credentials(&config, url, username, allowed));

        // The server may reject a ref without failing the push call itself.
        callbacks.push_update_reference(|refname, status| match status {
            Some(status) => Err(git2::Error::from_str(&format!(
                "{} rejected: {}",
                refname, status
            ))),
            None => Ok(()),
        });

        let mut push_options = git2::PushOptions::new();
        push_options.remote_callbacks(callbacks);

        let refspec = format!("{0}:{0}", refname);
        git_remote
            .push(&[refspec.as_str()], Some(&mut push_options))
            .map_err(|e| {
                let reason = if e.class() == git2::ErrorClass::Net {
                    format!("network error: {}", e.message())
                } else {
                    e.message().to_string()
                };
                ReleaseError::command(&command, reason)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::RepositoryInitOptions;
    use std::fs;
    use tempfile::TempDir;

    fn init_repo() -> (TempDir, Git2Repository) {
        let dir = TempDir::new().unwrap();
        let mut options = RepositoryInitOptions::new();
        options.initial_head("main");
        let repo = Git2Repo::init_opts(dir.path(), &options).unwrap();
        {
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "Test User").unwrap();
            config.set_str("user.email", "test@example.com").unwrap();
        }

        fs::write(dir.path().join("version.txt"), "1.0.0\n").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("version.txt")).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let signature = repo.signature().unwrap();
        repo.commit(Some("HEAD"), &signature, &signature, "init", &tree, &[])
            .unwrap();
        drop(tree);

        (dir, Git2Repository::from_git2(repo))
    }

    #[test]
    fn test_status_and_branch() {
        let (dir, repo) = init_repo();
        assert_eq!(repo.status().unwrap(), TreeStatus::Clean);
        assert_eq!(repo.current_branch().unwrap(), "main");

        fs::write(dir.path().join("version.txt"), "1.0.1\n").unwrap();
        assert_eq!(repo.status().unwrap(), TreeStatus::Dirty);
    }

    #[test]
    fn test_untracked_files_keep_tree_clean() {
        let (dir, repo) = init_repo();
        fs::write(dir.path().join("notes.txt"), "scratch").unwrap();
        assert_eq!(repo.status().unwrap(), TreeStatus::Clean);
    }

    #[test]
    fn test_add_commit_and_annotated_tag() {
        let (dir, repo) = init_repo();
        let path = dir.path().join("version.txt");
        fs::write(&path, "1.0.1\n").unwrap();

        repo.add(&[path]).unwrap();
        repo.commit("release: v1.0.1").unwrap();
        repo.tag("v1.0.1", "Release v1.0.1").unwrap();

        assert_eq!(repo.status().unwrap(), TreeStatus::Clean);
        let head = repo.repo.head().unwrap().peel_to_commit().unwrap();
        assert_eq!(head.message(), Some("release: v1.0.1"));

        let tag_ref = repo.repo.find_reference("refs/tags/v1.0.1").unwrap();
        let tag = tag_ref.peel_to_tag().unwrap();
        assert_eq!(tag.message(), Some("Release v1.0.1"));
        assert_eq!(tag.target_id(), head.id());
    }

    #[test]
    fn test_push_to_missing_remote_fails() {
        let (_dir, repo) = init_repo();
        let err = repo.push("origin", "refs/heads/main").unwrap_err();
        assert!(matches!(err, ReleaseError::ExternalCommandFailure { .. }));
    }
}
