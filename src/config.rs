use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::TagPattern;
use crate::error::{ReleaseError, Result};

/// Project-local configuration file name
pub const CONFIG_FILE_NAME: &str = "gitrelease.toml";

/// Represents the complete configuration for git-release.
///
/// Contains naming patterns for tags and commits, version file and changelog
/// locations, test/build command overrides and behavior options.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default = "default_tag_pattern")]
    pub tag_pattern: String,

    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    #[serde(default = "default_tag_message")]
    pub tag_message: String,

    #[serde(default = "default_changelog")]
    pub changelog: PathBuf,

    /// Version files beyond the well-known ones, relative to the project root
    #[serde(default)]
    pub version_files: Vec<PathBuf>,

    #[serde(default)]
    pub commands: CommandsConfig,

    #[serde(default)]
    pub behavior: BehaviorConfig,
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_tag_pattern() -> String {
    "v{version}".to_string()
}

fn default_commit_message() -> String {
    "release: v{version}".to_string()
}

fn default_tag_message() -> String {
    "Release v{version}".to_string()
}

fn default_changelog() -> PathBuf {
    PathBuf::from("CHANGELOG.md")
}

fn default_true() -> bool {
    true
}

/// Overrides for the detected test and build commands.
///
/// `None` keeps detection; an empty list disables that kind of command.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct CommandsConfig {
    #[serde(default)]
    pub test: Option<Vec<String>>,

    #[serde(default)]
    pub build: Option<Vec<String>>,

    /// Per-command timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl CommandsConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// What to do with already patched files when a later file fails to patch
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PatchFailurePolicy {
    /// Leave mutations in place and report them
    #[default]
    Keep,
    /// Restore the original contents of every patched file
    Revert,
}

/// Configuration for behavior customization.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BehaviorConfig {
    #[serde(default)]
    pub allow_dirty: bool,

    #[serde(default = "default_true")]
    pub push: bool,

    #[serde(default)]
    pub on_patch_failure: PatchFailurePolicy,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        BehaviorConfig {
            allow_dirty: false,
            push: true,
            on_patch_failure: PatchFailurePolicy::Keep,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            remote: default_remote(),
            tag_pattern: default_tag_pattern(),
            commit_message: default_commit_message(),
            tag_message: default_tag_message(),
            changelog: default_changelog(),
            version_files: Vec::new(),
            commands: CommandsConfig::default(),
            behavior: BehaviorConfig::default(),
        }
    }
}

impl Config {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| ReleaseError::config(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every naming pattern carries a `{version}` placeholder
    pub fn validate(&self) -> Result<()> {
        self.tag_pattern()?;
        self.commit_pattern()?;
        self.tag_message_pattern()?;
        if self.remote.trim().is_empty() {
            return Err(ReleaseError::config("remote must not be empty"));
        }
        Ok(())
    }

    pub fn tag_pattern(&self) -> Result<TagPattern> {
        TagPattern::new(self.tag_pattern.as_str())
    }

    pub fn commit_pattern(&self) -> Result<TagPattern> {
        TagPattern::new(self.commit_message.as_str())
    }

    pub fn tag_message_pattern(&self) -> Result<TagPattern> {
        TagPattern::new(self.tag_message.as_str())
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `gitrelease.toml` in the project root
/// 3. `.gitrelease.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If a file exists but cannot be read, parsed or validated
pub fn load_config(config_path: Option<&Path>, root: &Path) -> Result<Config> {
    let candidate = if let Some(path) = config_path {
        Some(path.to_path_buf())
    } else if root.join(CONFIG_FILE_NAME).is_file() {
        Some(root.join(CONFIG_FILE_NAME))
    } else {
        dirs::config_dir()
            .map(|dir| dir.join(format!(".{}", CONFIG_FILE_NAME)))
            .filter(|path| path.is_file())
    };

    match candidate {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading configuration");
            let content = fs::read_to_string(&path).map_err(|e| {
                ReleaseError::config(format!("cannot read {}: {}", path.display(), e))
            })?;
            Config::from_toml(&content)
        }
        None => Ok(Config::default()),
    }
}
