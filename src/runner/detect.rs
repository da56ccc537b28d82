use crate::config::CommandsConfig;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Test and build command lines for a project, run in order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectCommands {
    pub test: Vec<String>,
    pub build: Vec<String>,
}

impl ProjectCommands {
    pub fn is_empty(&self) -> bool {
        self.test.is_empty() && self.build.is_empty()
    }

    /// Configured commands replace detected ones, per kind
    pub fn with_overrides(mut self, config: &CommandsConfig) -> Self {
        if let Some(test) = &config.test {
            self.test = test.clone();
        }
        if let Some(build) = &config.build {
            self.build = build.clone();
        }
        self
    }
}

fn npm_script_defined(root: &Path, script: &str) -> bool {
    fs::read_to_string(root.join("package.json"))
        .ok()
        .and_then(|content| serde_json::from_str::<serde_json::Value>(&content).ok())
        .and_then(|package| package.get("scripts")?.get(script).cloned())
        .is_some()
}

/// Select test and build commands from the project descriptors in `root`.
///
/// Several descriptors may be present (e.g. a Rust crate with a JS frontend);
/// their commands are concatenated in detection order.
pub fn detect_commands(root: &Path) -> ProjectCommands {
    let mut commands = ProjectCommands::default();

    if root.join("package.json").is_file() {
        if npm_script_defined(root, "test") {
            commands.test.push("npm test".to_string());
        }
        if npm_script_defined(root, "build") {
            commands.build.push("npm run build".to_string());
        }
    }

    if root.join("Cargo.toml").is_file() {
        commands.test.push("cargo test".to_string());
        commands.build.push("cargo build --release".to_string());
    }

    if root.join("pyproject.toml").is_file() {
        commands.test.push("python -m pytest".to_string());
        commands.build.push("python -m build".to_string());
    }

    if root.join("go.mod").is_file() {
        commands.test.push("go test ./...".to_string());
        commands.build.push("go build ./...".to_string());
    }

    commands
}
