use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// How a version is recorded inside a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    /// Top-level `"version"` key of a JSON document
    Json,
    /// `version = "X.Y.Z"` assignment inside a TOML table
    Toml,
    /// `**Current Version:** X.Y.Z` marker line
    Markdown,
    /// Single-line file holding only the version
    PlainText,
}

impl FormatKind {
    /// Infer the format from a file name or extension
    pub fn infer(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => FormatKind::Json,
            Some(ext) if ext.eq_ignore_ascii_case("toml") => FormatKind::Toml,
            Some(ext) if ext.eq_ignore_ascii_case("md") => FormatKind::Markdown,
            _ => FormatKind::PlainText,
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormatKind::Json => "json",
            FormatKind::Toml => "toml",
            FormatKind::Markdown => "markdown",
            FormatKind::PlainText => "text",
        };
        write!(f, "{}", name)
    }
}

/// A discovered version-bearing file and the version it recorded at scan time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionFile {
    pub path: PathBuf,
    pub format: FormatKind,
    pub version: String,
}

impl VersionFile {
    pub fn new(path: impl Into<PathBuf>, format: FormatKind, version: impl Into<String>) -> Self {
        VersionFile {
            path: path.into(),
            format,
            version: version.into(),
        }
    }

    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }
}
