//! Per-format version location strategies.
//!
//! Every strategy returns the byte span of the version *value* inside the
//! file contents. The locator reads the span, the patcher splices a new value
//! into it, so both always agree on where the version lives.

use std::ops::Range;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::domain::FormatKind;
use crate::error::{ReleaseError, Result};

/// A well-known version-bearing file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionSource {
    pub file_name: &'static str,
    pub format: FormatKind,
}

/// Files checked in the project root on every scan, in report order
pub const KNOWN_SOURCES: &[VersionSource] = &[
    VersionSource {
        file_name: "package.json",
        format: FormatKind::Json,
    },
    VersionSource {
        file_name: "manifest.json",
        format: FormatKind::Json,
    },
    VersionSource {
        file_name: "pyproject.toml",
        format: FormatKind::Toml,
    },
    VersionSource {
        file_name: "Cargo.toml",
        format: FormatKind::Toml,
    },
    VersionSource {
        file_name: "version.txt",
        format: FormatKind::PlainText,
    },
];

fn json_version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""version"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("valid regex"))
}

fn toml_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\[([^\[\]]+)\]\s*(?:#.*)?$").expect("valid regex"))
}

fn toml_version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s*version\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
    })
}

fn markdown_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*Current Version:\*\*[ \t]*([^\s*]+)").expect("valid regex"))
}

/// Whether a Markdown document carries the version marker at all
pub fn has_version_marker(content: &str) -> bool {
    content.contains("**Current Version:**")
}

/// Locate the version value span, mapping strategy failures to `Parse` errors
pub fn locate(path: &Path, format: FormatKind, content: &str) -> Result<Range<usize>> {
    let located = match format {
        FormatKind::Json => locate_json(content),
        FormatKind::Toml => locate_toml(path, content),
        FormatKind::Markdown => locate_markdown(content),
        FormatKind::PlainText => locate_plain(content),
    };
    located.map_err(|reason| ReleaseError::parse(path, reason))
}

/// Extract the version string recorded in `content`
pub fn extract(path: &Path, format: FormatKind, content: &str) -> Result<String> {
    let span = locate(path, format, content)?;
    Ok(content[span].to_string())
}

fn locate_json(content: &str) -> std::result::Result<Range<usize>, String> {
    let document: serde_json::Value =
        serde_json::from_str(content).map_err(|e| format!("invalid JSON: {}", e))?;
    let expected = document
        .get("version")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "no top-level \"version\" string".to_string())?;

    for caps in json_version_re().captures_iter(content) {
        let (Some(key), Some(value)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if json_depth_at(content, key.start()) == 1 && value.as_str() == expected {
            return Ok(value.range());
        }
    }

    Err("top-level \"version\" key uses an unsupported encoding".to_string())
}

/// Object/array nesting depth at `offset`, ignoring brackets inside strings
fn json_depth_at(content: &str, offset: usize) -> usize {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for ch in content[..offset].chars() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }

    depth
}

/// Tables that may hold the project version, most specific first
fn toml_candidate_tables(path: &Path) -> &'static [&'static str] {
    match path.file_name().and_then(|n| n.to_str()) {
        Some("Cargo.toml") => &["package", "workspace.package"],
        Some("pyproject.toml") => &["project", "tool.poetry"],
        _ => &["", "package", "project"],
    }
}

fn toml_lookup_version<'a>(document: &'a toml::Table, table: &str) -> Option<&'a str> {
    let mut current = document;
    if !table.is_empty() {
        for segment in table.split('.') {
            current = current.get(segment)?.as_table()?;
        }
    }
    current.get("version")?.as_str()
}

fn normalize_table_name(raw: &str) -> String {
    raw.split('.')
        .map(|segment| segment.trim().trim_matches(|c| c == '"' || c == '\''))
        .collect::<Vec<_>>()
        .join(".")
}

fn locate_toml(path: &Path, content: &str) -> std::result::Result<Range<usize>, String> {
    let document: toml::Table = content
        .parse()
        .map_err(|e| format!("invalid TOML: {}", e))?;

    for table in toml_candidate_tables(path) {
        let Some(expected) = toml_lookup_version(&document, table) else {
            continue;
        };
        if let Some(span) = find_toml_assignment(content, table, expected) {
            return Ok(span);
        }
    }

    Err("no version = \"...\" assignment in a recognized table".to_string())
}

fn find_toml_assignment(content: &str, table: &str, expected: &str) -> Option<Range<usize>> {
    // Root-level assignments live before the first header.
    let mut current: Option<String> = Some(String::new());
    let mut line_start = 0usize;

    for line in content.split_inclusive('\n') {
        let offset = line_start;
        line_start += line.len();

        if line.trim_start().starts_with("[[") {
            current = None;
            continue;
        }
        if let Some(caps) = toml_header_re().captures(line.trim_end_matches(['\r', '\n'])) {
            current = caps.get(1).map(|m| normalize_table_name(m.as_str()));
            continue;
        }
        if current.as_deref() != Some(table) {
            continue;
        }
        if let Some(caps) = toml_version_re().captures(line) {
            if let Some(value) = caps.get(1).or_else(|| caps.get(2)) {
                if value.as_str() == expected {
                    return Some(offset + value.start()..offset + value.end());
                }
            }
        }
    }

    None
}

fn locate_markdown(content: &str) -> std::result::Result<Range<usize>, String> {
    markdown_marker_re()
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.range())
        .ok_or_else(|| "no **Current Version:** marker".to_string())
}

fn locate_plain(content: &str) -> std::result::Result<Range<usize>, String> {
    let value = content.trim();
    if value.is_empty() {
        return Err("file is empty".to_string());
    }
    if value.lines().count() > 1 {
        return Err("expected a single line holding the version".to_string());
    }

    let start = content.len() - content.trim_start().len();
    Ok(start..start + value.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract_str(name: &str, format: FormatKind, content: &str) -> Result<String> {
        extract(Path::new(name), format, content)
    }

    #[test]
    fn test_json_top_level_version() {
        let content = r#"{
  "name": "demo",
  "version": "0.1.0",
  "dependencies": {
    "left-pad": "0.1.0"
  }
}
"#;
        assert_eq!(extract_str("package.json", FormatKind::Json, content).unwrap(), "0.1.0");
    }

    #[test]
    fn test_json_skips_nested_version_keys() {
        let content = r#"{
  "engines": { "version": "1.4.0" },
  "version": "1.4.0"
}"#;
        let span = locate(Path::new("manifest.json"), FormatKind::Json, content).unwrap();
        assert_eq!(&content[span.clone()], "1.4.0");
        assert_eq!(span.start, content.rfind("1.4.0").unwrap());
    }

    #[test]
    fn test_json_without_version_is_parse_error() {
        let err = extract_str("package.json", FormatKind::Json, r#"{"name": "x"}"#).unwrap_err();
        assert!(matches!(err, ReleaseError::Parse { .. }));
    }

    #[test]
    fn test_json_invalid_document() {
        assert!(extract_str("package.json", FormatKind::Json, "{ nope").is_err());
    }

    #[test]
    fn test_cargo_toml_package_version() {
        let content = r#"[package]
name = "demo"
version = "0.3.1"

[dependencies]
serde = { version = "0.3.1" }
"#;
        assert_eq!(extract_str("Cargo.toml", FormatKind::Toml, content).unwrap(), "0.3.1");
    }

    #[test]
    fn test_cargo_toml_workspace_inherited_version() {
        let content = r#"[workspace.package]
version = "2.0.0"

[package]
name = "member"
version.workspace = true
"#;
        assert_eq!(extract_str("Cargo.toml", FormatKind::Toml, content).unwrap(), "2.0.0");
    }

    #[test]
    fn test_pyproject_poetry_table() {
        let content = r#"[tool.poetry]
name = "demo"
version = '1.1.1'
"#;
        assert_eq!(extract_str("pyproject.toml", FormatKind::Toml, content).unwrap(), "1.1.1");
    }

    #[test]
    fn test_toml_ignores_version_in_other_tables() {
        let content = r#"[project]
name = "demo"

[tool.other]
version = "5.5.5"
"#;
        assert!(extract_str("pyproject.toml", FormatKind::Toml, content).is_err());
    }

    #[test]
    fn test_markdown_marker() {
        let content = "# Skill\n\n**Current Version:** 1.0.2\n\nBody text 1.0.2\n";
        assert_eq!(extract_str("SKILL.md", FormatKind::Markdown, content).unwrap(), "1.0.2");
        assert!(has_version_marker(content));
        assert!(!has_version_marker("# Plain readme\n"));
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(extract_str("version.txt", FormatKind::PlainText, "  2.4.6\n").unwrap(), "2.4.6");
        assert!(extract_str("version.txt", FormatKind::PlainText, "\n\n").is_err());
        assert!(extract_str("version.txt", FormatKind::PlainText, "1.0.0\n2.0.0\n").is_err());
    }

    #[test]
    fn test_json_depth_ignores_brackets_in_strings() {
        let content = r#"{"a": "{[", "version": "1.0.0"}"#;
        assert_eq!(extract_str("package.json", FormatKind::Json, content).unwrap(), "1.0.0");
    }
}
