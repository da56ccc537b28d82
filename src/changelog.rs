//! Keep-a-Changelog document model and the release rewrite.
//!
//! A changelog is parsed into a preamble, `## ` sections holding `### `
//! subsections of entry lines, and a trailing block of link-reference
//! definitions. Rendering normalizes blank lines around headings but keeps
//! every heading label, entry line and their order verbatim.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ReleaseError, Result};
use crate::patcher::write_atomic;

/// Subsection names used by Keep a Changelog, in conventional order
pub const STANDARD_SUBSECTIONS: &[&str] = &[
    "Added",
    "Changed",
    "Deprecated",
    "Removed",
    "Fixed",
    "Security",
];

fn unreleased_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\[?\s*unreleased\s*\]?$").expect("valid regex"))
}

fn release_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\[?v?(\d+\.\d+\.\d+[0-9A-Za-z.+-]*)\]?(?:\s+-\s+.*)?$").expect("valid regex")
    })
}

fn link_definition_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\[[^\]]+\]:\s*\S").expect("valid regex"))
}

fn unreleased_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\[unreleased\]:\s*(\S+)/compare/(\S+?)\.\.\.HEAD\s*$").expect("valid regex")
    })
}

fn is_entry_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !(trimmed.starts_with("<!--") && trimmed.ends_with("-->"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionKind {
    Unreleased,
    Release { version: String },
    /// Any other `## ` heading, kept verbatim
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subsection {
    pub name: String,
    pub entries: Vec<String>,
}

impl Subsection {
    /// Whether any line is a real entry. Blank lines and HTML comments
    /// (template placeholders) are not entries.
    pub fn has_entries(&self) -> bool {
        self.entries.iter().any(|line| is_entry_line(line))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Heading text after `## `
    pub label: String,
    pub kind: SectionKind,
    /// Lines between the heading and the first subsection
    pub intro: Vec<String>,
    pub subsections: Vec<Subsection>,
}

impl Section {
    fn unreleased() -> Self {
        Section {
            label: "[Unreleased]".to_string(),
            kind: SectionKind::Unreleased,
            intro: Vec::new(),
            subsections: Vec::new(),
        }
    }

    fn from_label(label: &str) -> Self {
        let label = label.trim().to_string();
        let kind = if unreleased_re().is_match(&label) {
            SectionKind::Unreleased
        } else if let Some(caps) = release_re().captures(&label) {
            SectionKind::Release {
                version: caps[1].to_string(),
            }
        } else {
            SectionKind::Other
        };

        Section {
            label,
            kind,
            intro: Vec::new(),
            subsections: Vec::new(),
        }
    }

    /// Whether no subsection holds an entry. Intro text is kept on release
    /// but never counts as an entry.
    pub fn is_empty(&self) -> bool {
        !self.subsections.iter().any(Subsection::has_entries)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Changelog {
    pub preamble: Vec<String>,
    pub sections: Vec<Section>,
    /// Trailing link-reference definitions (`[1.0.0]: https://...`)
    pub links: Vec<String>,
}

fn trim_blank_lines(lines: &mut Vec<String>) {
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    let leading = lines.iter().take_while(|l| l.trim().is_empty()).count();
    lines.drain(..leading);
}

impl Changelog {
    /// Parse a changelog document.
    ///
    /// Fails with `MalformedChangelog` when more than one Unreleased section
    /// exists or when it is not the first section.
    pub fn parse(content: &str) -> Result<Self> {
        let mut lines: Vec<&str> = content.lines().collect();

        let mut footer_start = lines.len();
        for (index, line) in lines.iter().enumerate().rev() {
            if line.trim().is_empty() {
                continue;
            }
            if link_definition_re().is_match(line) {
                footer_start = index;
            } else {
                break;
            }
        }
        let mut links: Vec<String> = lines.split_off(footer_start).into_iter().map(String::from).collect();
        trim_blank_lines(&mut links);

        let mut changelog = Changelog {
            links,
            ..Default::default()
        };
        let mut in_fence = false;

        for line in lines {
            let trimmed = line.trim_start();
            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                in_fence = !in_fence;
            }

            if !in_fence {
                if let Some(label) = line.strip_prefix("## ") {
                    changelog.sections.push(Section::from_label(label));
                    continue;
                }
                if let Some(name) = line.strip_prefix("### ") {
                    if let Some(section) = changelog.sections.last_mut() {
                        section.subsections.push(Subsection {
                            name: name.trim().to_string(),
                            entries: Vec::new(),
                        });
                        continue;
                    }
                }
            }

            match changelog.sections.last_mut() {
                None => changelog.preamble.push(line.to_string()),
                Some(section) => match section.subsections.last_mut() {
                    Some(subsection) => subsection.entries.push(line.to_string()),
                    None => section.intro.push(line.to_string()),
                },
            }
        }

        trim_blank_lines(&mut changelog.preamble);
        for section in &mut changelog.sections {
            trim_blank_lines(&mut section.intro);
            for subsection in &mut section.subsections {
                trim_blank_lines(&mut subsection.entries);
            }
        }

        changelog.validate()?;
        Ok(changelog)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ReleaseError::NotFound(path.to_path_buf()));
        }
        Self::parse(&fs::read_to_string(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_atomic(path, &self.to_string())
    }

    fn validate(&self) -> Result<()> {
        let positions: Vec<usize> = self
            .sections
            .iter()
            .enumerate()
            .filter(|(_, s)| s.kind == SectionKind::Unreleased)
            .map(|(i, _)| i)
            .collect();

        match positions.as_slice() {
            [] | [0] => Ok(()),
            [_] => Err(ReleaseError::MalformedChangelog(
                "[Unreleased] must be the first section".to_string(),
            )),
            _ => Err(ReleaseError::MalformedChangelog(
                "more than one [Unreleased] section".to_string(),
            )),
        }
    }

    pub fn unreleased(&self) -> Option<&Section> {
        self.sections
            .first()
            .filter(|s| s.kind == SectionKind::Unreleased)
    }

    fn unreleased_mut(&mut self) -> Result<&mut Section> {
        self.sections
            .first_mut()
            .filter(|s| s.kind == SectionKind::Unreleased)
            .ok_or(ReleaseError::MissingUnreleasedSection)
    }

    /// Released versions, newest first
    pub fn released_versions(&self) -> Vec<&str> {
        self.sections
            .iter()
            .filter_map(|s| match &s.kind {
                SectionKind::Release { version } => Some(version.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Turn the Unreleased section into `[version] - date` and open a new,
    /// empty Unreleased section above it.
    pub fn release(&mut self, version: &str, date: &str) -> Result<()> {
        if self.released_versions().contains(&version) {
            return Err(ReleaseError::MalformedChangelog(format!(
                "a section for {} already exists",
                version
            )));
        }

        let section = self.unreleased_mut()?;
        if section.is_empty() {
            return Err(ReleaseError::EmptyRelease);
        }

        section.label = format!("[{}] - {}", version, date);
        section.kind = SectionKind::Release {
            version: version.to_string(),
        };
        self.sections.insert(0, Section::unreleased());
        Ok(())
    }

    /// Append entries to an Unreleased subsection, creating it if needed.
    ///
    /// Entries without a list marker get `- ` prepended.
    pub fn add_unreleased_entries(&mut self, subsection: &str, entries: &[String]) -> Result<()> {
        let section = self.unreleased_mut()?;

        let index = match section
            .subsections
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(subsection))
        {
            Some(index) => index,
            None => {
                section.subsections.push(Subsection {
                    name: subsection.to_string(),
                    entries: Vec::new(),
                });
                section.subsections.len() - 1
            }
        };

        let target = &mut section.subsections[index];
        for entry in entries.iter().map(|e| e.trim()).filter(|e| !e.is_empty()) {
            if entry.starts_with("- ") || entry.starts_with("* ") {
                target.entries.push(entry.to_string());
            } else {
                target.entries.push(format!("- {}", entry));
            }
        }
        Ok(())
    }

    /// Move the `[Unreleased]: <base>/compare/<prev>...HEAD` link forward to
    /// `tag` and add a link for the new version. Returns false when the
    /// footer has no such link.
    pub fn update_compare_links(&mut self, version: &str, tag: &str) -> bool {
        let Some((index, base, previous)) = self.links.iter().enumerate().find_map(|(i, line)| {
            unreleased_link_re()
                .captures(line)
                .map(|caps| (i, caps[1].to_string(), caps[2].to_string()))
        }) else {
            return false;
        };

        self.links[index] = format!("[Unreleased]: {}/compare/{}...HEAD", base, tag);
        self.links.insert(
            index + 1,
            format!("[{}]: {}/compare/{}...{}", version, base, previous, tag),
        );
        true
    }
}

impl fmt::Display for Changelog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut blocks: Vec<String> = Vec::new();

        if !self.preamble.is_empty() {
            blocks.push(self.preamble.join("\n"));
        }

        for section in &self.sections {
            blocks.push(format!("## {}", section.label));
            if !section.intro.is_empty() {
                blocks.push(section.intro.join("\n"));
            }
            for subsection in &section.subsections {
                let mut block = format!("### {}", subsection.name);
                for entry in &subsection.entries {
                    block.push('\n');
                    block.push_str(entry);
                }
                blocks.push(block);
            }
        }

        if !self.links.is_empty() {
            blocks.push(self.links.join("\n"));
        }

        writeln!(f, "{}", blocks.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# Changelog

All notable changes to this project will be documented in this file.

## [Unreleased]

### Added
- New export command
- Support for `--json`

### Fixed
- Crash on empty input

## [1.0.0] - 2024-01-01

### Added
- Initial release

[Unreleased]: https://example.com/repo/compare/v1.0.0...HEAD
[1.0.0]: https://example.com/repo/releases/tag/v1.0.0
";

    #[test]
    fn test_parse_structure() {
        let changelog = Changelog::parse(SAMPLE).unwrap();
        assert_eq!(changelog.preamble[0], "# Changelog");
        assert_eq!(changelog.sections.len(), 2);
        assert_eq!(changelog.sections[0].kind, SectionKind::Unreleased);
        assert_eq!(changelog.released_versions(), vec!["1.0.0"]);

        let unreleased = changelog.unreleased().unwrap();
        assert_eq!(unreleased.subsections[0].name, "Added");
        assert_eq!(
            unreleased.subsections[0].entries,
            vec!["- New export command", "- Support for `--json`"]
        );
        assert_eq!(unreleased.subsections[1].name, "Fixed");
        assert_eq!(changelog.links.len(), 2);
    }

    #[test]
    fn test_release_minimal_document() {
        let mut changelog = Changelog::parse("## [Unreleased]\n### Added\n- x\n").unwrap();
        changelog.release("1.2.3", "2024-01-01").unwrap();

        let rendered = changelog.to_string();
        let unreleased = rendered.find("## [Unreleased]").unwrap();
        let released = rendered.find("## [1.2.3] - 2024-01-01").unwrap();
        let entries = rendered.find("### Added\n- x").unwrap();
        assert!(unreleased < released && released < entries);

        assert!(changelog.sections[0].is_empty());
        assert!(changelog.sections[0].subsections.is_empty());
    }

    #[test]
    fn test_release_preserves_other_sections() {
        let mut changelog = Changelog::parse(SAMPLE).unwrap();
        let before = changelog.sections.clone();
        changelog.release("1.1.0", "2024-03-05").unwrap();

        assert_eq!(changelog.sections.len(), 3);
        assert_eq!(changelog.sections[1].label, "[1.1.0] - 2024-03-05");
        assert_eq!(changelog.sections[1].subsections, before[0].subsections);
        assert_eq!(changelog.sections[2], before[1]);
        assert_eq!(changelog.released_versions(), vec!["1.1.0", "1.0.0"]);
    }

    #[test]
    fn test_empty_unreleased_is_empty_release() {
        let mut changelog =
            Changelog::parse("## [Unreleased]\n\n### Added\n\n## [1.0.0] - 2024-01-01\n- a\n").unwrap();
        let err = changelog.release("1.0.1", "2024-02-02").unwrap_err();
        assert!(matches!(err, ReleaseError::EmptyRelease));
        assert_eq!(changelog.sections.len(), 2);
    }

    #[test]
    fn test_placeholder_only_unreleased_is_empty_release() {
        let mut changelog = Changelog::parse(
            "## [Unreleased]\n<!-- add entries here -->\n\n## [1.0.0] - 2024-01-01\n### Added\n- a\n",
        )
        .unwrap();
        let err = changelog.release("1.1.0", "2024-02-02").unwrap_err();
        assert!(matches!(err, ReleaseError::EmptyRelease));
        assert_eq!(changelog.released_versions(), vec!["1.0.0"]);

        let mut commented = Changelog::parse("## [Unreleased]\n### Added\n<!-- - entry -->\n").unwrap();
        assert!(matches!(
            commented.release("1.1.0", "2024-02-02"),
            Err(ReleaseError::EmptyRelease)
        ));
    }

    #[test]
    fn test_intro_text_is_kept_on_release() {
        let mut changelog =
            Changelog::parse("## [Unreleased]\nHighlights of this cycle.\n\n### Fixed\n- b\n").unwrap();
        changelog.release("1.0.1", "2024-02-02").unwrap();
        assert_eq!(changelog.sections[1].intro, vec!["Highlights of this cycle."]);
        assert!(changelog.sections[0].intro.is_empty());
    }

    #[test]
    fn test_missing_unreleased_section() {
        let mut changelog = Changelog::parse("# Changelog\n\n## [1.0.0] - 2024-01-01\n").unwrap();
        assert!(changelog.unreleased().is_none());
        let err = changelog.release("1.0.1", "2024-02-02").unwrap_err();
        assert!(matches!(err, ReleaseError::MissingUnreleasedSection));
    }

    #[test]
    fn test_unreleased_must_be_first_and_unique() {
        let misplaced = "## [1.0.0] - 2024-01-01\n- a\n## [Unreleased]\n- b\n";
        assert!(matches!(
            Changelog::parse(misplaced),
            Err(ReleaseError::MalformedChangelog(_))
        ));

        let duplicated = "## [Unreleased]\n- a\n## Unreleased\n- b\n";
        assert!(matches!(
            Changelog::parse(duplicated),
            Err(ReleaseError::MalformedChangelog(_))
        ));
    }

    #[test]
    fn test_release_existing_version_rejected() {
        let mut changelog = Changelog::parse(SAMPLE).unwrap();
        assert!(matches!(
            changelog.release("1.0.0", "2024-05-05"),
            Err(ReleaseError::MalformedChangelog(_))
        ));
    }

    #[test]
    fn test_add_entries_then_release() {
        let mut changelog = Changelog::parse("## [Unreleased]\n").unwrap();
        changelog
            .add_unreleased_entries("Fixed", &["Handle empty files".to_string(), "- already listed".to_string()])
            .unwrap();
        changelog.release("0.1.1", "2024-06-01").unwrap();

        let released = &changelog.sections[1];
        assert_eq!(released.subsections[0].name, "Fixed");
        assert_eq!(
            released.subsections[0].entries,
            vec!["- Handle empty files", "- already listed"]
        );
    }

    #[test]
    fn test_update_compare_links() {
        let mut changelog = Changelog::parse(SAMPLE).unwrap();
        changelog.release("1.1.0", "2024-03-05").unwrap();
        assert!(changelog.update_compare_links("1.1.0", "v1.1.0"));

        assert_eq!(
            changelog.links,
            vec![
                "[Unreleased]: https://example.com/repo/compare/v1.1.0...HEAD",
                "[1.1.0]: https://example.com/repo/compare/v1.0.0...v1.1.0",
                "[1.0.0]: https://example.com/repo/releases/tag/v1.0.0",
            ]
        );
    }

    #[test]
    fn test_update_compare_links_without_footer() {
        let mut changelog = Changelog::parse("## [Unreleased]\n- a\n").unwrap();
        assert!(!changelog.update_compare_links("0.1.0", "v0.1.0"));
    }

    #[test]
    fn test_render_round_trip_is_stable() {
        let changelog = Changelog::parse(SAMPLE).unwrap();
        let rendered = changelog.to_string();
        assert_eq!(Changelog::parse(&rendered).unwrap(), changelog);
        assert_eq!(rendered, SAMPLE);
    }

    #[test]
    fn test_headings_inside_code_fence_are_entries() {
        let content = "## [Unreleased]\n### Changed\n- Example:\n```\n## not a heading\n```\n";
        let changelog = Changelog::parse(content).unwrap();
        assert_eq!(changelog.sections.len(), 1);
        assert_eq!(changelog.sections[0].subsections[0].entries.len(), 4);
    }
}
