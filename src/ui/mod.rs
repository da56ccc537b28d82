//! User interface module - interaction (prompts) and formatting.
//!
//! Separates concerns:
//! - `formatter` - Pure formatting functions
//! - This module - Interactive prompts and the terminal [Resolver]

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use console::style;

use crate::changelog::STANDARD_SUBSECTIONS;
use crate::domain::{BumpRequest, Version, VersionBump, VersionFile};
use crate::error::{ReleaseError, Result};
use crate::resolver::{ChangelogEntries, Resolver};
use crate::sequencer::ReleasePlan;

pub mod formatter;

// Re-export formatter functions for convenience
pub use formatter::{
    display_boundary_warning, display_error, display_failure, display_manual_push_instruction,
    display_plan, display_status, display_success, display_summary, display_version_files,
};

const DEFAULT_SUBSECTION: &str = "Changed";

/// Interprets the answer to the bump prompt.
///
/// `1`-`3` pick patch, minor or major; Enter defaults to patch. Anything
/// else is read as a bump keyword or an explicit target version.
pub fn parse_bump_choice(input: &str) -> Result<BumpRequest> {
    match input.trim() {
        "" | "1" => Ok(BumpRequest::Relative(VersionBump::Patch)),
        "2" => Ok(BumpRequest::Relative(VersionBump::Minor)),
        "3" => Ok(BumpRequest::Relative(VersionBump::Major)),
        other => other.parse(),
    }
}

/// Interprets a yes/no answer. Enter means no.
pub fn parse_confirmation(input: &str) -> bool {
    let response = input.trim().to_lowercase();
    response == "y" || response == "yes"
}

/// Canonical spelling of a standard subsection name; other names pass through.
/// An empty answer selects `Changed`.
pub fn normalize_subsection(input: &str) -> String {
    let name = input.trim();
    if name.is_empty() {
        return DEFAULT_SUBSECTION.to_string();
    }
    STANDARD_SUBSECTIONS
        .iter()
        .find(|standard| standard.eq_ignore_ascii_case(name))
        .map_or_else(|| name.to_string(), |standard| standard.to_string())
}

/// Distinct versions in first-seen order
fn distinct_versions(versions: &[(PathBuf, String)]) -> Vec<String> {
    let mut distinct: Vec<String> = Vec::new();
    for (_, version) in versions {
        if !distinct.contains(version) {
            distinct.push(version.clone());
        }
    }
    distinct
}

/// Resolver that asks the operator on the terminal.
///
/// Answers are read line by line from `input`, which is stdin outside of
/// tests.
pub struct PromptResolver {
    root: PathBuf,
    input: Box<dyn BufRead>,
}

impl PromptResolver {
    pub fn stdin(root: impl Into<PathBuf>) -> Self {
        Self::with_input(root, Box::new(io::BufReader::new(io::stdin())))
    }

    pub fn with_input(root: impl Into<PathBuf>, input: Box<dyn BufRead>) -> Self {
        PromptResolver {
            root: root.into(),
            input,
        }
    }

    /// Print `prompt` and read one trimmed line. EOF reads as an empty line.
    fn ask(&mut self, prompt: &str) -> Result<String> {
        print!("{}", prompt);
        io::stdout().flush()?;

        let mut input = String::new();
        self.input.read_line(&mut input)?;
        Ok(input.trim().to_string())
    }

    /// Prompts user to confirm an action with a yes/no prompt.
    ///
    /// Default is "no" if user presses Enter.
    pub fn confirm_action(&mut self, prompt: &str) -> Result<bool> {
        let answer = self.ask(&format!("\n{} (y/N): ", prompt))?;
        Ok(parse_confirmation(&answer))
    }
}

impl Resolver for PromptResolver {
    fn allow_dirty_tree(&mut self, branch: &str) -> Result<bool> {
        self.confirm_action(&format!(
            "Branch '{}' has uncommitted changes. Release anyway?",
            branch
        ))
    }

    fn choose_bump(&mut self, current: &str, files: &[VersionFile]) -> Result<BumpRequest> {
        display_version_files(&self.root, files);

        let version = Version::parse(current)?;
        println!("\n{}", style(format!("Current version: {}", version)).bold());
        for (i, bump) in [VersionBump::Patch, VersionBump::Minor, VersionBump::Major]
            .iter()
            .enumerate()
        {
            match version.bump(*bump) {
                Ok(next) => println!("  {}. {:<6} → {}", i + 1, bump.name(), next),
                Err(_) => println!("  {}. {:<6} (unavailable)", i + 1, bump.name()),
            }
        }

        let answer = self.ask("\nSelect a bump (1-3) or enter a version [default: 1]: ")?;
        parse_bump_choice(&answer)
    }

    fn resolve_inconsistency(&mut self, versions: &[(PathBuf, String)]) -> Result<Option<String>> {
        display_error("Version files disagree:");
        for (path, version) in versions {
            println!(
                "  {:<28} {}",
                formatter::short_path(&self.root, path).display(),
                version
            );
        }

        let candidates = distinct_versions(versions);
        println!("\n{}", style("Which version is current?").bold());
        for (i, version) in candidates.iter().enumerate() {
            println!("  {}. {}", i + 1, version);
        }

        let answer = self.ask(&format!(
            "\nSelect a version (1-{}) [default: abort]: ",
            candidates.len()
        ))?;
        if answer.is_empty() {
            return Ok(None);
        }

        match answer.parse::<usize>() {
            Ok(index) if index > 0 && index <= candidates.len() => {
                Ok(Some(candidates[index - 1].clone()))
            }
            _ => Err(ReleaseError::cancelled(format!(
                "invalid selection '{}'",
                answer
            ))),
        }
    }

    fn skip_changelog(&mut self, path: &Path, reason: &ReleaseError) -> Result<bool> {
        display_status(&format!(
            "{}: {}",
            formatter::short_path(&self.root, path).display(),
            reason
        ));
        self.confirm_action("Continue without updating the changelog?")
    }

    fn supply_changelog_entries(&mut self, version: &Version) -> Result<Option<ChangelogEntries>> {
        display_status(&format!(
            "The Unreleased section is empty. Enter changelog entries for {}, one per line (empty line to finish):",
            version
        ));

        let mut entries = Vec::new();
        loop {
            let line = self.ask("  - ")?;
            if line.is_empty() {
                break;
            }
            entries.push(line);
        }
        if entries.is_empty() {
            return Ok(None);
        }

        let answer = self.ask(&format!(
            "Subsection ({}) [default: {}]: ",
            STANDARD_SUBSECTIONS.join(", "),
            DEFAULT_SUBSECTION
        ))?;

        Ok(Some(vec![(normalize_subsection(&answer), entries)]))
    }

    fn confirm_plan(&mut self, plan: &ReleasePlan) -> Result<bool> {
        display_plan(&self.root, plan);
        self.confirm_action(&format!("Release {}?", plan.tag))
    }
}
