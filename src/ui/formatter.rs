//! Pure formatting functions for UI output.
//!
//! This module contains all display/formatting logic separated from user interaction.

use std::path::{Path, PathBuf};

use console::style;

use crate::boundary::BoundaryWarning;
use crate::domain::VersionFile;
use crate::sequencer::{ReleaseFailure, ReleasePlan, ReleaseSummary};

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Display a boundary warning in yellow.
pub fn display_boundary_warning(warning: &BoundaryWarning) {
    eprintln!("{} {}", style("WARNING:").yellow(), warning);
}

/// Path relative to the project root when possible, for compact output
pub fn short_path<'a>(root: &Path, path: &'a Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}

/// Display the version recorded in every discovered file.
pub fn display_version_files(root: &Path, files: &[VersionFile]) {
    println!("\n{}", style("Version files:").bold());
    for file in files {
        println!(
            "  {:<28} {:<9} {}",
            short_path(root, &file.path).display(),
            file.format,
            file.version
        );
    }
}

/// Display the release plan before anything is modified.
pub fn display_plan(root: &Path, plan: &ReleasePlan) {
    display_version_files(root, &plan.files);

    println!("\n{}", style("Release plan:").bold());
    println!("  Version: {} → {}", style(plan.current).red(), style(plan.target).green());
    println!("  Branch:  {}", plan.branch);
    println!("  Tag:     {}", plan.tag);
    println!("  Commit:  {}", plan.commit_message);
    println!("  Changelog: {}", short_path(root, &plan.changelog).display());

    if plan.commands.is_empty() {
        println!("  Checks:  (none)");
    } else {
        for command in plan.commands.test.iter().chain(&plan.commands.build) {
            println!("  Check:   {}", command);
        }
    }
}

fn display_files(root: &Path, title: &str, files: &[PathBuf]) {
    if files.is_empty() {
        return;
    }
    println!("{}", title);
    for file in files {
        println!("  - {}", short_path(root, file).display());
    }
}

/// Display the outcome of a successful release or dry run.
pub fn display_summary(root: &Path, summary: &ReleaseSummary) {
    for warning in &summary.warnings {
        display_boundary_warning(warning);
    }

    if summary.dry_run {
        if let Some(plan) = &summary.plan {
            display_plan(root, plan);
        }
        display_status("Dry run: no files were modified");
        return;
    }

    display_files(root, "\nPatched files:", &summary.patched_files);
    if summary.changelog_updated {
        display_success("Changelog updated");
    }
    if summary.tag_pushed {
        display_success(&format!("Released {} and pushed tag {}", summary.version, summary.tag));
    } else {
        display_success(&format!("Released {} with local tag {}", summary.version, summary.tag));
        display_manual_push_instruction(&summary.tag, &summary.remote);
    }
}

/// Display an aborted release: stage, error and every modified file.
pub fn display_failure(root: &Path, failure: &ReleaseFailure) {
    for warning in &failure.warnings {
        display_boundary_warning(warning);
    }

    display_error(&format!(
        "Release aborted during {} (last completed: {})",
        failure.stage, failure.last_completed
    ));
    display_error(&failure.error.to_string());

    if failure.modified_files.is_empty() {
        display_status("No files were modified");
    } else if failure.reverted {
        display_files(root, "Restored to their original contents:", &failure.modified_files);
    } else {
        display_files(
            root,
            "Modified files (revert with `git checkout -- <file>`):",
            &failure.modified_files,
        );
    }

    if !failure.pushed_refs.is_empty() {
        eprintln!(
            "{} already on the remote: {}",
            style("WARNING:").yellow(),
            failure.pushed_refs.join(", ")
        );
    }
}

/// Tell the user how to push a tag that was only created locally.
pub fn display_manual_push_instruction(tag: &str, remote: &str) {
    println!("\nTo push the release later, run:");
    println!("  git push {} HEAD", remote);
    println!("  git push {} {}", remote, tag);
}
