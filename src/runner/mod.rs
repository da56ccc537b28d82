//! Test and build command execution
//!
//! The sequencer runs project-specific test and build commands through the
//! [CommandRunner] trait:
//! - [executor::ShellRunner]: runs commands through the platform shell
//! - [mock::RecordingRunner]: records commands and returns scripted exit codes
//!
//! [detect::detect_commands] picks the commands from the project descriptors
//! present in the project root.

pub mod detect;
pub mod executor;
pub mod mock;

pub use detect::{detect_commands, ProjectCommands};
pub use executor::ShellRunner;
pub use mock::RecordingRunner;

use crate::error::Result;
use std::path::Path;

/// Runs a shell command line and reports its exit code
pub trait CommandRunner {
    /// Run `command` in `cwd`, blocking until it exits.
    ///
    /// # Returns
    /// * `Ok(code)` - The process exit code (non-zero is not an error here)
    /// * `Err` - If the process could not be started, timed out, or was
    ///   killed by a signal
    fn run(&self, command: &str, cwd: &Path) -> Result<i32>;
}
