use crate::error::{ReleaseError, Result};
use crate::runner::CommandRunner;
use std::path::Path;
use std::process::{Child, Command};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Executes commands through `sh -c` (`cmd /C` on Windows)
///
/// Output is inherited so the operator sees test and build progress live.
#[derive(Debug, Clone, Default)]
pub struct ShellRunner {
    timeout: Option<Duration>,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill commands that run longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn shell_command(command: &str) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", command]);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", command]);
            cmd
        }
    }

    fn wait(&self, command: &str, child: &mut Child) -> Result<i32> {
        let started = Instant::now();

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if let Some(timeout) = self.timeout {
                if started.elapsed() >= timeout {
                    // The process may exit between try_wait and kill.
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ReleaseError::command(
                        command,
                        format!("timed out after {:?}", timeout),
                    ));
                }
            }
            thread::sleep(POLL_INTERVAL);
        };

        debug!(command, elapsed_ms = started.elapsed().as_millis() as u64, ?status, "command finished");
        status
            .code()
            .ok_or_else(|| ReleaseError::command(command, "terminated by signal"))
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str, cwd: &Path) -> Result<i32> {
        info!(command, cwd = %cwd.display(), "running");

        let mut cmd = Self::shell_command(command);
        cmd.current_dir(cwd);

        let mut child = cmd
            .spawn()
            .map_err(|e| ReleaseError::command(command, format!("failed to start: {}", e)))?;

        self.wait(command, &mut child)
    }
}
