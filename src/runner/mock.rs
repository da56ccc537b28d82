use crate::error::Result;
use crate::runner::CommandRunner;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Runner that records commands and returns scripted exit codes
///
/// Commands without a scripted code exit with 0.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    exit_codes: HashMap<String, i32>,
    executed: Mutex<Vec<String>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exit_code(mut self, command: impl Into<String>, code: i32) -> Self {
        self.exit_codes.insert(command.into(), code);
        self
    }

    /// Commands run so far, in order
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|commands| commands.clone())
            .unwrap_or_default()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command: &str, _cwd: &Path) -> Result<i32> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(command.to_string());
        }
        Ok(self.exit_codes.get(command).copied().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_runner() {
        let runner = RecordingRunner::new().with_exit_code("npm test", 1);
        assert_eq!(runner.run("npm run build", Path::new(".")).unwrap(), 0);
        assert_eq!(runner.run("npm test", Path::new(".")).unwrap(), 1);
        assert_eq!(runner.executed(), vec!["npm run build", "npm test"]);
    }
}
