use clap::ValueEnum;
use std::time::Duration;

/// Default shell used to interpret commands
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Default timeout in seconds for a single command
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// How a finished command is rendered back to the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Captured standard output only; exit code and stderr are dropped
    #[default]
    Stdout,
    /// JSON object with stdout, stderr and exit_code
    Structured,
}

/// Execution settings shared by every tool call.
/// Built once at startup from the command line and never mutated.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub shell: String,
    pub timeout: Duration,
    pub output_mode: OutputMode,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            shell: DEFAULT_SHELL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            output_mode: OutputMode::default(),
        }
    }
}

impl ExecutionContext {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_output_mode(mut self, output_mode: OutputMode) -> Self {
        self.output_mode = output_mode;
        self
    }
}
