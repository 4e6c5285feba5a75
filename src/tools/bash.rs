use rmcp::schemars;
use serde::Deserialize;
use std::process::Command;

use crate::executor::{run_command, ExecError, ExecutionOutcome};
use crate::request::{ExecutionContext, OutputMode};

/// Request parameters for the execute_bash tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ExecuteBashRequest {
    /// The shell command to run
    pub command: String,
}

/// Run the command through the configured shell, exactly as written
pub fn execute(req: &ExecuteBashRequest, ctx: &ExecutionContext) -> Result<ExecutionOutcome, ExecError> {
    let mut cmd = Command::new(&ctx.shell);
    cmd.arg("-c").arg(&req.command);
    run_command(cmd, ctx.timeout)
}

/// Render an outcome the way the caller asked for it.
/// In stdout mode a failing command and a silent one look the same.
pub fn render(outcome: &ExecutionOutcome, mode: OutputMode) -> String {
    match mode {
        OutputMode::Stdout => outcome.stdout.clone(),
        OutputMode::Structured => serde_json::to_string(outcome)
            .unwrap_or_else(|_| outcome.stdout.clone()),
    }
}
