use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    tool, ErrorData as McpError, ServerHandler,
};

use crate::executor::ExecError;
use crate::request::ExecutionContext;
use crate::security::CommandPolicy;
use crate::tools::{bash, ExecuteBashRequest};

pub const SERVER_NAME: &str = "Semtools MCP Server";

const SERVER_INSTRUCTIONS: &str = r#"Semtools MCP server. Provides execute_bash, which runs a shell command on the host and returns its standard output.

Standard error and the exit code are not part of the result, so a failing command and a silent one both return empty text. Commands are killed after the server's timeout (60 seconds by default)."#;

#[derive(Clone)]
pub struct SemtoolsServer {
    ctx: Arc<ExecutionContext>,
    policy: Arc<CommandPolicy>,
    tool_router: ToolRouter<Self>,
}

impl SemtoolsServer {
    pub fn new(ctx: ExecutionContext, policy: CommandPolicy) -> Self {
        Self {
            ctx: Arc::new(ctx),
            policy: Arc::new(policy),
            tool_router: Self::tool_router(),
        }
    }
}

impl Default for SemtoolsServer {
    fn default() -> Self {
        Self::new(ExecutionContext::default(), CommandPolicy::unrestricted())
    }
}

fn exec_error_to_mcp(err: ExecError) -> McpError {
    McpError::internal_error(err.to_string(), None)
}

#[rmcp::tool_router]
impl SemtoolsServer {
    #[tool(description = r#"Useful for executing bash commands on your machine.
When executing bash commands, you have two very helpful utilities installed
- `parse` -- converts any non grep-able format into markdown, outputs a filepath for a converted markdown file for every input file to stdin
- `search` -- performs a search using static embeddings on either stdin or a list of files (very similar to grep). Works best with keyword based search queries. Only works with text-based files so it may require the `parse` tool to help preprocess into markdown.

These command, combined with other CLI commands, you can ensure that you can search large amounts of files efficiently, while handling various formats of documents. Both `parse` and `search` can scale to hundreds of thousands of documents.

## Parse CLI Help

```bash
parse --help
A CLI tool for parsing documents using various backends

Usage: parse [OPTIONS] <FILES>...

Arguments:
<FILES>...  Files to parse

Options:
-c, --parse-config <PARSE_CONFIG>  Path to the config file. Defaults to ~/.parse_config.json
-b, --backend <BACKEND>            The backend type to use for parsing. Defaults to `llama-parse` [default: llama-parse]
-h, --help                         Print help
-V, --version                      Print version
```

## Search CLI Help

```bash
search --help
A CLI tool for fast semantic keyword search

Usage: search [OPTIONS] <QUERY> [FILES]...

Arguments:
<QUERY>     Query to search for (positional argument)
[FILES]...  Files or directories to search

Options:
-n, --n-lines <N_LINES>            How many lines before/after to return as context [default: 3]
    --top-k <TOP_K>                The top-k files or texts to return (ignored if max_distance is set) [default: 3]
-m, --max-distance <MAX_DISTANCE>  Return all results with distance below this threshold (0.0+)
-i, --ignore-case                  Perform case-insensitive search (default is false)
-h, --help                         Print help
-V, --version                      Print version
```"#)]
    async fn execute_bash(
        &self,
        Parameters(req): Parameters<ExecuteBashRequest>,
    ) -> Result<CallToolResult, McpError> {
        if let Err(e) = self.policy.check(&req.command) {
            tracing::warn!(command = %req.command, "{}", e);
            return Err(McpError::invalid_request(e.to_string(), None));
        }

        tracing::info!(command = %req.command, "executing command");

        let ctx = Arc::clone(&self.ctx);
        let command = req.command.clone();
        let outcome = tokio::task::spawn_blocking(move || bash::execute(&req, &ctx))
            .await
            .map_err(|e| McpError::internal_error(format!("command task failed: {}", e), None))?;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(%command, "{}", e);
                return Err(exec_error_to_mcp(e));
            }
        };

        tracing::debug!(
            %command,
            exit_code = ?outcome.exit_code,
            stdout_bytes = outcome.stdout.len(),
            stderr_bytes = outcome.stderr.len(),
            "command finished"
        );

        let text = bash::render(&outcome, self.ctx.output_mode);
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

#[rmcp::tool_handler]
impl ServerHandler for SemtoolsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::from_build_env()
            },
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
        }
    }
}
