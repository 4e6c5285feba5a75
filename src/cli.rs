use clap::{Parser, ValueEnum};
use std::time::Duration;

use crate::request::{ExecutionContext, OutputMode, DEFAULT_SHELL, DEFAULT_TIMEOUT_SECS};
use crate::security::{CommandPolicy, PolicyError};

/// Transport used to carry MCP messages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    /// Streamable HTTP on --host/--port
    #[default]
    Http,
    /// Newline-delimited JSON-RPC on stdin/stdout
    Stdio,
}

/// Semtools MCP Server
#[derive(Debug, Parser)]
#[command(name = "semtools-mcp", version, about = "Semtools MCP Server")]
pub struct Cli {
    /// Transport protocol to use when serving the MCP interface.
    #[arg(long, value_enum, default_value_t = Transport::Http, env = "SEMTOOLS_MCP_TRANSPORT")]
    pub transport: Transport,

    /// Host interface for the HTTP transport.
    #[arg(long, default_value = "127.0.0.1", env = "SEMTOOLS_MCP_HOST")]
    pub host: String,

    /// TCP port for the HTTP transport.
    #[arg(long, default_value_t = 9001, env = "SEMTOOLS_MCP_PORT")]
    pub port: u16,

    /// Shell used to interpret commands.
    #[arg(long, default_value = DEFAULT_SHELL, env = "SEMTOOLS_MCP_SHELL")]
    pub shell: String,

    /// Seconds before a running command is killed.
    #[arg(
        long,
        default_value_t = DEFAULT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..),
        env = "SEMTOOLS_MCP_TIMEOUT_SECS"
    )]
    pub timeout_secs: u64,

    /// What execute_bash returns: stdout only, or JSON with stdout, stderr and exit_code.
    #[arg(long, value_enum, default_value_t = OutputMode::Stdout, env = "SEMTOOLS_MCP_OUTPUT")]
    pub output: OutputMode,

    /// Regex of commands to refuse. May be repeated. Without any, all commands run.
    /// The environment variable takes one pattern per line.
    #[arg(
        long = "deny-pattern",
        value_name = "REGEX",
        env = "SEMTOOLS_MCP_DENY_PATTERNS",
        value_delimiter = '\n'
    )]
    pub deny_patterns: Vec<String>,
}

impl Cli {
    pub fn execution_context(&self) -> ExecutionContext {
        ExecutionContext {
            shell: self.shell.clone(),
            ..Default::default()
        }
        .with_timeout(Duration::from_secs(self.timeout_secs))
        .with_output_mode(self.output)
    }

    pub fn command_policy(&self) -> Result<CommandPolicy, PolicyError> {
        CommandPolicy::from_patterns(&self.deny_patterns)
    }

    /// Whether the HTTP listener is reachable from outside this machine
    pub fn exposes_network(&self) -> bool {
        self.transport == Transport::Http
            && !matches!(self.host.as_str(), "127.0.0.1" | "localhost" | "::1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("semtools-mcp").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]).unwrap();
        assert_eq!(cli.transport, Transport::Http);
        assert_eq!(cli.host, "127.0.0.1");
        assert_eq!(cli.port, 9001);
        assert_eq!(cli.shell, "/bin/sh");
        assert_eq!(cli.timeout_secs, 60);
        assert_eq!(cli.output, OutputMode::Stdout);
        assert!(cli.deny_patterns.is_empty());
    }

    #[test]
    fn test_stdio_transport() {
        let cli = parse(&["--transport", "stdio"]).unwrap();
        assert_eq!(cli.transport, Transport::Stdio);
        assert!(!cli.exposes_network());
    }

    #[test]
    fn test_invalid_transport_is_rejected() {
        let err = parse(&["--transport", "badvalue"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
        assert_ne!(err.exit_code(), 0);
    }

    #[test]
    fn test_http_host_and_port() {
        let cli = parse(&["--transport", "http", "--host", "0.0.0.0", "--port", "9100"]).unwrap();
        assert_eq!(cli.transport, Transport::Http);
        assert_eq!(cli.host, "0.0.0.0");
        assert_eq!(cli.port, 9100);
        assert!(cli.exposes_network());
    }

    #[test]
    fn test_non_numeric_port_is_rejected() {
        assert!(parse(&["--port", "nine"]).is_err());
    }

    #[test]
    fn test_execution_context_from_flags() {
        let cli = parse(&["--shell", "/bin/bash", "--timeout-secs", "5", "--output", "structured"]).unwrap();
        let ctx = cli.execution_context();
        assert_eq!(ctx.shell, "/bin/bash");
        assert_eq!(ctx.timeout, Duration::from_secs(5));
        assert_eq!(ctx.output_mode, OutputMode::Structured);
    }

    #[test]
    fn test_repeated_deny_patterns() {
        let cli = parse(&["--deny-pattern", "^rm ", "--deny-pattern", "shutdown"]).unwrap();
        let policy = cli.command_policy().unwrap();
        assert!(policy.check("rm -rf x").is_err());
        assert!(policy.check("sudo shutdown now").is_err());
        assert!(policy.check("ls").is_ok());
    }

    #[test]
    fn test_invalid_deny_pattern_fails_policy() {
        let cli = parse(&["--deny-pattern", "("]).unwrap();
        assert!(cli.command_policy().is_err());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let err = parse(&["--timeout-secs", "0"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        assert_eq!(parse(&["--timeout-secs", "1"]).unwrap().timeout_secs, 1);
    }

    #[test]
    fn test_every_option_has_env_fallback() {
        let cmd = Cli::command();
        for arg in cmd.get_arguments() {
            if matches!(arg.get_id().as_str(), "help" | "version") {
                continue;
            }
            let env = arg.get_env().and_then(|e| e.to_str()).unwrap_or_default();
            assert!(
                env.starts_with("SEMTOOLS_MCP_"),
                "--{} has no SEMTOOLS_MCP_ variable",
                arg.get_id()
            );
        }
    }

    #[test]
    fn test_deny_patterns_env_is_newline_separated() {
        let cmd = Cli::command();
        let arg = cmd
            .get_arguments()
            .find(|a| a.get_id().as_str() == "deny_patterns")
            .unwrap();
        assert_eq!(
            arg.get_env().and_then(|e| e.to_str()),
            Some("SEMTOOLS_MCP_DENY_PATTERNS")
        );

        // Same splitting applies to a value read from the environment
        let cli = parse(&["--deny-pattern", "^rm \\S+|x\n(shutdown|reboot)"]).unwrap();
        assert_eq!(cli.deny_patterns, vec![r"^rm \S+|x", "(shutdown|reboot)"]);
        assert!(cli.command_policy().unwrap().check("sudo reboot").is_err());
    }
}
