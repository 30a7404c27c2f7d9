//! CLI surface (spec §6), in the teacher's `#[derive(Parser)]` /
//! `#[derive(Subcommand)]` style (`apps/hyperspot-server/src/main.rs`).

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "gateway-server", about = "Multi-database MCP gateway")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Transport mode: `sse` or `stdio`. Overrides `TRANSPORT_MODE`.
    #[arg(short = 't', long = "transport")]
    pub transport: Option<String>,

    /// SSE listen port.
    #[arg(long = "port")]
    pub port: Option<u16>,

    /// SSE listen host.
    #[arg(long = "host")]
    pub host: Option<String>,

    /// Explicit config file path.
    #[arg(short = 'c', long = "config")]
    pub config: Option<String>,

    /// Inline JSON connection list.
    #[arg(long = "db-config")]
    pub db_config: Option<String>,

    /// Print the resolved, credential-redacted connection list and exit.
    #[arg(long = "print-config")]
    pub print_config: bool,

    /// Log verbosity level (-v debug, -vv trace).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Emit structured JSON log lines instead of the default text format.
    #[arg(long = "log-json")]
    pub log_json: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the gateway and serve requests (default when omitted).
    Run,
    /// Validate configuration without starting any transport.
    Check,
}

impl Cli {
    pub fn transport_mode(&self) -> String {
        self.transport
            .clone()
            .or_else(crate::source::transport_mode_from_env)
            .unwrap_or_else(|| "stdio".to_string())
    }
}
