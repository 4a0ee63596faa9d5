use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Command line arguments for HexLink
#[derive(Parser, Debug)]
#[command(
    name = "hexlink",
    version = env!("CARGO_PKG_VERSION"),
    about = "Send hex commands to TCP relay controllers",
    long_about = "Keeps one TCP session to a device, sends hex-encoded commands (optionally repeated) and shows what came back, from the shell, an interactive console or an HTTP API."
)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the HTTP API
    Serve(ServeArgs),
    /// Connect, send one hex command and disconnect
    Send(SendArgs),
    /// Interactive operator console
    Console,
    /// Run a local echo server for testing
    Echo {
        /// Bind address
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Port number
        #[arg(default_value = "5020")]
        port: u16,
    },
    /// List hex presets
    Presets,
    /// Show recent connections
    History,
    /// Configuration management commands
    Config(ConfigArgs),
    /// Display version information
    Version,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
    /// Table output
    Table,
}

/// HTTP server arguments
#[derive(ClapArgs, Debug)]
pub struct ServeArgs {
    /// Bind address (overrides config)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Port number (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// One-shot send arguments
#[derive(ClapArgs, Debug)]
pub struct SendArgs {
    /// Host address
    pub host: String,

    /// Port number
    pub port: u32,

    /// Hex payload or preset name
    pub hex: String,

    /// Number of times to send
    #[arg(short, long, default_value = "1")]
    pub repeat: u32,
}

/// Configuration management arguments
#[derive(ClapArgs, Debug)]
pub struct ConfigArgs {
    /// Configuration subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Create default project configuration
    Init {
        /// Directory to create `.hexlink/config.toml` in
        #[arg(short, long)]
        dir: Option<String>,
    },
    /// Print configuration file locations
    Path,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
        }
    }
}
