//! CLI adapter for lexport
//!
//! Starts the protocol server and inspects index directories.
//! This module depends on `core/` and `driver/`; neither depends on it.
//!
//! # Architecture
//!
//! ```text
//!              +------------------+
//!              |     core/        |
//!              |  (domain logic)  |
//!              +--------+---------+
//!                       |
//!              +--------+---------+
//!              |     driver/      |
//!              | (wire protocol)  |
//!              +--------+---------+
//!                       |
//!              +--------+---------+
//!              |      cli/        |
//!              | (clap adapter)   |
//!              +------------------+
//! ```

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

/// lexport - binary command server for an embedded full-text index
///
/// Serve sessions over stdio or TCP, and inspect index directories.
#[derive(Parser, Debug)]
#[command(name = "lexport")]
#[command(author = "RHOBIMD HEALTH")]
#[command(version)]
#[command(about = "Binary command server for an embedded full-text index", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub format: OutputFormat,

    /// Write logs to stderr as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve protocol sessions over stdio (default) or TCP
    Serve(commands::ServeArgs),

    /// Show a summary of an index directory
    #[command(name = "inspect-db")]
    InspectDb(commands::InspectArgs),

    /// Show current configuration
    #[command(name = "show-config")]
    ShowConfig(commands::ConfigArgs),

    /// Show version and server information
    #[command(name = "get-server-info")]
    GetServerInfo(commands::InfoArgs),

    /// Generate shell completion scripts
    ///
    /// Output completion script to stdout. To install:
    ///
    ///   bash:  lexport completions bash > ~/.local/share/bash-completion/completions/lexport
    ///   zsh:   lexport completions zsh > ~/.zfunc/_lexport
    ///   fish:  lexport completions fish > ~/.config/fish/completions/lexport.fish
    Completions(commands::CompletionsArgs),
}

/// Run the CLI with the provided arguments
pub async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    use crate::core::config::Config;

    // Handle completions command early (doesn't need configuration)
    let command = match cli.command {
        Commands::Completions(args) => return commands::completions::execute(args),
        other => other,
    };

    // Load configuration
    let config = Config::load()?;

    // Execute command
    match command {
        Commands::Serve(args) => commands::serve::execute(args, config).await,
        Commands::InspectDb(args) => commands::inspect::execute(args, &config, cli.format),
        Commands::ShowConfig(args) => commands::config::execute(args, &config, cli.format),
        Commands::GetServerInfo(args) => commands::info::execute(args, &config, cli.format),
        Commands::Completions(_) => Ok(()),
    }
}
