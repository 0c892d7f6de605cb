//! typex - Extract declarations from C/C++ headers
//!
//! Usage:
//!   typex extract <path>...          Print a JSON type database
//!   typex extract <path>... -f text  Print C-like prototypes and types
//!   typex policy                     Print the default filter policy

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::extract::ExtractArgs;

#[derive(Parser)]
#[command(name = "typex")]
#[command(about = "Extract function and type declarations from C/C++ headers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract declarations from header files or directories
    Extract(ExtractArgs),
    /// Print the default function filter policy as JSON
    Policy,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Extract(args) => commands::handle_extract_command(args),
        Commands::Policy => commands::handle_policy_command(),
    }
}
