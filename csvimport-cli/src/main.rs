use anyhow::Result;
use clap::Parser;

use csvimport_cli::cli::commands::import::handle_import_command;
use csvimport_cli::cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Import(args) => handle_import_command(args),
    }
}

/// Default to warnings; -v for info, -vv for debug. RUST_LOG wins.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}
