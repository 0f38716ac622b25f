//! Command-line interface

pub mod commands;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "csvimport",
    version,
    about = "Import CSV files into structured records"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import a CSV file (or every CSV file in a directory)
    Import(commands::import::ImportCommands),
}
