//! Import command

mod handler;

use std::path::PathBuf;

use clap::Args;

pub use handler::handle_import_command;

#[derive(Args, Debug)]
pub struct ImportCommands {
    /// CSV file, or a directory whose *.csv files are imported in name order
    pub file: PathBuf,

    /// Column mapping, e.g. "column1=name,column2=category.title"
    ///
    /// When omitted the first row is used as a header and each heading is
    /// mapped to the field of the same (lower-cased) name.
    #[arg(long)]
    pub mappings: Option<String>,

    /// Target model as app.Model (falls back to default_model from the config file)
    #[arg(long)]
    pub model: Option<String>,

    /// Values applied to every row before its own cells, e.g. "status=active"
    #[arg(long)]
    pub defaults: Option<String>,

    /// Mapping keys are header names instead of column numbers
    #[arg(long)]
    pub header_names: bool,

    /// First row is data, not a header (positional mappings only)
    #[arg(long)]
    pub no_header: bool,

    /// Always create new records instead of reusing matching ones
    #[arg(long)]
    pub no_dedup: bool,

    /// chrono format for date cells (default %m/%d/%Y)
    #[arg(long)]
    pub date_format: Option<String>,

    /// Identity recorded in the audit log
    #[arg(long)]
    pub import_user: Option<String>,

    /// Config file (default ~/.config/csvimport/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Schema file overriding the configured one
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Store snapshot overriding the configured one
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Audit log overriding the configured one
    #[arg(long)]
    pub audit_log: Option<PathBuf>,

    /// Print the audit record instead of appending it to the audit log
    #[arg(long)]
    pub console_log: bool,

    /// Run the import without writing the store snapshot
    #[arg(long)]
    pub dry_run: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}
