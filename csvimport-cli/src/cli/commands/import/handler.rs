//! Import command handler

use anyhow::{Context, Result};
use colored::*;

use super::ImportCommands;
use crate::audit::{AuditSink, ConsoleAuditSink, JsonLinesAuditSink};
use crate::config::{Config, RunConfig};
use crate::import::{
    parse_defaults, parse_mappings, ColumnMode, ImportEngine, RunError, RunReport,
};
use crate::input::read_rows;
use crate::schema::Schema;
use crate::store::MemoryStore;

/// Handle the import command
pub fn handle_import_command(args: ImportCommands) -> Result<()> {
    if args.no_color {
        colored::control::set_override(false);
    }

    if args.header_names && args.no_header {
        anyhow::bail!("--header-names needs a header row and cannot be combined with --no-header");
    }

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let Some(model) = args.model.clone().or_else(|| config.default_model.clone()) else {
        anyhow::bail!("No model given: pass --model app_label.ModelName or set default_model in the config file");
    };

    let schema_path = args.schema.clone().unwrap_or_else(|| config.schema_path());
    let schema = Schema::load(&schema_path)?;

    let mappings = parse_mappings(args.mappings.as_deref().unwrap_or_default())
        .context("Invalid --mappings")?;
    let defaults = parse_defaults(args.defaults.as_deref().unwrap_or_default())
        .context("Invalid --defaults")?;

    let rows = read_rows(&args.file)?;

    let column_mode = if args.header_names {
        ColumnMode::HeaderNames
    } else {
        ColumnMode::Positional
    };

    let mut builder = RunConfig::builder(model)
        .from_config(&config)
        .mappings(mappings)
        .defaults(defaults)
        .column_mode(column_mode)
        .has_header(!args.no_header)
        .file_name(args.file.display().to_string());
    if args.no_dedup {
        builder = builder.deduplicate(false);
    }
    if let Some(format) = &args.date_format {
        builder = builder.date_format(format.clone());
    }
    if let Some(user) = &args.import_user {
        builder = builder.import_user(user.clone());
    }
    let run_config = builder.build();

    let store_path = args.store.clone().unwrap_or_else(|| config.store_path());
    let mut store = MemoryStore::load(&store_path, schema.clone())?;

    let mut audit: Box<dyn AuditSink> = if args.console_log {
        Box::new(ConsoleAuditSink)
    } else {
        let path = args
            .audit_log
            .clone()
            .unwrap_or_else(|| config.audit_log_path());
        Box::new(JsonLinesAuditSink::new(path))
    };

    let report = ImportEngine::new(&schema, &mut store, &run_config).run(&rows, audit.as_mut());

    if args.dry_run {
        println!("{}", "Dry run: store not written".yellow());
    } else {
        store
            .save_snapshot(&store_path)
            .with_context(|| format!("Failed to write store: {}", store_path.display()))?;
    }

    print_report(&run_config, &report);

    if let Some(e) = &report.aborted {
        if matches!(e, RunError::UnknownModel { .. }) {
            let known: Vec<&str> = schema.model_names().collect();
            println!("Known models: {}", known.join(", ").cyan());
        }
        anyhow::bail!("Import aborted: {}", e);
    }
    Ok(())
}

fn print_report(config: &RunConfig, report: &RunReport) {
    println!(
        "{} {} into {}",
        "Imported".bold(),
        config.file_name.cyan(),
        config.model.bright_green().bold()
    );
    println!(
        "  {} rows: {} saved, {} failed, {} skipped",
        report.rows_seen,
        report.rows_saved.to_string().green(),
        report.rows_failed.to_string().red(),
        report.rows_skipped.to_string().dimmed()
    );

    if report.log.is_empty() {
        return;
    }
    println!();
    for message in report.log.messages() {
        if message.starts_with("Exception found") {
            println!("  {}", message.red());
        } else {
            println!("  {}", message.yellow());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn test_missing_model_errors() {
        let missing = std::env::temp_dir().join(format!("csvimport-{}.toml", uuid::Uuid::new_v4()));
        let cli = Cli::parse_from([
            "csvimport",
            "import",
            "items.csv",
            "--config",
            missing.to_str().unwrap(),
        ]);
        let Commands::Import(args) = cli.command;

        let err = handle_import_command(args).unwrap_err();
        assert!(err.to_string().starts_with("No model given"), "{:#}", err);
    }
}
