//! Audit records written once per import run
//!
//! A run that logged anything hands an [`AuditRecord`] to an [`AuditSink`].
//! Unattended runs append it to a JSON-lines file; interactive runs can
//! print it instead.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::RunConfig;
use crate::import::RunLog;

/// Summary of one run's logged issues
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub run_id: Uuid,
    pub file_name: String,
    pub import_user: String,
    pub upload_method: String,
    /// Run log messages joined by newlines
    pub error_log: String,
    pub import_date: DateTime<Local>,
}

impl AuditRecord {
    /// Assemble the record for a finished run
    pub fn new(config: &RunConfig, log: &RunLog) -> Self {
        AuditRecord {
            run_id: Uuid::new_v4(),
            file_name: config.file_name.clone(),
            import_user: config.import_user.clone(),
            upload_method: config.upload_method.clone(),
            error_log: log.text(),
            import_date: Local::now(),
        }
    }
}

/// Receives the audit record at the end of a run
pub trait AuditSink {
    fn record(&mut self, record: &AuditRecord) -> Result<()>;
}

/// Appends one JSON object per run to a file
#[derive(Debug, Clone)]
pub struct JsonLinesAuditSink {
    path: PathBuf,
}

impl JsonLinesAuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonLinesAuditSink { path: path.into() }
    }

    /// Read back every record in the file
    pub fn read_all(&self) -> Result<Vec<AuditRecord>> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read audit log: {}", self.path.display()))?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).context("Failed to parse audit record"))
            .collect()
    }
}

impl AuditSink for JsonLinesAuditSink {
    fn record(&mut self, record: &AuditRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create audit log directory: {}", parent.display())
            })?;
        }

        let line = serde_json::to_string(record).context("Failed to serialize audit record")?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open audit log: {}", self.path.display()))?;
        writeln!(file, "{}", line)
            .with_context(|| format!("Failed to write audit log: {}", self.path.display()))?;

        log::info!("Audit record {} written to {}", record.run_id, self.path.display());
        Ok(())
    }
}

/// Prints the run log to stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleAuditSink;

impl AuditSink for ConsoleAuditSink {
    fn record(&mut self, record: &AuditRecord) -> Result<()> {
        println!(
            "Import of {} by {} ({}) at {}",
            record.file_name,
            record.import_user,
            record.upload_method,
            record.import_date.format("%Y-%m-%d %H:%M:%S")
        );
        println!("{}", record.error_log);
        Ok(())
    }
}

/// Collects records in memory
impl AuditSink for Vec<AuditRecord> {
    fn record(&mut self, record: &AuditRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}
