//! Import run orchestration
//!
//! A run picks the mapping (given, or derived from the header row), then
//! builds and persists one tree per data row in input order. Row failures
//! are logged and the run moves on; only setup problems abort it.

use super::builder::TreeBuilder;
use super::errors::{PersistError, RunError};
use super::persist::TreePersister;
use super::{mappings_from_header, ColumnMode, ColumnResolver, MappingEntry, RunLog};
use crate::audit::{AuditRecord, AuditSink};
use crate::config::RunConfig;
use crate::schema::SchemaRegistry;
use crate::store::{Record, Store};

/// Outcome of one import run
#[derive(Debug, Default)]
pub struct RunReport {
    /// Everything the run logged, in order
    pub log: RunLog,
    /// Data rows looked at
    pub rows_seen: usize,
    /// Rows whose root record was saved
    pub rows_saved: usize,
    /// Rows whose root record was not saved
    pub rows_failed: usize,
    /// Rows with nothing mapped
    pub rows_skipped: usize,
    /// Set when the run stopped before processing rows
    pub aborted: Option<RunError>,
}

impl RunReport {
    /// Check if the run stopped before processing rows
    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }
}

/// Mapping, column resolver and data rows chosen for a run
struct RunPlan<'r> {
    mappings: Vec<MappingEntry>,
    columns: ColumnResolver,
    rows: &'r [Vec<String>],
}

/// Runs an import against a schema and store
pub struct ImportEngine<'a, S: SchemaRegistry, St: Store + ?Sized> {
    schema: &'a S,
    store: &'a mut St,
    config: &'a RunConfig,
}

impl<'a, S: SchemaRegistry, St: Store + ?Sized> ImportEngine<'a, S, St> {
    pub fn new(schema: &'a S, store: &'a mut St, config: &'a RunConfig) -> Self {
        ImportEngine {
            schema,
            store,
            config,
        }
    }

    /// Import all rows
    ///
    /// Always returns a report; a run that logged anything also hands an
    /// audit record to `audit`.
    pub fn run(&mut self, rows: &[Vec<String>], audit: &mut dyn AuditSink) -> RunReport {
        log::info!("Importing {} rows into {}", rows.len(), self.config.model);
        let mut report = RunReport::default();

        if let Err(e) = self.import_rows(rows, &mut report) {
            report.log.push(e.to_string());
            report.aborted = Some(e);
        }

        if !report.log.is_empty() {
            let record = AuditRecord::new(self.config, &report.log);
            if let Err(e) = audit.record(&record) {
                log::warn!("Failed to write audit record: {:#}", e);
            }
        }

        log::info!(
            "Import finished: {} saved, {} failed, {} skipped",
            report.rows_saved,
            report.rows_failed,
            report.rows_skipped
        );
        report
    }

    fn import_rows(&mut self, rows: &[Vec<String>], report: &mut RunReport) -> Result<(), RunError> {
        if self.schema.model(&self.config.model).is_none() {
            return Err(RunError::UnknownModel {
                model: self.config.model.clone(),
            });
        }

        let plan = self.plan(rows, &mut report.log)?;

        for (i, row) in plan.rows.iter().enumerate() {
            let number = i + 1;
            report.rows_seen += 1;

            match self.import_row(&plan, row, &mut report.log) {
                Ok(Some(record)) => {
                    log::debug!("Row {} saved as {}", number, record);
                    report.rows_saved += 1;
                }
                Ok(None) => {
                    log::debug!("Row {} has no mapped values, skipped", number);
                    report.rows_skipped += 1;
                }
                Err(e) => {
                    report.rows_failed += 1;
                    report
                        .log
                        .push(format!("Exception found... {} Instance {} not saved.", e, number));
                }
            }
        }

        Ok(())
    }

    /// Choose the mapping and the rows it applies to
    fn plan<'r>(&self, rows: &'r [Vec<String>], log: &mut RunLog) -> Result<RunPlan<'r>, RunError> {
        let after_first = rows.get(1..).unwrap_or(&[]);

        if self.config.mappings.is_empty() {
            let header = rows.first().map(Vec::as_slice).unwrap_or(&[]);
            let mappings = mappings_from_header(header);
            if mappings.is_empty() {
                return Err(RunError::NoUsableMapping {
                    model: self.config.model.clone(),
                });
            }
            log.info("Using mapping from first row of CSV file");
            return Ok(RunPlan {
                mappings,
                columns: ColumnResolver::Positional,
                rows: after_first,
            });
        }

        log.info("Using manually entered mapping list");
        let mappings = self.config.mappings.clone();
        let plan = match self.config.column_mode {
            ColumnMode::HeaderNames => RunPlan {
                mappings,
                columns: ColumnResolver::Header(rows.first().cloned().unwrap_or_default()),
                rows: after_first,
            },
            ColumnMode::Positional => RunPlan {
                mappings,
                columns: ColumnResolver::Positional,
                rows: if self.config.has_header { after_first } else { rows },
            },
        };
        Ok(plan)
    }

    /// Build and persist one row; `None` when the row mapped nothing
    fn import_row(
        &mut self,
        plan: &RunPlan<'_>,
        row: &[String],
        log: &mut RunLog,
    ) -> Result<Option<Record>, PersistError> {
        let mut tree = TreeBuilder::new(self.schema, self.config).build(
            &plan.mappings,
            row,
            &plan.columns,
            log,
        );
        if tree.is_empty() {
            return Ok(None);
        }

        TreePersister::new(self.schema, &mut *self.store, self.config)
            .persist(&mut tree, log)
            .map(Some)
    }
}
