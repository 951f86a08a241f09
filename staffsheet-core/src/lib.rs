//! staffsheet-core: payroll extraction engine for staffing-company workbooks
//!
//! The engine turns an arbitrary workbook (sheet layout, column order and
//! header wording vary per source) into typed payroll records, an employee
//! set, and statistics that explain every skipped sheet and rejected row.

pub mod config;
pub mod derive;
pub mod diagnostic;
pub mod employees;
pub mod error;
pub mod extract;
pub mod filter;
pub mod header;
pub mod model;
pub mod pipeline;
pub mod reader;
pub mod stats;
pub mod template;

use employees::EmployeeRegistry;
use header::labels::LabelDictionary;
use pipeline::{PipelineContext, SheetOutcome, process_sheet};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use stats::StatsAccumulator;
use tracing::info;

pub use config::{ParserConfig, SheetConfig};
pub use diagnostic::{Diagnostic, DiagnosticKind, DiagnosticScope, Severity};
pub use error::{ConfigError, WorkbookLoadError};
pub use extract::RejectReason;
pub use filter::SkipReason;
pub use model::{AmountSource, Employee, FieldRole, PayrollRecord, Period};
pub use reader::{Sheet, Workbook};
pub use stats::{ParseStats, SheetStats};

/// How sheet columns are located
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParseMode {
    /// Heuristic header detection on every sheet
    #[default]
    Intelligent,
    /// Pre-declared layouts selected by sentinel cells
    FixedTemplate,
}

/// Result of one parse call
#[derive(Debug, Clone, Serialize)]
pub struct ParseOutcome {
    /// Ordered by (sheet index, row)
    pub records: Vec<PayrollRecord>,
    /// Unique by employee id, first-seen order
    pub employees: Vec<Employee>,
    pub stats: ParseStats,
}

/// Main parser interface
pub struct PayrollParser {
    config: ParserConfig,
    dictionary: LabelDictionary,
    stats: ParseStats,
    employees: Vec<Employee>,
}

impl PayrollParser {
    /// Create a new parser with default configuration
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    /// Create a new parser with custom configuration
    pub fn with_config(config: ParserConfig) -> Self {
        let dictionary = config.dictionary();
        Self {
            config,
            dictionary,
            stats: ParseStats::default(),
            employees: Vec::new(),
        }
    }

    /// Validate the configuration before building the parser
    pub fn try_with_config(config: ParserConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Decode and extract a workbook without touching parser state
    pub fn extract(&self, content: &[u8], mode: ParseMode) -> Result<ParseOutcome, WorkbookLoadError> {
        let workbook = reader::read_workbook(content)?;
        Ok(self.extract_workbook(&workbook, mode))
    }

    /// Extract an already decoded workbook
    pub fn extract_workbook(&self, workbook: &Workbook, mode: ParseMode) -> ParseOutcome {
        let ctx = PipelineContext::new(&self.config, &self.dictionary, mode);
        let outcomes: Vec<SheetOutcome> = if self.config.parallel {
            workbook
                .sheets
                .par_iter()
                .map(|sheet| process_sheet(&ctx, sheet))
                .collect()
        } else {
            workbook
                .sheets
                .iter()
                .map(|sheet| process_sheet(&ctx, sheet))
                .collect()
        };

        let mut accumulator = StatsAccumulator::new(workbook.sheets.len());
        let mut rows = Vec::new();
        for outcome in outcomes {
            accumulator.add_sheet(outcome.stats, &outcome.rejected, outcome.diagnostics);
            rows.extend(outcome.rows);
        }
        rows.sort_by_key(|r| (r.record.provenance.sheet_index, r.record.provenance.row));

        let mut registry = EmployeeRegistry::new();
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let provenance = &row.record.provenance;
            if let Some(diagnostic) = registry.observe(&row.fields, &provenance.sheet, provenance.row) {
                accumulator.add_diagnostic(diagnostic);
            }
            records.push(row.record);
        }

        let stats = accumulator.finish();
        info!(
            mode = ?mode,
            sheets_total = stats.sheets_total,
            sheets_processed = stats.sheets_processed,
            sheets_skipped = stats.sheets_skipped,
            records = stats.records_extracted,
            rejected = stats.records_rejected,
            "workbook parsed"
        );

        ParseOutcome {
            records,
            employees: registry.into_employees(),
            stats,
        }
    }

    /// Parse a workbook and keep its stats and employees for the accessors.
    ///
    /// A load failure leaves zeroed stats behind.
    pub fn parse(&mut self, content: &[u8], mode: ParseMode) -> Result<Vec<PayrollRecord>, WorkbookLoadError> {
        match self.extract(content, mode) {
            Ok(outcome) => {
                self.stats = outcome.stats;
                self.employees = outcome.employees;
                Ok(outcome.records)
            }
            Err(e) => {
                self.stats = ParseStats::default();
                self.employees.clear();
                Err(e)
            }
        }
    }

    /// Stats of the most recent parse; all zero before the first one
    pub fn parsing_stats(&self) -> &ParseStats {
        &self.stats
    }

    /// Employees of the most recent parse
    pub fn employees(&self) -> &[Employee] {
        &self.employees
    }
}

impl Default for PayrollParser {
    fn default() -> Self {
        Self::new()
    }
}
