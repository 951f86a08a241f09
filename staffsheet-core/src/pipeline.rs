//! Per-sheet pipeline: filter, locate columns, extract rows, derive amounts.
//!
//! `process_sheet` reads only shared immutable state, so sheets can run on
//! any thread; the facade merges the outcomes in workbook order.

use crate::ParseMode;
use crate::config::ParserConfig;
use crate::derive::derive_billing_amount;
use crate::diagnostic::{Diagnostic, DiagnosticKind, Severity};
use crate::extract::period::period_from_sheet_name;
use crate::extract::{ExtractSettings, RejectReason, RowExtractor, RowFields};
use crate::filter::{SheetFilter, SkipReason};
use crate::header::HeaderDetector;
use crate::header::labels::LabelDictionary;
use crate::model::{AmountSource, ColumnMapping, FieldRole, PayrollRecord, Period, Provenance};
use crate::reader::Sheet;
use crate::reader::cell_ref::column_letters;
use crate::stats::SheetStats;
use crate::template::match_template;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Read-only state shared by every sheet of one parse
pub struct PipelineContext<'a> {
    pub config: &'a ParserConfig,
    pub dictionary: &'a LabelDictionary,
    pub mode: ParseMode,
    workbook_period: Option<Period>,
    tolerance: Decimal,
}

impl<'a> PipelineContext<'a> {
    pub fn new(config: &'a ParserConfig, dictionary: &'a LabelDictionary, mode: ParseMode) -> Self {
        Self {
            config,
            dictionary,
            mode,
            workbook_period: config.workbook_period(),
            tolerance: Decimal::from_f64(config.derive_tolerance).unwrap_or(Decimal::ZERO),
        }
    }

    /// Sheet-level period: per-sheet config, then sheet name, then workbook
    pub fn context_period(&self, sheet_name: &str) -> Option<Period> {
        self.config
            .sheet_period(sheet_name)
            .or_else(|| period_from_sheet_name(sheet_name))
            .or(self.workbook_period)
    }
}

/// An emitted record together with the employee facts of its row
#[derive(Debug, Clone)]
pub struct RecordRow {
    pub record: PayrollRecord,
    pub fields: RowFields,
}

/// Everything one sheet contributes to a parse
#[derive(Debug, Clone)]
pub struct SheetOutcome {
    pub stats: SheetStats,
    pub rejected: BTreeMap<RejectReason, usize>,
    pub rows: Vec<RecordRow>,
    pub diagnostics: Vec<Diagnostic>,
}

impl SheetOutcome {
    fn skipped(sheet: &Sheet, reason: SkipReason, mut diagnostics: Vec<Diagnostic>, message: String) -> Self {
        let (kind, severity) = match reason {
            SkipReason::SkipListed => (DiagnosticKind::SkipListed, Severity::Info),
            SkipReason::Hidden => (DiagnosticKind::HiddenSheet, Severity::Info),
            SkipReason::Empty => (DiagnosticKind::EmptySheet, Severity::Info),
            SkipReason::HeaderNotFound => (DiagnosticKind::HeaderNotFound, Severity::Warning),
            SkipReason::TemplateNotMatched => (DiagnosticKind::TemplateNotMatched, Severity::Warning),
        };
        debug!(sheet = %sheet.name, reason = %reason, "sheet skipped");
        diagnostics.push(Diagnostic::sheet(kind, &sheet.name, message, severity));
        Self {
            stats: SheetStats::skipped(sheet.index, &sheet.name, reason),
            rejected: BTreeMap::new(),
            rows: Vec::new(),
            diagnostics,
        }
    }
}

/// Where the columns of a sheet were found
struct Located {
    mappings: Vec<ColumnMapping>,
    header_row: u32,
    data_start_row: u32,
    confidence: f64,
    template_id: Option<String>,
}

/// Run one sheet through the whole pipeline
pub fn process_sheet(ctx: &PipelineContext<'_>, sheet: &Sheet) -> SheetOutcome {
    let mut diagnostics = Vec::new();

    if let Some(reason) = SheetFilter::new(ctx.config).probe(sheet) {
        let message = match reason {
            SkipReason::SkipListed => "sheet name is in the skip list".to_string(),
            SkipReason::Hidden => "sheet is hidden".to_string(),
            _ => format!(
                "no data in the first {} rows x {} columns",
                ctx.config.header_rows, ctx.config.header_columns
            ),
        };
        return SheetOutcome::skipped(sheet, reason, diagnostics, message);
    }

    let located = match locate(ctx, sheet, &mut diagnostics) {
        Ok(located) => located,
        Err((reason, message)) => {
            return SheetOutcome::skipped(sheet, reason, diagnostics, message);
        }
    };

    let settings = ExtractSettings {
        blank_run_threshold: ctx.config.blank_run_threshold,
        sentinel_ids: &ctx.config.sentinel_ids,
        summary_labels: &ctx.config.summary_labels,
        required_roles: &ctx.config.required_roles,
        dictionary: ctx.dictionary,
    };
    let extraction = RowExtractor::new(
        sheet,
        &located.mappings,
        located.data_start_row,
        settings,
        ctx.context_period(&sheet.name),
    )
    .extract();
    diagnostics.extend(extraction.diagnostics);

    let mut stats = SheetStats::processed(sheet.index, &sheet.name);
    let mut rows = Vec::with_capacity(extraction.rows.len());
    for extracted in extraction.rows {
        let fields = extracted.fields;
        let derivation = derive_billing_amount(
            fields.work_hours,
            fields.billing_rate,
            fields.billing_amount,
            ctx.tolerance,
        );

        match derivation.source {
            AmountSource::Derived => stats.derived_amounts += 1,
            _ if derivation.inconsistent => {
                stats.inconsistent_amounts += 1;
                let expected = derivation.expected.unwrap_or(Decimal::ZERO);
                warn!(
                    sheet = %sheet.name,
                    row = extracted.row,
                    provided = %derivation.billing_amount,
                    expected = %expected,
                    "billing amount differs from hours x rate"
                );
                let col = located
                    .mappings
                    .iter()
                    .find(|m| m.role == FieldRole::BillingAmount)
                    .map(|m| m.column)
                    .unwrap_or(1);
                diagnostics.push(Diagnostic::cell(
                    DiagnosticKind::AmountInconsistent,
                    &sheet.name,
                    extracted.row,
                    col,
                    format!(
                        "billing amount {} differs from hours x rate {}",
                        derivation.billing_amount, expected
                    ),
                    Severity::Warning,
                ));
            }
            _ => {}
        }

        let record = PayrollRecord {
            employee_id: fields.employee_id.clone(),
            period: fields.period,
            work_hours: fields.work_hours.unwrap_or(Decimal::ZERO),
            billing_amount: derivation.billing_amount,
            provenance: Provenance {
                sheet: sheet.name.clone(),
                sheet_index: sheet.index,
                row: extracted.row,
                amount_source: derivation.source,
                inconsistent: derivation.inconsistent,
            },
        };
        rows.push(RecordRow { record, fields });
    }

    stats.template_id = located.template_id;
    stats.header_row = Some(located.header_row);
    stats.header_confidence = Some(located.confidence);
    stats.mappings = located.mappings;
    stats.rows_scanned = extraction.rows_scanned;
    stats.records_extracted = rows.len();
    stats.records_rejected = extraction.rejected.values().sum();

    debug!(
        sheet = %sheet.name,
        scanned = stats.rows_scanned,
        extracted = stats.records_extracted,
        rejected = stats.records_rejected,
        "sheet processed"
    );

    SheetOutcome {
        stats,
        rejected: extraction.rejected,
        rows,
        diagnostics,
    }
}

fn locate(
    ctx: &PipelineContext<'_>,
    sheet: &Sheet,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Located, (SkipReason, String)> {
    if ctx.mode == ParseMode::FixedTemplate {
        if let Some(template) = match_template(&ctx.config.templates, sheet) {
            diagnostics.push(Diagnostic::sheet(
                DiagnosticKind::TemplateMatched,
                &sheet.name,
                format!("template '{}' matched", template.id),
                Severity::Info,
            ));
            return Ok(Located {
                mappings: template.mappings(sheet),
                header_row: template.header_row,
                data_start_row: template.header_row.saturating_add(1),
                confidence: 1.0,
                template_id: Some(template.id.clone()),
            });
        }
        if !ctx.config.template_fallback {
            return Err((
                SkipReason::TemplateNotMatched,
                format!(
                    "none of {} template(s) matched the sentinel cells",
                    ctx.config.templates.len()
                ),
            ));
        }
        diagnostics.push(Diagnostic::sheet(
            DiagnosticKind::TemplateFallback,
            &sheet.name,
            "no template matched; detecting the header instead",
            Severity::Info,
        ));
    }

    let detector = HeaderDetector::new(ctx.dictionary, ctx.config.header_settings(&sheet.name));
    match detector.detect(sheet) {
        Ok(header) => {
            let roles: Vec<&str> = header.mappings.iter().map(|m| m.role.as_str()).collect();
            debug!(
                sheet = %sheet.name,
                row = header.header_row,
                confidence = header.confidence,
                "header detected"
            );
            diagnostics.push(Diagnostic::sheet(
                DiagnosticKind::HeaderDetected,
                &sheet.name,
                format!(
                    "header at row {} (confidence {:.2}): {}",
                    header.header_row,
                    header.confidence,
                    roles.join(", ")
                ),
                Severity::Info,
            ));
            for conflict in &header.conflicts {
                warn!(
                    sheet = %sheet.name,
                    role = %conflict.role,
                    kept = conflict.kept_column,
                    dropped = conflict.dropped_column,
                    "columns compete for one field"
                );
                diagnostics.push(Diagnostic::cell(
                    DiagnosticKind::RoleConflict,
                    &sheet.name,
                    header.header_row,
                    conflict.dropped_column,
                    format!(
                        "{} also matched here ({:.2}); column {} kept ({:.2})",
                        conflict.role,
                        conflict.dropped_confidence,
                        column_letters(conflict.kept_column),
                        conflict.kept_confidence
                    ),
                    Severity::Warning,
                ));
            }
            Ok(Located {
                mappings: header.mappings,
                header_row: header.header_row,
                data_start_row: header.data_start_row,
                confidence: header.confidence,
                template_id: None,
            })
        }
        Err(miss) => Err((SkipReason::HeaderNotFound, miss.to_string())),
    }
}
