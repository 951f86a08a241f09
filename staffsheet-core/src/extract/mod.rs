//! Row extraction below a detected header.
//!
//! The extractor walks data rows until a run of structurally empty rows (or
//! the end of the sheet), coerces every mapped cell and either produces a
//! [`RowFields`] or rejects the row with a [`RejectReason`].

pub mod coerce;
pub mod period;

use self::coerce::{Coerced, coerce_date, coerce_decimal, coerce_gender, coerce_text};
use self::period::period_from_cell;
use crate::diagnostic::{Diagnostic, DiagnosticKind, Severity};
use crate::header::labels::{LabelDictionary, normalize_label};
use crate::model::{ColumnMapping, FieldRole, Gender, Period};
use crate::reader::{CellValue, Sheet};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Why a non-empty data row produced no record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RejectReason {
    #[serde(rename = "missing key field")]
    MissingKeyField,
    #[serde(rename = "summary row")]
    SummaryRow,
    #[serde(rename = "repeated header")]
    RepeatedHeader,
    #[serde(rename = "blacklisted id")]
    BlacklistedId,
    #[serde(rename = "invalid required value")]
    InvalidRequiredValue,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MissingKeyField => "missing key field",
            RejectReason::SummaryRow => "summary row",
            RejectReason::RepeatedHeader => "repeated header",
            RejectReason::BlacklistedId => "blacklisted id",
            RejectReason::InvalidRequiredValue => "invalid required value",
        }
    }

    fn diagnostic_kind(&self) -> DiagnosticKind {
        match self {
            RejectReason::MissingKeyField => DiagnosticKind::MissingKeyField,
            RejectReason::SummaryRow => DiagnosticKind::SummaryRow,
            RejectReason::RepeatedHeader => DiagnosticKind::RepeatedHeader,
            RejectReason::BlacklistedId => DiagnosticKind::BlacklistedId,
            RejectReason::InvalidRequiredValue => DiagnosticKind::InvalidRequiredValue,
        }
    }

    fn severity(&self) -> Severity {
        match self {
            RejectReason::MissingKeyField | RejectReason::InvalidRequiredValue => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed facts of one accepted row
#[derive(Debug, Clone, PartialEq)]
pub struct RowFields {
    /// Employee id, or the name when the sheet has no id column
    pub employee_id: String,
    pub name: Option<String>,
    pub dispatch_company: Option<String>,
    pub department: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub hourly_rate: Option<Decimal>,
    pub billing_rate: Option<Decimal>,
    pub work_hours: Option<Decimal>,
    pub billing_amount: Option<Decimal>,
    pub period: Period,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRow {
    /// 1-based sheet row
    pub row: u32,
    pub fields: RowFields,
}

/// Everything the extractor learned from one sheet
#[derive(Debug, Clone, Default)]
pub struct SheetExtraction {
    pub rows: Vec<ExtractedRow>,
    /// Non-empty data rows examined
    pub rows_scanned: usize,
    pub rejected: BTreeMap<RejectReason, usize>,
    pub diagnostics: Vec<Diagnostic>,
}

impl SheetExtraction {
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }
}

/// Row-level rules shared by every sheet of a parse
#[derive(Debug, Clone, Copy)]
pub struct ExtractSettings<'a> {
    pub blank_run_threshold: u32,
    pub sentinel_ids: &'a [String],
    pub summary_labels: &'a [String],
    pub required_roles: &'a [FieldRole],
    pub dictionary: &'a LabelDictionary,
}

/// Walks the data region of one sheet
pub struct RowExtractor<'a> {
    sheet: &'a Sheet,
    columns: BTreeMap<FieldRole, u32>,
    data_start_row: u32,
    settings: ExtractSettings<'a>,
    /// Period for rows without a usable period cell
    context_period: Option<Period>,
}

impl<'a> RowExtractor<'a> {
    pub fn new(
        sheet: &'a Sheet,
        mappings: &[ColumnMapping],
        data_start_row: u32,
        settings: ExtractSettings<'a>,
        context_period: Option<Period>,
    ) -> Self {
        Self {
            sheet,
            columns: mappings.iter().map(|m| (m.role, m.column)).collect(),
            data_start_row,
            settings,
            context_period,
        }
    }

    pub fn extract(&self) -> SheetExtraction {
        let mut out = SheetExtraction::default();
        let mut blank_run = 0;

        for row in self.data_start_row.max(1)..=self.sheet.height() {
            if self.is_structurally_empty(row) {
                blank_run += 1;
                if blank_run >= self.settings.blank_run_threshold {
                    debug!(sheet = %self.sheet.name, row, "blank run ends data region");
                    break;
                }
                continue;
            }
            blank_run = 0;
            out.rows_scanned += 1;

            match self.extract_row(row, &mut out.diagnostics) {
                Ok(fields) => out.rows.push(ExtractedRow { row, fields }),
                Err((reason, col, message)) => {
                    debug!(sheet = %self.sheet.name, row, reason = %reason, "row rejected");
                    *out.rejected.entry(reason).or_insert(0) += 1;
                    out.diagnostics.push(Diagnostic::cell(
                        reason.diagnostic_kind(),
                        &self.sheet.name,
                        row,
                        col,
                        message,
                        reason.severity(),
                    ));
                }
            }
        }

        out
    }

    fn is_structurally_empty(&self, row: u32) -> bool {
        self.columns
            .values()
            .all(|&col| self.sheet.value(row, col).is_blank())
    }

    fn cell(&self, row: u32, role: FieldRole) -> Option<(u32, &CellValue)> {
        let col = *self.columns.get(&role)?;
        Some((col, self.sheet.value(row, col)))
    }

    fn key_role(&self) -> FieldRole {
        if self.columns.contains_key(&FieldRole::EmployeeId) {
            FieldRole::EmployeeId
        } else {
            FieldRole::Name
        }
    }

    fn is_required(&self, role: FieldRole) -> bool {
        self.settings.required_roles.contains(&role)
    }

    fn extract_row(
        &self,
        row: u32,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<RowFields, (RejectReason, u32, String)> {
        let key_role = self.key_role();
        let key_col = self.columns.get(&key_role).copied().unwrap_or(1);

        self.check_noise_row(row)?;

        let employee_id = self
            .cell(row, key_role)
            .and_then(|(_, v)| coerce_text(v))
            .ok_or_else(|| {
                (
                    RejectReason::MissingKeyField,
                    key_col,
                    format!("{} is empty", key_role),
                )
            })?;

        if self
            .settings
            .sentinel_ids
            .iter()
            .any(|s| s.trim() == employee_id)
        {
            return Err((
                RejectReason::BlacklistedId,
                key_col,
                format!("employee id '{}' is blacklisted", employee_id),
            ));
        }

        let period = self.period(row, diagnostics).ok_or_else(|| {
            (
                RejectReason::MissingKeyField,
                self.columns
                    .get(&FieldRole::Period)
                    .copied()
                    .unwrap_or(key_col),
                "no period in the row, sheet or configuration".to_string(),
            )
        })?;

        Ok(RowFields {
            employee_id,
            name: self.text(row, FieldRole::Name)?,
            dispatch_company: self.text(row, FieldRole::DispatchCompany)?,
            department: self.text(row, FieldRole::Department)?,
            hire_date: self.date(row, FieldRole::HireDate, diagnostics)?,
            birth_date: self.date(row, FieldRole::BirthDate, diagnostics)?,
            gender: self.gender(row, diagnostics)?,
            hourly_rate: self.decimal(row, FieldRole::HourlyRate, diagnostics)?,
            billing_rate: self.decimal(row, FieldRole::BillingRate, diagnostics)?,
            work_hours: self.decimal(row, FieldRole::WorkHours, diagnostics)?,
            billing_amount: self.decimal(row, FieldRole::BillingAmount, diagnostics)?,
            period,
        })
    }

    /// Subtotal lines and header lines repeated inside the data region
    fn check_noise_row(&self, row: u32) -> Result<(), (RejectReason, u32, String)> {
        let mut probes: Vec<(u32, &str)> = [FieldRole::EmployeeId, FieldRole::Name]
            .into_iter()
            .filter_map(|role| self.cell(row, role))
            .filter_map(|(col, v)| v.as_text().map(|s| (col, s)))
            .collect();
        if let Some(first) = self
            .sheet
            .cells_in_row(row)
            .iter()
            .find(|c| !c.value.is_blank())
        {
            if let Some(text) = first.value.as_text() {
                probes.push((first.col, text));
            }
        }

        for (col, text) in probes {
            let normalized = normalize_label(text);
            if self
                .settings
                .summary_labels
                .iter()
                .any(|label| is_summary_text(&normalized, &normalize_label(label)))
            {
                return Err((
                    RejectReason::SummaryRow,
                    col,
                    format!("'{}' marks a summary row", text.trim()),
                ));
            }
            if self
                .settings
                .dictionary
                .classify_whole(text)
                .is_some_and(|m| m.role.is_identity())
            {
                return Err((
                    RejectReason::RepeatedHeader,
                    col,
                    format!("'{}' repeats the header", text.trim()),
                ));
            }
        }
        Ok(())
    }

    fn text(&self, row: u32, role: FieldRole) -> Result<Option<String>, (RejectReason, u32, String)> {
        let Some((col, value)) = self.cell(row, role) else {
            return Ok(None);
        };
        let text = coerce_text(value);
        if text.is_none() && self.is_required(role) {
            return Err(missing_required(role, col));
        }
        Ok(text)
    }

    fn decimal(
        &self,
        row: u32,
        role: FieldRole,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Option<Decimal>, (RejectReason, u32, String)> {
        let Some((col, value)) = self.cell(row, role) else {
            return Ok(None);
        };
        self.settle(row, col, role, coerce_decimal(value, role), diagnostics)
    }

    fn date(
        &self,
        row: u32,
        role: FieldRole,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Option<NaiveDate>, (RejectReason, u32, String)> {
        let Some((col, value)) = self.cell(row, role) else {
            return Ok(None);
        };
        self.settle(row, col, role, coerce_date(value), diagnostics)
    }

    fn gender(
        &self,
        row: u32,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Option<Gender>, (RejectReason, u32, String)> {
        let role = FieldRole::Gender;
        let Some((col, value)) = self.cell(row, role) else {
            return Ok(None);
        };
        let coerced = if value.is_blank() {
            Coerced::Absent
        } else {
            match coerce_gender(value) {
                Some(g) => Coerced::Value(g),
                None => Coerced::Invalid(format!("'{}' is not a gender", value.display_text())),
            }
        };
        self.settle(row, col, role, coerced, diagnostics)
    }

    /// Turn a coerced field into a value, an absent field, or a rejection
    fn settle<T>(
        &self,
        row: u32,
        col: u32,
        role: FieldRole,
        coerced: Coerced<T>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Option<T>, (RejectReason, u32, String)> {
        match coerced {
            Coerced::Value(v) => Ok(Some(v)),
            Coerced::Absent if self.is_required(role) => Err(missing_required(role, col)),
            Coerced::Absent => Ok(None),
            Coerced::Invalid(reason) if self.is_required(role) => Err((
                RejectReason::InvalidRequiredValue,
                col,
                format!("{}: {}", role, reason),
            )),
            Coerced::Invalid(reason) => {
                diagnostics.push(Diagnostic::cell(
                    DiagnosticKind::InvalidFieldValue,
                    &self.sheet.name,
                    row,
                    col,
                    format!("{} ignored: {}", role, reason),
                    Severity::Warning,
                ));
                Ok(None)
            }
        }
    }

    fn period(&self, row: u32, diagnostics: &mut Vec<Diagnostic>) -> Option<Period> {
        if let Some((col, value)) = self.cell(row, FieldRole::Period) {
            if !value.is_blank() {
                match period_from_cell(value) {
                    Some(period) => return Some(period),
                    None => diagnostics.push(Diagnostic::cell(
                        DiagnosticKind::InvalidFieldValue,
                        &self.sheet.name,
                        row,
                        col,
                        format!("period '{}' not recognized", value.display_text()),
                        Severity::Warning,
                    )),
                }
            }
        }
        self.context_period
    }
}

/// Summary labels of two or more characters also match as a prefix or
/// suffix (`小計(a社)`, `総合計`); single-character ones only match whole.
fn is_summary_text(normalized: &str, label: &str) -> bool {
    if label.is_empty() {
        return false;
    }
    normalized == label
        || (label.chars().count() >= 2
            && (normalized.starts_with(label) || normalized.ends_with(label)))
}

fn missing_required(role: FieldRole, col: u32) -> (RejectReason, u32, String) {
    (
        RejectReason::InvalidRequiredValue,
        col,
        format!("required {} is empty", role),
    )
}
