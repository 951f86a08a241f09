//! Diagnostic reporting with hierarchical scope (book, sheet, cell)

use crate::reader::cell_ref::column_letters;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Severity level of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Scope of a diagnostic (book, sheet, or cell level)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticScope {
    /// Book-level diagnostic
    Book,
    /// Sheet-level diagnostic
    Sheet(String),
    /// Cell-level diagnostic
    Cell(String, CellReference),
}

impl DiagnosticScope {
    /// Get the sheet name if this is a sheet or cell scope
    pub fn sheet_name(&self) -> Option<&str> {
        match self {
            DiagnosticScope::Book => None,
            DiagnosticScope::Sheet(name) => Some(name),
            DiagnosticScope::Cell(name, _) => Some(name),
        }
    }
}

impl PartialOrd for DiagnosticScope {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DiagnosticScope {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (DiagnosticScope::Book, DiagnosticScope::Book) => Ordering::Equal,
            (DiagnosticScope::Book, _) => Ordering::Less,
            (_, DiagnosticScope::Book) => Ordering::Greater,
            (DiagnosticScope::Sheet(a), DiagnosticScope::Sheet(b)) => a.cmp(b),
            (DiagnosticScope::Sheet(_), DiagnosticScope::Cell(_, _)) => Ordering::Less,
            (DiagnosticScope::Cell(_, _), DiagnosticScope::Sheet(_)) => Ordering::Greater,
            (DiagnosticScope::Cell(sheet_a, cell_a), DiagnosticScope::Cell(sheet_b, cell_b)) => {
                sheet_a.cmp(sheet_b).then_with(|| cell_a.cmp(cell_b))
            }
        }
    }
}

/// Cell reference with 1-based row and column (e.g., A1, B2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellReference {
    pub row: u32,
    pub col: u32,
}

impl CellReference {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Convert to Excel-style reference (e.g., "A1")
    pub fn to_excel_ref(&self) -> String {
        format!("{}{}", column_letters(self.col), self.row)
    }
}

impl PartialOrd for CellReference {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellReference {
    fn cmp(&self, other: &Self) -> Ordering {
        self.row.cmp(&other.row).then_with(|| self.col.cmp(&other.col))
    }
}

impl std::fmt::Display for CellReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_excel_ref())
    }
}

/// What a diagnostic is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    SkipListed,
    EmptySheet,
    HiddenSheet,
    HeaderNotFound,
    HeaderDetected,
    TemplateMatched,
    TemplateNotMatched,
    TemplateFallback,
    RoleConflict,
    MissingKeyField,
    SummaryRow,
    RepeatedHeader,
    BlacklistedId,
    InvalidRequiredValue,
    InvalidFieldValue,
    AmountInconsistent,
    EmployeeMismatch,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::SkipListed => "skip-listed",
            DiagnosticKind::EmptySheet => "empty-sheet",
            DiagnosticKind::HiddenSheet => "hidden-sheet",
            DiagnosticKind::HeaderNotFound => "header-not-found",
            DiagnosticKind::HeaderDetected => "header-detected",
            DiagnosticKind::TemplateMatched => "template-matched",
            DiagnosticKind::TemplateNotMatched => "template-not-matched",
            DiagnosticKind::TemplateFallback => "template-fallback",
            DiagnosticKind::RoleConflict => "role-conflict",
            DiagnosticKind::MissingKeyField => "missing-key-field",
            DiagnosticKind::SummaryRow => "summary-row",
            DiagnosticKind::RepeatedHeader => "repeated-header",
            DiagnosticKind::BlacklistedId => "blacklisted-id",
            DiagnosticKind::InvalidRequiredValue => "invalid-required-value",
            DiagnosticKind::InvalidFieldValue => "invalid-field-value",
            DiagnosticKind::AmountInconsistent => "amount-inconsistent",
            DiagnosticKind::EmployeeMismatch => "employee-mismatch",
        }
    }
}

/// A single finding made while parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Scope of the diagnostic
    pub scope: DiagnosticScope,
    /// Human-readable message
    pub message: String,
    /// Severity level
    pub severity: Severity,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        scope: DiagnosticScope,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            kind,
            scope,
            message: message.into(),
            severity,
        }
    }

    pub fn sheet(
        kind: DiagnosticKind,
        sheet: &str,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self::new(
            kind,
            DiagnosticScope::Sheet(sheet.to_string()),
            message,
            severity,
        )
    }

    pub fn cell(
        kind: DiagnosticKind,
        sheet: &str,
        row: u32,
        col: u32,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self::new(
            kind,
            DiagnosticScope::Cell(sheet.to_string(), CellReference::new(row, col)),
            message,
            severity,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_reference_rendering() {
        assert_eq!(CellReference::new(1, 1).to_excel_ref(), "A1");
        assert_eq!(CellReference::new(12, 28).to_string(), "AB12");
    }

    #[test]
    fn test_scope_ordering_is_hierarchical() {
        let mut scopes = vec![
            DiagnosticScope::Cell("B".to_string(), CellReference::new(2, 1)),
            DiagnosticScope::Sheet("B".to_string()),
            DiagnosticScope::Cell("A".to_string(), CellReference::new(9, 1)),
            DiagnosticScope::Book,
            DiagnosticScope::Cell("A".to_string(), CellReference::new(3, 4)),
        ];
        scopes.sort();

        assert_eq!(scopes[0], DiagnosticScope::Book);
        assert_eq!(scopes[1], DiagnosticScope::Sheet("B".to_string()));
        assert_eq!(
            scopes[2],
            DiagnosticScope::Cell("A".to_string(), CellReference::new(3, 4))
        );
        assert_eq!(
            scopes[4],
            DiagnosticScope::Cell("B".to_string(), CellReference::new(2, 1))
        );
    }

    #[test]
    fn test_constructors_set_scope() {
        let d = Diagnostic::cell(
            DiagnosticKind::InvalidFieldValue,
            "3月",
            5,
            3,
            "not a number",
            Severity::Info,
        );
        assert_eq!(d.scope.sheet_name(), Some("3月"));
        assert!(matches!(d.scope, DiagnosticScope::Cell(_, r) if r.to_excel_ref() == "C5"));

        let d = Diagnostic::sheet(
            DiagnosticKind::EmptySheet,
            "空",
            "no data",
            Severity::Info,
        );
        assert_eq!(d.scope, DiagnosticScope::Sheet("空".to_string()));
    }
}
