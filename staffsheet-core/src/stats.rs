//! Parse statistics: per-sheet counts merged into one snapshot per parse.

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::extract::RejectReason;
use crate::filter::SkipReason;
use crate::model::ColumnMapping;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetStatus {
    Processed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSheet {
    pub sheet: String,
    pub reason: SkipReason,
}

/// Counts and header facts of one sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetStats {
    /// 0-based position in the workbook
    pub index: usize,
    pub name: String,
    pub status: SheetStatus,
    pub skip_reason: Option<SkipReason>,
    /// Template used in fixed-template mode
    pub template_id: Option<String>,
    pub header_row: Option<u32>,
    pub header_confidence: Option<f64>,
    pub mappings: Vec<ColumnMapping>,
    pub rows_scanned: usize,
    pub records_extracted: usize,
    pub records_rejected: usize,
    pub derived_amounts: usize,
    pub inconsistent_amounts: usize,
}

impl SheetStats {
    pub fn skipped(index: usize, name: &str, reason: SkipReason) -> Self {
        Self {
            index,
            name: name.to_string(),
            status: SheetStatus::Skipped,
            skip_reason: Some(reason),
            template_id: None,
            header_row: None,
            header_confidence: None,
            mappings: Vec::new(),
            rows_scanned: 0,
            records_extracted: 0,
            records_rejected: 0,
            derived_amounts: 0,
            inconsistent_amounts: 0,
        }
    }

    pub fn processed(index: usize, name: &str) -> Self {
        Self {
            status: SheetStatus::Processed,
            skip_reason: None,
            ..Self::skipped(index, name, SkipReason::Empty)
        }
    }
}

/// Snapshot of one parse call.
///
/// `Default` is the all-zero snapshot reported before any parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseStats {
    pub sheets_total: usize,
    pub sheets_processed: usize,
    pub sheets_skipped: usize,
    pub skipped: Vec<SkippedSheet>,
    pub rows_scanned: usize,
    pub records_extracted: usize,
    pub records_rejected: usize,
    pub rejection_reasons: BTreeMap<RejectReason, usize>,
    pub derived_amounts: usize,
    pub inconsistent_amounts: usize,
    pub sheets: Vec<SheetStats>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseStats {
    pub fn sheet(&self, name: &str) -> Option<&SheetStats> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn skip_reason(&self, name: &str) -> Option<SkipReason> {
        self.skipped
            .iter()
            .find(|s| s.sheet == name)
            .map(|s| s.reason)
    }

    pub fn header_confidence(&self, name: &str) -> Option<f64> {
        self.sheet(name).and_then(|s| s.header_confidence)
    }

    pub fn rejected_for(&self, reason: RejectReason) -> usize {
        self.rejection_reasons.get(&reason).copied().unwrap_or(0)
    }

    /// Every sheet was skipped: a layout/detection problem rather than a data
    /// quality one
    pub fn all_sheets_skipped(&self) -> bool {
        self.sheets_total > 0 && self.sheets_skipped == self.sheets_total
    }

    pub fn diagnostics_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }

    /// Counting invariants that must hold for every snapshot
    pub fn is_consistent(&self) -> bool {
        self.sheets_processed + self.sheets_skipped == self.sheets_total
            && self.skipped.len() == self.sheets_skipped
            && self.rows_scanned >= self.records_extracted
            && self
                .sheets
                .iter()
                .all(|s| s.rows_scanned >= s.records_extracted)
            && self.rejection_reasons.values().sum::<usize>() == self.records_rejected
    }
}

/// Merges independently computed sheet results in workbook order
#[derive(Debug)]
pub struct StatsAccumulator {
    stats: ParseStats,
}

impl StatsAccumulator {
    pub fn new(sheets_total: usize) -> Self {
        Self {
            stats: ParseStats {
                sheets_total,
                ..ParseStats::default()
            },
        }
    }

    pub fn add_sheet(
        &mut self,
        sheet: SheetStats,
        rejected: &BTreeMap<RejectReason, usize>,
        diagnostics: Vec<Diagnostic>,
    ) {
        let stats = &mut self.stats;
        match sheet.status {
            SheetStatus::Processed => stats.sheets_processed += 1,
            SheetStatus::Skipped => {
                stats.sheets_skipped += 1;
                if let Some(reason) = sheet.skip_reason {
                    stats.skipped.push(SkippedSheet {
                        sheet: sheet.name.clone(),
                        reason,
                    });
                }
            }
        }

        stats.rows_scanned += sheet.rows_scanned;
        stats.records_extracted += sheet.records_extracted;
        stats.records_rejected += sheet.records_rejected;
        stats.derived_amounts += sheet.derived_amounts;
        stats.inconsistent_amounts += sheet.inconsistent_amounts;
        for (reason, count) in rejected {
            *stats.rejection_reasons.entry(*reason).or_insert(0) += count;
        }
        stats.diagnostics.extend(diagnostics);
        stats.sheets.push(sheet);
    }

    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.stats.diagnostics.push(diagnostic);
    }

    /// Diagnostics end up book first, then per sheet in workbook order
    pub fn finish(mut self) -> ParseStats {
        let positions: HashMap<&str, usize> = self
            .stats
            .sheets
            .iter()
            .map(|s| (s.name.as_str(), s.index))
            .collect();
        let position = |d: &Diagnostic| {
            d.scope
                .sheet_name()
                .map(|name| positions.get(name).copied().unwrap_or(usize::MAX))
        };
        // Stable: cell diagnostics of one sheet keep row order
        self.stats
            .diagnostics
            .sort_by(|a, b| position(a).cmp(&position(b)).then_with(|| a.scope.cmp(&b.scope)));
        self.stats
    }
}
