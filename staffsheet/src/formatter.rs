//! Output formatters for parse results

use anyhow::Result;
use colored::*;
use staffsheet_core::stats::SheetStatus;
use staffsheet_core::{Diagnostic, DiagnosticScope, ParseOutcome, Severity};
use std::path::Path;

/// Print the outcome in human-readable format with colors and hierarchy
pub fn print_human(file_path: &Path, outcome: &ParseOutcome, show_records: bool) {
    let stats = &outcome.stats;
    println!("{}", format!("Parsing: {}", file_path.display()).bold());
    println!();

    println!("{}", "Sheets:".bold().underline());
    for sheet in &stats.sheets {
        match sheet.status {
            SheetStatus::Processed => {
                let header = match (&sheet.template_id, sheet.header_row) {
                    (Some(id), Some(row)) => format!("template {} (row {})", id, row),
                    (None, Some(row)) => format!(
                        "header row {} ({:.2})",
                        row,
                        sheet.header_confidence.unwrap_or(0.0)
                    ),
                    _ => String::new(),
                };
                println!(
                    "  {} {} {} scanned {}, extracted {}, rejected {}",
                    "✓".green().bold(),
                    sheet.name.cyan().bold(),
                    header.bright_black(),
                    sheet.rows_scanned,
                    sheet.records_extracted.to_string().green(),
                    sheet.records_rejected
                );
            }
            SheetStatus::Skipped => {
                let reason = sheet
                    .skip_reason
                    .map(|r| r.to_string())
                    .unwrap_or_default();
                println!(
                    "  {} {} {}",
                    "-".bright_black(),
                    sheet.name.cyan(),
                    format!("skipped: {}", reason).bright_black()
                );
            }
        }
    }
    println!();

    if !stats.rejection_reasons.is_empty() {
        println!("{}", "Rejected rows:".bold().underline());
        for (reason, count) in &stats.rejection_reasons {
            println!("  {:<24} {}", reason.to_string(), count);
        }
        println!();
    }

    print_diagnostics(&stats.diagnostics);

    if show_records && !outcome.records.is_empty() {
        println!("{}", "Records:".bold().underline());
        for record in &outcome.records {
            let marker = if record.is_derived() {
                " (derived)".bright_black().to_string()
            } else if record.provenance.inconsistent {
                " (inconsistent)".yellow().to_string()
            } else {
                String::new()
            };
            println!(
                "  {} {:<12} {}  hours {:>8}  amount {:>12}{}  {}",
                record.period,
                record.employee_id,
                "|".bright_black(),
                record.work_hours,
                record.billing_amount,
                marker,
                format!("{}!{}", record.provenance.sheet, record.provenance.row).bright_black()
            );
        }
        println!();
    }

    println!("{}", "Summary:".bold().underline());
    println!(
        "  {} {} of {} ({} skipped)",
        "Sheets processed:".bold(),
        stats.sheets_processed,
        stats.sheets_total,
        stats.sheets_skipped
    );
    println!("  {} {}", "Rows scanned:".bold(), stats.rows_scanned);
    let extracted = format!("{}", stats.records_extracted);
    if stats.records_extracted > 0 {
        println!("  {} {}", "Records:".green().bold(), extracted);
    } else {
        println!("  {} {}", "Records:".red().bold(), extracted);
    }
    if stats.records_rejected > 0 {
        println!("  {} {}", "Rejected:".yellow().bold(), stats.records_rejected);
    }
    if stats.derived_amounts > 0 {
        println!("  {} {}", "Derived amounts:".blue().bold(), stats.derived_amounts);
    }
    if stats.inconsistent_amounts > 0 {
        println!(
            "  {} {}",
            "Inconsistent amounts:".yellow().bold(),
            stats.inconsistent_amounts
        );
    }
    println!("  {} {}", "Employees:".bold(), outcome.employees.len());
}

/// Warnings and errors grouped book, sheet, then cell
struct SheetGroup<'a> {
    name: &'a str,
    sheet: Vec<&'a Diagnostic>,
    cells: Vec<(String, Vec<&'a Diagnostic>)>,
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    let notable: Vec<&Diagnostic> = diagnostics
        .iter()
        .filter(|d| d.severity >= Severity::Warning)
        .collect();
    if notable.is_empty() {
        return;
    }

    // Groups keep first-seen order
    let mut book = Vec::new();
    let mut sheets: Vec<SheetGroup> = Vec::new();
    for diagnostic in notable {
        let sheet_name = match diagnostic.scope.sheet_name() {
            Some(name) => name,
            None => {
                book.push(diagnostic);
                continue;
            }
        };
        let position = match sheets.iter().position(|g| g.name == sheet_name) {
            Some(position) => position,
            None => {
                sheets.push(SheetGroup {
                    name: sheet_name,
                    sheet: Vec::new(),
                    cells: Vec::new(),
                });
                sheets.len() - 1
            }
        };
        let group = &mut sheets[position];
        match &diagnostic.scope {
            DiagnosticScope::Cell(_, cell_ref) => {
                let cell_ref = cell_ref.to_string();
                match group.cells.iter_mut().find(|(r, _)| *r == cell_ref) {
                    Some((_, diagnostics)) => diagnostics.push(diagnostic),
                    None => group.cells.push((cell_ref, vec![diagnostic])),
                }
            }
            _ => group.sheet.push(diagnostic),
        }
    }

    println!("{}", "Diagnostics:".bold().underline());
    for diagnostic in book {
        print_diagnostic(diagnostic, 1);
    }
    for group in &sheets {
        println!("  {} {}", "Sheet:".bold(), group.name.cyan().bold());
        for diagnostic in &group.sheet {
            print_diagnostic(diagnostic, 2);
        }
        for (cell_ref, diagnostics) in &group.cells {
            println!("    {} {}", "Cell:".bold(), cell_ref.yellow());
            for diagnostic in diagnostics {
                print_diagnostic(diagnostic, 3);
            }
        }
    }
    println!();
}

fn print_diagnostic(diagnostic: &Diagnostic, indent: usize) {
    let indent_str = "  ".repeat(indent);
    let severity_str = match diagnostic.severity {
        Severity::Error => "ERROR".red().bold(),
        Severity::Warning => "WARN".yellow().bold(),
        Severity::Info => "INFO".blue().bold(),
    };

    println!(
        "{}{} [{}] {}",
        indent_str,
        severity_str,
        diagnostic.kind.as_str().bright_black(),
        diagnostic.message
    );
}

/// Print the outcome in JSON format
pub fn print_json(file_path: &Path, outcome: &ParseOutcome) -> Result<()> {
    let output = serde_json::json!({
        "file": file_path.display().to_string(),
        "stats": outcome.stats,
        "employees": outcome.employees,
        "records": outcome.records,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
