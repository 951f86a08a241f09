mod common;

use common::{SheetSpec, blank, build_xlsx, id_rows, num, payroll_rows, text};
use rust_decimal::Decimal;
use staffsheet_core::{
    AmountSource, DiagnosticKind, ParseMode, ParserConfig, PayrollParser, RejectReason,
    SkipReason, WorkbookLoadError,
};

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn full_month(count: usize) -> Vec<(f64, Option<f64>)> {
    (0..count)
        .map(|i| {
            let hours = 150.0 + i as f64;
            (hours, Some(hours * 1700.0))
        })
        .collect()
}

#[test]
fn test_skip_listed_sheet_yields_nothing() -> anyhow::Result<()> {
    let content = build_xlsx(&[
        SheetSpec::new("集計", payroll_rows(&full_month(4))),
        SheetSpec::new("2024年4月", payroll_rows(&full_month(2))),
    ])?;

    let mut parser = PayrollParser::new();
    let records = parser.parse(&content, ParseMode::Intelligent)?;
    let stats = parser.parsing_stats();

    assert_eq!(stats.skip_reason("集計"), Some(SkipReason::SkipListed));
    assert!(records.iter().all(|r| r.provenance.sheet != "集計"));
    assert_eq!(records.len(), 2);
    assert_eq!(stats.sheets_total, 2);
    assert_eq!(stats.sheets_skipped, 1);
    assert!(stats.is_consistent());
    Ok(())
}

#[test]
fn test_header_below_title_rows() -> anyhow::Result<()> {
    let content = build_xlsx(&[SheetSpec::new("2024年4月", payroll_rows(&full_month(12)))])?;

    let mut parser = PayrollParser::new();
    let records = parser.parse(&content, ParseMode::Intelligent)?;
    let stats = parser.parsing_stats();

    assert_eq!(records.len(), 12);
    assert_eq!(stats.rows_scanned, 12);
    assert_eq!(stats.records_rejected, 0);

    let sheet = stats.sheet("2024年4月").unwrap();
    assert_eq!(sheet.header_row, Some(3));
    assert!(stats.header_confidence("2024年4月").unwrap() >= 0.5);

    let first = &records[0];
    assert_eq!(first.employee_id, "佐藤 花子1");
    assert_eq!(first.period.to_string(), "2024-04");
    assert_eq!(first.work_hours, dec("150"));
    assert_eq!(first.billing_amount, dec("255000"));
    assert_eq!(first.provenance.amount_source, AmountSource::Provided);
    assert_eq!(first.provenance.row, 4);

    assert_eq!(parser.employees().len(), 12);
    assert_eq!(parser.employees()[0].billing_rate, dec("1700"));
    Ok(())
}

#[test]
fn test_blank_amount_is_derived() -> anyhow::Result<()> {
    let content = build_xlsx(&[SheetSpec::new(
        "2024年4月",
        payroll_rows(&[(160.0, None), (0.0, None), (120.5, Some(204850.0))]),
    )])?;

    let mut parser = PayrollParser::new();
    let records = parser.parse(&content, ParseMode::Intelligent)?;

    assert_eq!(records[0].billing_amount, dec("272000"));
    assert_eq!(records[0].provenance.amount_source, AmountSource::Derived);
    assert!(records[0].is_derived());

    // Zero hours: nothing to derive from
    assert_eq!(records[1].billing_amount, Decimal::ZERO);
    assert_eq!(records[1].provenance.amount_source, AmountSource::Absent);

    assert_eq!(records[2].billing_amount, dec("204850"));
    assert_eq!(records[2].provenance.amount_source, AmountSource::Provided);
    assert!(!records[2].provenance.inconsistent);

    assert_eq!(parser.parsing_stats().derived_amounts, 1);
    Ok(())
}

#[test]
fn test_inconsistent_amount_is_kept_and_flagged() -> anyhow::Result<()> {
    let content = build_xlsx(&[SheetSpec::new(
        "2024年4月",
        payroll_rows(&[(160.0, Some(300000.0))]),
    )])?;

    let mut parser = PayrollParser::new();
    let records = parser.parse(&content, ParseMode::Intelligent)?;
    let stats = parser.parsing_stats();

    assert_eq!(records[0].billing_amount, dec("300000"));
    assert!(records[0].provenance.inconsistent);
    assert_eq!(stats.inconsistent_amounts, 1);
    assert_eq!(stats.diagnostics_of(DiagnosticKind::AmountInconsistent).count(), 1);
    Ok(())
}

#[test]
fn test_sheet_without_header_is_skipped() -> anyhow::Result<()> {
    let rows = vec![
        vec![text("メモ"), num(2024.0)],
        vec![num(1.0), num(2.0), num(3.0)],
        vec![text("確認済み")],
        vec![num(4.0), blank(), num(5.0)],
        vec![],
        vec![num(6.0)],
    ];
    let content = build_xlsx(&[SheetSpec::new("2024年4月", rows)])?;

    let mut parser = PayrollParser::new();
    let records = parser.parse(&content, ParseMode::Intelligent)?;
    let stats = parser.parsing_stats();

    assert!(records.is_empty());
    assert_eq!(stats.skip_reason("2024年4月"), Some(SkipReason::HeaderNotFound));
    assert_eq!(stats.records_rejected, 0);
    assert_eq!(stats.rows_scanned, 0);
    assert!(stats.all_sheets_skipped());
    Ok(())
}

#[test]
fn test_zero_id_is_kept_unless_blacklisted() -> anyhow::Result<()> {
    let content = build_xlsx(&[SheetSpec::new("2024年4月", id_rows(&["1001", "0", "1002"]))])?;

    let mut parser = PayrollParser::new();
    let records = parser.parse(&content, ParseMode::Intelligent)?;
    let ids: Vec<&str> = records.iter().map(|r| r.employee_id.as_str()).collect();
    assert_eq!(ids, vec!["1001", "0", "1002"]);

    let mut strict = PayrollParser::with_config(ParserConfig {
        sentinel_ids: vec!["0".to_string()],
        ..ParserConfig::default()
    });
    let records = strict.parse(&content, ParseMode::Intelligent)?;
    assert_eq!(records.len(), 2);
    assert_eq!(strict.parsing_stats().rejected_for(RejectReason::BlacklistedId), 1);
    Ok(())
}

#[test]
fn test_empty_id_is_rejected() -> anyhow::Result<()> {
    let content = build_xlsx(&[SheetSpec::new("2024年4月", id_rows(&["1001", "", "1003"]))])?;

    let mut parser = PayrollParser::new();
    let records = parser.parse(&content, ParseMode::Intelligent)?;
    let stats = parser.parsing_stats();

    assert_eq!(records.len(), 2);
    assert_eq!(stats.rows_scanned, 3);
    assert_eq!(stats.rejected_for(RejectReason::MissingKeyField), 1);
    assert!(stats.is_consistent());
    Ok(())
}

#[test]
fn test_summary_and_repeated_header_rows() -> anyhow::Result<()> {
    let mut rows = id_rows(&["1001", "1002"]);
    rows.push(vec![text("社員番号"), text("氏名"), text("稼働時間"), text("請求単価")]);
    rows.push(vec![text("1003"), text("中村 一郎"), num(100.0), num(1500.0)]);
    rows.push(vec![text("合計"), blank(), num(420.0)]);
    let content = build_xlsx(&[SheetSpec::new("2024年4月", rows)])?;

    let mut parser = PayrollParser::new();
    let records = parser.parse(&content, ParseMode::Intelligent)?;
    let stats = parser.parsing_stats();

    assert_eq!(records.len(), 3);
    assert_eq!(stats.rejected_for(RejectReason::RepeatedHeader), 1);
    assert_eq!(stats.rejected_for(RejectReason::SummaryRow), 1);
    assert_eq!(stats.rows_scanned, 5);
    Ok(())
}

#[test]
fn test_subtotal_rows_never_become_employees() -> anyhow::Result<()> {
    let mut rows = id_rows(&["1001", "1002"]);
    rows.push(vec![text("小計（A社）"), blank(), num(320.0), blank()]);
    rows.push(vec![text("1003"), text("計良 次郎"), num(100.0), num(1500.0)]);
    rows.push(vec![text("総合計"), blank(), num(420.0), blank()]);
    let content = build_xlsx(&[SheetSpec::new("2024年4月", rows)])?;

    let mut parser = PayrollParser::new();
    let records = parser.parse(&content, ParseMode::Intelligent)?;
    let stats = parser.parsing_stats();

    let ids: Vec<&str> = records.iter().map(|r| r.employee_id.as_str()).collect();
    assert_eq!(ids, vec!["1001", "1002", "1003"]);
    assert_eq!(stats.rejected_for(RejectReason::SummaryRow), 2);
    assert_eq!(stats.rows_scanned, 5);
    assert_eq!(parser.employees().len(), 3);
    Ok(())
}

#[test]
fn test_units_row_is_not_scanned() -> anyhow::Result<()> {
    let mut rows = id_rows(&["1001", "1002"]);
    rows.insert(1, vec![blank(), blank(), text("（時間）"), text("（円）")]);
    let content = build_xlsx(&[SheetSpec::new("2024年4月", rows)])?;

    let mut parser = PayrollParser::new();
    let records = parser.parse(&content, ParseMode::Intelligent)?;
    let stats = parser.parsing_stats();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].provenance.row, 3);
    assert_eq!(stats.rows_scanned, 2);
    assert_eq!(stats.records_rejected, 0);
    Ok(())
}

#[test]
fn test_hidden_sheet_and_config_period() -> anyhow::Result<()> {
    let content = build_xlsx(&[
        SheetSpec::new("入力", id_rows(&["1001"])),
        SheetSpec::new("旧データ", id_rows(&["9001"])).hidden(),
    ])?;

    let config = ParserConfig::from_toml_str(
        r#"
skip_hidden_sheets = true
period = "2024-03"
"#,
    )?;
    let mut parser = PayrollParser::try_with_config(config)?;
    let records = parser.parse(&content, ParseMode::Intelligent)?;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].period.to_string(), "2024-03");
    assert_eq!(
        parser.parsing_stats().skip_reason("旧データ"),
        Some(SkipReason::Hidden)
    );
    Ok(())
}

#[test]
fn test_sheet_without_period_rejects_rows() -> anyhow::Result<()> {
    let content = build_xlsx(&[SheetSpec::new("入力", id_rows(&["1001", "1002"]))])?;

    let mut parser = PayrollParser::new();
    let records = parser.parse(&content, ParseMode::Intelligent)?;

    assert!(records.is_empty());
    assert_eq!(
        parser.parsing_stats().rejected_for(RejectReason::MissingKeyField),
        2
    );
    Ok(())
}

#[test]
fn test_fixed_template_and_fallback() -> anyhow::Result<()> {
    let template_sheet = vec![
        vec![text("派遣実績報告書")],
        vec![text("No"), text("スタッフ"), text("時間"), text("単価"), text("金額")],
        vec![text("A-01"), text("佐藤 花子"), num(160.0), num(1700.0), blank()],
        vec![text("A-02"), text("鈴木 花子"), num(100.0), num(1800.0), num(180000.0)],
    ];
    let content = build_xlsx(&[
        SheetSpec::new("2024年5月", template_sheet),
        SheetSpec::new("2024年6月", id_rows(&["1001"])),
    ])?;

    let config = ParserConfig::from_toml_str(
        r#"
[[templates]]
id = "agency-report"
header_row = 2

[[templates.sentinels]]
cell = "A1"
text = "派遣実績報告書"

[templates.columns]
employee_id = "A"
name = "B"
work_hours = "C"
billing_rate = "D"
billing_amount = "E"
"#,
    )?;

    let mut parser = PayrollParser::try_with_config(config.clone())?;
    let records = parser.parse(&content, ParseMode::FixedTemplate)?;
    let stats = parser.parsing_stats();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].employee_id, "A-01");
    assert_eq!(records[0].billing_amount, dec("272000"));
    assert_eq!(records[1].billing_amount, dec("180000"));
    assert_eq!(
        stats.sheet("2024年5月").unwrap().template_id.as_deref(),
        Some("agency-report")
    );
    assert_eq!(
        stats.skip_reason("2024年6月"),
        Some(SkipReason::TemplateNotMatched)
    );

    let mut fallback = PayrollParser::try_with_config(ParserConfig {
        template_fallback: true,
        ..config
    })?;
    let records = fallback.parse(&content, ParseMode::FixedTemplate)?;
    assert_eq!(records.len(), 3);
    assert_eq!(records[2].period.to_string(), "2024-06");
    Ok(())
}

#[test]
fn test_repeated_parses_are_identical() -> anyhow::Result<()> {
    let content = build_xlsx(&[
        SheetSpec::new("2024年4月", payroll_rows(&full_month(6))),
        SheetSpec::new("集計", payroll_rows(&full_month(2))),
        SheetSpec::new("2024年5月", id_rows(&["1001", "", "0"])),
    ])?;

    let parser = PayrollParser::new();
    let first = parser.extract(&content, ParseMode::Intelligent)?;
    let second = parser.extract(&content, ParseMode::Intelligent)?;

    assert_eq!(serde_json::to_string(&first)?, serde_json::to_string(&second)?);
    assert!(first.stats.is_consistent());
    assert_eq!(
        first.stats.records_extracted + first.stats.records_rejected,
        first.stats.rows_scanned
    );
    Ok(())
}

#[test]
fn test_corrupt_input_fails_and_resets_stats() -> anyhow::Result<()> {
    let content = build_xlsx(&[SheetSpec::new("2024年4月", payroll_rows(&full_month(3)))])?;

    let mut parser = PayrollParser::new();
    parser.parse(&content, ParseMode::Intelligent)?;
    assert_eq!(parser.parsing_stats().records_extracted, 3);

    let err = parser
        .parse(&content[..content.len() / 2], ParseMode::Intelligent)
        .unwrap_err();
    assert!(matches!(
        err,
        WorkbookLoadError::Unrecognized { .. } | WorkbookLoadError::Corrupt { .. }
    ));
    assert_eq!(parser.parsing_stats().records_extracted, 0);
    assert!(parser.employees().is_empty());
    Ok(())
}
