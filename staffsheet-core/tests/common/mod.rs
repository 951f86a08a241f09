//! In-memory xlsx fixtures for integration tests

#![allow(dead_code)]

use std::io::{Cursor, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// One cell of a fixture sheet
#[derive(Debug, Clone)]
pub enum Value {
    Blank,
    Text(String),
    Number(f64),
}

pub fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

pub fn num(v: f64) -> Value {
    Value::Number(v)
}

pub fn blank() -> Value {
    Value::Blank
}

/// A worksheet laid out row-major from A1
#[derive(Debug, Clone)]
pub struct SheetSpec {
    pub name: String,
    pub hidden: bool,
    pub rows: Vec<Vec<Value>>,
}

impl SheetSpec {
    pub fn new(name: &str, rows: Vec<Vec<Value>>) -> Self {
        Self {
            name: name.to_string(),
            hidden: false,
            rows,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn column_name(mut col: usize) -> String {
    let mut name = String::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        name.insert(0, (b'A' + rem as u8) as char);
        col = (col - 1) / 26;
    }
    name
}

fn sheet_xml(rows: &[Vec<Value>]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (r, row) in rows.iter().enumerate() {
        let row_num = r + 1;
        xml.push_str(&format!(r#"<row r="{}">"#, row_num));
        for (c, value) in row.iter().enumerate() {
            let cell_ref = format!("{}{}", column_name(c + 1), row_num);
            match value {
                Value::Blank => {}
                Value::Text(s) => xml.push_str(&format!(
                    r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    cell_ref,
                    escape(s)
                )),
                Value::Number(v) => {
                    xml.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, cell_ref, v))
                }
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Build a minimal xlsx package holding the given sheets
pub fn build_xlsx(sheets: &[SheetSpec]) -> anyhow::Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    // 1. [Content_Types].xml
    zip.start_file("[Content_Types].xml", options)?;
    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
"#,
    );
    for (i, _) in sheets.iter().enumerate() {
        content_types.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            i + 1
        ));
    }
    content_types.push_str("</Types>");
    zip.write_all(content_types.as_bytes())?;

    // 2. _rels/.rels
    zip.start_file("_rels/.rels", options)?;
    zip.write_all(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#.as_bytes())?;

    // 3. xl/workbook.xml
    zip.start_file("xl/workbook.xml", options)?;
    let mut workbook_xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets>
"#,
    );
    for (i, sheet) in sheets.iter().enumerate() {
        let state = if sheet.hidden { r#" state="hidden""# } else { "" };
        workbook_xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}"{} r:id="rId{}"/>"#,
            escape(&sheet.name),
            i + 1,
            state,
            i + 1
        ));
    }
    workbook_xml.push_str("</sheets></workbook>");
    zip.write_all(workbook_xml.as_bytes())?;

    // 4. xl/_rels/workbook.xml.rels
    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    let mut rels_xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
"#,
    );
    for (i, _) in sheets.iter().enumerate() {
        rels_xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            i + 1,
            i + 1
        ));
    }
    rels_xml.push_str("</Relationships>");
    zip.write_all(rels_xml.as_bytes())?;

    // 5. xl/worksheets/sheetN.xml
    for (i, sheet) in sheets.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
        zip.write_all(sheet_xml(&sheet.rows).as_bytes())?;
    }

    Ok(zip.finish()?.into_inner())
}

const SURNAMES: [&str; 12] = [
    "佐藤", "鈴木", "高橋", "田中", "伊藤", "渡辺", "山本", "中村", "小林", "加藤", "吉田", "山田",
];

/// Distinct employee name for fixture row `i`
pub fn staff_name(i: usize) -> String {
    format!("{} 花子{}", SURNAMES[i % SURNAMES.len()], i / SURNAMES.len() + 1)
}

/// Name-keyed payroll sheet: a title in row 1, labels 氏名/時給/請求単価/稼働時間/請求金額
/// in row 3, then one row per `(hours, billing_amount)` pair
pub fn payroll_rows(rows: &[(f64, Option<f64>)]) -> Vec<Vec<Value>> {
    let mut out = vec![
        vec![text("月次稼働実績表")],
        vec![],
        vec![
            text("氏名"),
            text("時給"),
            text("請求単価"),
            text("稼働時間"),
            text("請求金額"),
        ],
    ];
    for (i, (hours, amount)) in rows.iter().enumerate() {
        out.push(vec![
            text(&staff_name(i)),
            num(1200.0),
            num(1700.0),
            num(*hours),
            amount.map(num).unwrap_or(Value::Blank),
        ]);
    }
    out
}

/// Id-keyed payroll sheet with header in row 1
pub fn id_rows(ids: &[&str]) -> Vec<Vec<Value>> {
    let mut out = vec![vec![
        text("社員番号"),
        text("氏名"),
        text("稼働時間"),
        text("請求単価"),
    ]];
    for (i, id) in ids.iter().enumerate() {
        out.push(vec![
            if id.is_empty() { Value::Blank } else { text(id) },
            text(&staff_name(i)),
            num(160.0),
            num(1700.0),
        ]);
    }
    out
}
