//! Fixed templates: pre-declared column layouts recognized by sentinel cells.

use crate::header::labels::normalize_label;
use crate::model::{ColumnMapping, FieldRole, MatchKind};
use crate::reader::Sheet;
use crate::reader::cell_ref::{parse_cell_ref, parse_column};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A cell whose text identifies a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentinel {
    /// A1-style reference
    pub cell: String,
    /// Expected text, compared after label normalization
    pub text: String,
}

/// A known layout: header row, sentinel cells and one column per role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub id: String,
    /// 1-based row holding the labels; data starts on the next row
    pub header_row: u32,
    /// A template without sentinels matches every sheet
    #[serde(default)]
    pub sentinels: Vec<Sentinel>,
    /// Column letters per role
    pub columns: BTreeMap<FieldRole, String>,
}

impl TemplateConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.header_row == 0 {
            return Err("header_row must be 1-based".to_string());
        }
        if self.columns.is_empty() {
            return Err("no columns declared".to_string());
        }

        let mut seen: HashMap<u32, FieldRole> = HashMap::new();
        for (role, letters) in &self.columns {
            let column = parse_column(letters)
                .ok_or_else(|| format!("'{}' is not a column for {}", letters, role))?;
            if let Some(other) = seen.insert(column, *role) {
                return Err(format!(
                    "column {} is mapped to both {} and {}",
                    letters, other, role
                ));
            }
        }

        for sentinel in &self.sentinels {
            if parse_cell_ref(&sentinel.cell).is_none() {
                return Err(format!("'{}' is not a cell reference", sentinel.cell));
            }
        }
        Ok(())
    }

    /// True when every sentinel cell holds its expected text
    pub fn matches(&self, sheet: &Sheet) -> bool {
        self.sentinels.iter().all(|sentinel| {
            parse_cell_ref(&sentinel.cell).is_some_and(|(row, col)| {
                normalize_label(&sheet.value(row, col).display_text())
                    == normalize_label(&sentinel.text)
            })
        })
    }

    /// Column mappings with full confidence, labelled from the header row
    pub fn mappings(&self, sheet: &Sheet) -> Vec<ColumnMapping> {
        let mut mappings: Vec<ColumnMapping> = self
            .columns
            .iter()
            .filter_map(|(role, letters)| {
                let column = parse_column(letters)?;
                let text = sheet.value(self.header_row, column).display_text();
                let label = if text.trim().is_empty() {
                    letters.to_uppercase()
                } else {
                    text.trim().to_string()
                };
                Some(ColumnMapping {
                    column,
                    role: *role,
                    confidence: 1.0,
                    kind: MatchKind::Template,
                    label,
                })
            })
            .collect();
        mappings.sort_by_key(|m| m.column);
        mappings
    }
}

/// First template whose sentinels all match the sheet
pub fn match_template<'a>(templates: &'a [TemplateConfig], sheet: &Sheet) -> Option<&'a TemplateConfig> {
    templates.iter().find(|t| t.matches(sheet))
}
