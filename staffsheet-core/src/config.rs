//! Configuration system for the extraction engine

use crate::error::ConfigError;
use crate::extract::period::parse_period_text;
use crate::header::HeaderSettings;
use crate::header::labels::LabelDictionary;
use crate::model::{FieldRole, Period};
use crate::template::TemplateConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Main parser configuration.
///
/// Every field has a default, so an empty TOML document is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Sheet names never processed (exact match)
    pub skip_sheets: Vec<String>,
    /// Treat hidden sheets as skipped
    pub skip_hidden_sheets: bool,
    /// Header window height (K)
    pub header_rows: u32,
    /// Header window width (M)
    pub header_columns: u32,
    /// Rows above/below the best header row that may continue it
    pub header_merge_rows: u32,
    pub min_header_roles: usize,
    /// Header must map EmployeeId or Name
    pub require_identity_role: bool,
    /// Header must map at least one numeric role
    pub require_numeric_role: bool,
    pub min_header_confidence: f64,
    /// Consecutive structurally-empty rows that end the data region (N)
    pub blank_run_threshold: u32,
    /// Relative tolerance between a provided and a derived billing amount
    pub derive_tolerance: f64,
    /// Workbook-level period used when neither a column nor the sheet gives one
    pub period: Option<String>,
    /// Employee ids treated as placeholders and rejected
    pub sentinel_ids: Vec<String>,
    /// Identity-cell texts marking subtotal/total rows
    pub summary_labels: Vec<String>,
    /// Roles whose absence or unparseable value rejects a row
    pub required_roles: Vec<FieldRole>,
    /// Extra labels per role, merged with the built-in dictionary
    pub synonyms: BTreeMap<FieldRole, Vec<String>>,
    /// Process sheets on the rayon thread pool
    pub parallel: bool,
    /// In fixed-template mode, detect headers for sheets no template matches
    pub template_fallback: bool,
    pub templates: Vec<TemplateConfig>,
    pub sheets: HashMap<String, SheetConfig>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            skip_sheets: [
                "集計",
                "合計",
                "目次",
                "サマリー",
                "契約形態別集計",
                "summary",
                "index",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            skip_hidden_sheets: false,
            header_rows: 20,
            header_columns: 40,
            header_merge_rows: 1,
            min_header_roles: 2,
            require_identity_role: true,
            require_numeric_role: true,
            min_header_confidence: 0.5,
            blank_run_threshold: 5,
            derive_tolerance: 0.01,
            period: None,
            sentinel_ids: Vec::new(),
            summary_labels: ["合計", "小計", "総計", "計", "total", "subtotal"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            required_roles: Vec::new(),
            synonyms: BTreeMap::new(),
            parallel: true,
            template_fallback: false,
            templates: Vec::new(),
            sheets: HashMap::new(),
        }
    }
}

impl ParserConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// Check values the engine cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| Err(ConfigError::Invalid { message });

        if self.header_rows == 0 || self.header_columns == 0 {
            return invalid("header_rows and header_columns must be positive".to_string());
        }
        if self.min_header_roles == 0 {
            return invalid("min_header_roles must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.min_header_confidence) {
            return invalid(format!(
                "min_header_confidence must be within [0, 1], got {}",
                self.min_header_confidence
            ));
        }
        if !self.derive_tolerance.is_finite() || self.derive_tolerance < 0.0 {
            return invalid(format!(
                "derive_tolerance must be a non-negative number, got {}",
                self.derive_tolerance
            ));
        }
        if self.blank_run_threshold == 0 {
            return invalid("blank_run_threshold must be at least 1".to_string());
        }
        if let Some(period) = &self.period {
            if parse_period_text(period).is_none() {
                return invalid(format!("period '{}' is not a year-month", period));
            }
        }

        for (sheet_name, sheet) in &self.sheets {
            if let Some(period) = &sheet.period {
                if parse_period_text(period).is_none() {
                    return invalid(format!(
                        "period '{}' of sheet '{}' is not a year-month",
                        period, sheet_name
                    ));
                }
            }
            if sheet.header_row == Some(0) {
                return invalid(format!("header_row of sheet '{}' must be 1-based", sheet_name));
            }
        }

        let mut template_ids = HashSet::new();
        for template in &self.templates {
            if !template_ids.insert(template.id.as_str()) {
                return invalid(format!("duplicate template id '{}'", template.id));
            }
            if let Err(message) = template.validate() {
                return invalid(format!("template '{}': {}", template.id, message));
            }
        }

        Ok(())
    }

    /// Workbook-level period, if configured and parseable
    pub fn workbook_period(&self) -> Option<Period> {
        self.period.as_deref().and_then(parse_period_text)
    }

    /// Period configured for one sheet
    pub fn sheet_period(&self, sheet_name: &str) -> Option<Period> {
        self.sheets
            .get(sheet_name)
            .and_then(|s| s.period.as_deref())
            .and_then(parse_period_text)
    }

    /// Header search settings with the per-sheet override applied
    pub fn header_settings(&self, sheet_name: &str) -> HeaderSettings {
        HeaderSettings {
            rows: self.header_rows,
            columns: self.header_columns,
            merge_rows: self.header_merge_rows,
            min_roles: self.min_header_roles,
            require_identity: self.require_identity_role,
            require_numeric: self.require_numeric_role,
            min_confidence: self.min_header_confidence,
            forced_row: self.sheets.get(sheet_name).and_then(|s| s.header_row),
        }
    }

    /// Label dictionary with the configured synonyms merged in
    pub fn dictionary(&self) -> LabelDictionary {
        LabelDictionary::with_extra(&self.synonyms)
    }

    pub fn is_skip_listed(&self, sheet_name: &str) -> bool {
        self.skip_sheets.iter().any(|s| s == sheet_name)
    }
}

/// Sheet-specific configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    /// Period for every row of this sheet
    pub period: Option<String>,
    /// Use this 1-based row as the header instead of searching
    pub header_row: Option<u32>,
}
