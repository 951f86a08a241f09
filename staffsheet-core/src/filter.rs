//! Sheet eligibility: skip-list, hidden sheets and empty sheets.
//!
//! Header-not-found and template-not-matched skips are decided later by the
//! pipeline; this module only covers what can be known before detection.

use crate::config::ParserConfig;
use crate::reader::Sheet;
use serde::Serialize;
use std::fmt;

/// Why a sheet never reached row extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SkipReason {
    #[serde(rename = "skip-listed")]
    SkipListed,
    #[serde(rename = "hidden")]
    Hidden,
    #[serde(rename = "empty")]
    Empty,
    #[serde(rename = "header not found")]
    HeaderNotFound,
    #[serde(rename = "template not matched")]
    TemplateNotMatched,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::SkipListed => "skip-listed",
            SkipReason::Hidden => "hidden",
            SkipReason::Empty => "empty",
            SkipReason::HeaderNotFound => "header not found",
            SkipReason::TemplateNotMatched => "template not matched",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct SheetFilter<'a> {
    config: &'a ParserConfig,
}

impl<'a> SheetFilter<'a> {
    pub fn new(config: &'a ParserConfig) -> Self {
        Self { config }
    }

    /// Decision from the sheet name alone
    pub fn static_decision(&self, sheet_name: &str) -> Option<SkipReason> {
        self.config
            .is_skip_listed(sheet_name)
            .then_some(SkipReason::SkipListed)
    }

    /// Full pre-detection decision; `None` means the sheet goes on to header
    /// detection
    pub fn probe(&self, sheet: &Sheet) -> Option<SkipReason> {
        if let Some(reason) = self.static_decision(&sheet.name) {
            return Some(reason);
        }
        if self.config.skip_hidden_sheets && !sheet.visible {
            return Some(SkipReason::Hidden);
        }
        if sheet.is_window_empty(self.config.header_rows, self.config.header_columns) {
            return Some(SkipReason::Empty);
        }
        None
    }
}
