//! Header detection: find the label row of a sheet and map its columns.

pub mod labels;
pub mod resolver;

use self::labels::LabelDictionary;
use self::resolver::{ColumnCandidate, Resolution, RoleConflict, resolve};
use crate::model::{ColumnMapping, FieldRole};
use crate::reader::{CellValue, Sheet};
use std::collections::BTreeSet;
use std::fmt;

/// Bounds and acceptance rules for the header search
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderSettings {
    /// Window height (K)
    pub rows: u32,
    /// Window width (M)
    pub columns: u32,
    /// Adjacent rows that may continue the best row
    pub merge_rows: u32,
    pub min_roles: usize,
    pub require_identity: bool,
    pub require_numeric: bool,
    pub min_confidence: f64,
    /// Only consider this row
    pub forced_row: Option<u32>,
}

impl Default for HeaderSettings {
    fn default() -> Self {
        Self {
            rows: 20,
            columns: 40,
            merge_rows: 1,
            min_roles: 2,
            require_identity: true,
            require_numeric: true,
            min_confidence: 0.5,
            forced_row: None,
        }
    }
}

/// A detected header
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderMatch {
    /// Row with the most distinct roles
    pub header_row: u32,
    /// First row below the (possibly multi-row) header
    pub data_start_row: u32,
    /// Mappings ordered by column
    pub mappings: Vec<ColumnMapping>,
    pub conflicts: Vec<RoleConflict>,
    /// Mean confidence of the mappings
    pub confidence: f64,
}

impl HeaderMatch {
    pub fn role_column(&self, role: FieldRole) -> Option<u32> {
        self.mappings
            .iter()
            .find(|m| m.role == role)
            .map(|m| m.column)
    }
}

/// Why no header was accepted
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderNotFound {
    /// Best candidate row, if any cell matched a label at all
    pub best_row: Option<u32>,
    /// Roles the best candidate mapped
    pub roles_found: Vec<FieldRole>,
    pub reason: String,
}

impl fmt::Display for HeaderNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.best_row {
            Some(row) => write!(f, "{} (best candidate row {})", self.reason, row),
            None => f.write_str(&self.reason),
        }
    }
}

/// Searches the header window of a sheet
pub struct HeaderDetector<'a> {
    dictionary: &'a LabelDictionary,
    settings: HeaderSettings,
}

impl<'a> HeaderDetector<'a> {
    pub fn new(dictionary: &'a LabelDictionary, settings: HeaderSettings) -> Self {
        Self {
            dictionary,
            settings,
        }
    }

    /// Locate the header of a sheet
    pub fn detect(&self, sheet: &Sheet) -> Result<HeaderMatch, HeaderNotFound> {
        let max_col = self.settings.columns.min(sheet.width());
        let rows: Vec<u32> = match self.settings.forced_row {
            Some(row) if row >= 1 && row <= sheet.height() => vec![row],
            Some(row) => {
                return Err(HeaderNotFound {
                    best_row: None,
                    roles_found: Vec::new(),
                    reason: format!("configured header row {} is outside the sheet", row),
                });
            }
            None => (1..=self.settings.rows.min(sheet.height())).collect(),
        };

        let mut best: Option<(u32, usize)> = None;
        for row in rows {
            let roles = distinct_roles(&self.single_row_candidates(sheet, row, max_col));
            if roles > 0 && best.is_none_or(|(_, count)| roles > count) {
                best = Some((row, roles));
            }
        }

        let Some((best_row, _)) = best else {
            return Err(HeaderNotFound {
                best_row: None,
                roles_found: Vec::new(),
                reason: "no cell in the header window matches a known label".to_string(),
            });
        };

        let block = self.merge_block(sheet, best_row, max_col);
        let resolution = resolve(&self.block_candidates(sheet, &block, max_col));
        let last_row = block.last().copied().unwrap_or(best_row);

        let (mappings, conflicts, confidence) = self.accept(best_row, resolution)?;
        let mut header = HeaderMatch {
            header_row: best_row,
            data_start_row: last_row.saturating_add(1),
            mappings,
            conflicts,
            confidence,
        };
        header.data_start_row = header
            .data_start_row
            .saturating_add(self.caption_rows(sheet, &header, max_col));
        Ok(header)
    }

    /// Text-only rows right below the header whose identity cells are blank,
    /// such as a units line `(時間)` `(円)`
    fn caption_rows(&self, sheet: &Sheet, header: &HeaderMatch, max_col: u32) -> u32 {
        let identity: Vec<u32> = [FieldRole::EmployeeId, FieldRole::Name]
            .into_iter()
            .filter_map(|role| header.role_column(role))
            .collect();

        let mut count = 0;
        while count < self.settings.merge_rows.max(1) {
            let row = header.data_start_row.saturating_add(count);
            if row > sheet.height() || !is_text_only(&window_cells(sheet, row, max_col)) {
                break;
            }
            if identity.iter().any(|&col| !sheet.value(row, col).is_blank()) {
                break;
            }
            count += 1;
        }
        count
    }

    fn accept(
        &self,
        best_row: u32,
        resolution: Resolution,
    ) -> Result<(Vec<ColumnMapping>, Vec<RoleConflict>, f64), HeaderNotFound> {
        let roles: Vec<FieldRole> = resolution.mappings.iter().map(|m| m.role).collect();
        let confidence = resolution.confidence();

        let reason = if roles.len() < self.settings.min_roles {
            Some(format!(
                "only {} distinct field(s) recognized, {} required",
                roles.len(),
                self.settings.min_roles
            ))
        } else if self.settings.require_identity && !roles.iter().any(|r| r.is_identity()) {
            Some("no employee id or name column".to_string())
        } else if self.settings.require_numeric && !roles.iter().any(|r| r.is_numeric()) {
            Some("no numeric column (rate, hours or amount)".to_string())
        } else if confidence < self.settings.min_confidence {
            Some(format!(
                "header confidence {:.2} below {:.2}",
                confidence, self.settings.min_confidence
            ))
        } else {
            None
        };

        match reason {
            Some(reason) => Err(HeaderNotFound {
                best_row: Some(best_row),
                roles_found: roles,
                reason,
            }),
            None => Ok((resolution.mappings, resolution.conflicts, confidence)),
        }
    }

    /// Grow the best row into a block of header rows, upward then downward
    fn merge_block(&self, sheet: &Sheet, best_row: u32, max_col: u32) -> Vec<u32> {
        let mut block = vec![best_row];
        let mut score = block_score(&resolve(&self.block_candidates(sheet, &block, max_col)));

        for offset in 1..=self.settings.merge_rows {
            let Some(row) = best_row.checked_sub(offset).filter(|r| *r >= 1) else {
                break;
            };
            let mut trial = block.clone();
            trial.insert(0, row);
            match self.continues(sheet, row, &trial, max_col, score) {
                Some(new_score) => {
                    block = trial;
                    score = new_score;
                }
                None => break,
            }
        }

        for offset in 1..=self.settings.merge_rows {
            let row = best_row + offset;
            if row > sheet.height() {
                break;
            }
            let mut trial = block.clone();
            trial.push(row);
            match self.continues(sheet, row, &trial, max_col, score) {
                Some(new_score) => {
                    block = trial;
                    score = new_score;
                }
                None => break,
            }
        }

        block
    }

    /// Score of `trial` when `row` is a text-only row that improves the header
    fn continues(
        &self,
        sheet: &Sheet,
        row: u32,
        trial: &[u32],
        max_col: u32,
        current: (usize, f64),
    ) -> Option<(usize, f64)> {
        if !is_text_only(&window_cells(sheet, row, max_col)) {
            return None;
        }

        let score = block_score(&resolve(&self.block_candidates(sheet, trial, max_col)));
        let improves = score.0 > current.0 || (score.0 == current.0 && score.1 > current.1);
        improves.then_some(score)
    }

    fn single_row_candidates(&self, sheet: &Sheet, row: u32, max_col: u32) -> Vec<ColumnCandidate> {
        (1..=max_col)
            .filter_map(|col| {
                let text = sheet.value(row, col).as_text()?.trim();
                let matched = self.dictionary.classify(text)?;
                Some(ColumnCandidate {
                    column: col,
                    label: text.to_string(),
                    matched,
                })
            })
            .collect()
    }

    /// Candidates for a block of header rows: each cell on its own, plus the
    /// top-to-bottom concatenation per column (whole-label matches only)
    fn block_candidates(&self, sheet: &Sheet, block: &[u32], max_col: u32) -> Vec<ColumnCandidate> {
        let mut candidates = Vec::new();
        for &row in block {
            candidates.extend(self.single_row_candidates(sheet, row, max_col));
        }
        if block.len() < 2 {
            return candidates;
        }

        let last = block.len() - 1;
        for col in 1..=max_col {
            let own = block
                .iter()
                .any(|&row| !sheet.value(row, col).is_blank());
            if !own {
                continue;
            }
            let parts: Vec<&str> = block
                .iter()
                .enumerate()
                .filter_map(|(i, &row)| {
                    let text = cell_text(sheet, row, col);
                    if text.is_some() || i == last {
                        text
                    } else {
                        carried_text(sheet, row, col)
                    }
                })
                .collect();
            if parts.len() < 2 {
                continue;
            }
            let label = parts.join(" ");
            if let Some(matched) = self.dictionary.classify_whole(&label) {
                candidates.push(ColumnCandidate {
                    column: col,
                    label,
                    matched,
                });
            }
        }
        candidates
    }
}

fn cell_text(sheet: &Sheet, row: u32, col: u32) -> Option<&str> {
    sheet
        .value(row, col)
        .as_text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Nearest text to the left in the same row (caption of a merged cell group)
fn carried_text(sheet: &Sheet, row: u32, col: u32) -> Option<&str> {
    (1..col).rev().find_map(|c| cell_text(sheet, row, c))
}

fn window_cells(sheet: &Sheet, row: u32, max_col: u32) -> Vec<&CellValue> {
    sheet
        .cells_in_row(row)
        .iter()
        .take(max_col as usize)
        .map(|c| &c.value)
        .collect()
}

/// At least one text cell and no number or date cell
fn is_text_only(cells: &[&CellValue]) -> bool {
    cells
        .iter()
        .any(|v| matches!(v, CellValue::Text(s) if !s.trim().is_empty()))
        && !cells.iter().any(|v| v.is_numeric())
}

fn distinct_roles(candidates: &[ColumnCandidate]) -> usize {
    candidates
        .iter()
        .map(|c| c.matched.role)
        .collect::<BTreeSet<_>>()
        .len()
}

fn block_score(resolution: &Resolution) -> (usize, f64) {
    (
        resolution.mappings.len(),
        resolution.mappings.iter().map(|m| m.confidence).sum(),
    )
}
