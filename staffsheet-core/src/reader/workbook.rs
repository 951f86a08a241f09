//! Workbook data structures

use chrono::NaiveDateTime;
use std::borrow::Cow;

/// Represents a complete workbook
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }
}

/// Represents a worksheet as a dense grid.
///
/// Row and column numbers are 1-based everywhere in the public API. Rows may be
/// ragged; missing trailing cells read as [`CellValue::Empty`].
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    /// Position of the sheet in the workbook (0-based)
    pub index: usize,
    pub visible: bool,
    rows: Vec<Vec<Cell>>,
}

static EMPTY: CellValue = CellValue::Empty;

impl Sheet {
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
            visible: true,
            rows: Vec::new(),
        }
    }

    /// Build a sheet from row-major values starting at A1
    pub fn from_rows(name: impl Into<String>, index: usize, values: Vec<Vec<CellValue>>) -> Self {
        let mut sheet = Self::new(name, index);
        for (r, row) in values.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                sheet.set(r as u32 + 1, c as u32 + 1, value);
            }
        }
        sheet
    }

    /// Store a value at a 1-based position, growing the grid as needed
    pub fn set(&mut self, row: u32, col: u32, value: CellValue) {
        if row == 0 || col == 0 {
            return;
        }
        let (r, c) = (row as usize - 1, col as usize - 1);
        if self.rows.len() <= r {
            self.rows.resize_with(r + 1, Vec::new);
        }
        let cells = &mut self.rows[r];
        while cells.len() <= c {
            let next_col = cells.len() as u32 + 1;
            cells.push(Cell {
                row,
                col: next_col,
                value: CellValue::Empty,
            });
        }
        cells[c].value = value;
    }

    /// Get a cell at the given 1-based position
    pub fn get_cell(&self, row: u32, col: u32) -> Option<&Cell> {
        if row == 0 || col == 0 {
            return None;
        }
        self.rows
            .get(row as usize - 1)
            .and_then(|cells| cells.get(col as usize - 1))
    }

    /// Value at the given position, `Empty` when outside the grid
    pub fn value(&self, row: u32, col: u32) -> &CellValue {
        self.get_cell(row, col).map(|c| &c.value).unwrap_or(&EMPTY)
    }

    /// Number of rows in the grid (the last row index)
    pub fn height(&self) -> u32 {
        self.rows.len() as u32
    }

    /// Widest row length
    pub fn width(&self) -> u32 {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0) as u32
    }

    /// Cells of one row in column order
    pub fn cells_in_row(&self, row: u32) -> &[Cell] {
        if row == 0 {
            return &[];
        }
        self.rows
            .get(row as usize - 1)
            .map(|r| r.as_slice())
            .unwrap_or(&[])
    }

    /// True when no cell in the first `max_rows` x `max_cols` window holds data
    pub fn is_window_empty(&self, max_rows: u32, max_cols: u32) -> bool {
        (1..=max_rows.min(self.height())).all(|row| {
            self.cells_in_row(row)
                .iter()
                .take(max_cols as usize)
                .all(|c| c.value.is_blank())
        })
    }
}

/// Represents a single cell
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub row: u32,
    pub col: u32,
    pub value: CellValue,
}

/// Cell value types
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Empty, or text made only of whitespace (full-width space included)
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, CellValue::Number(_) | CellValue::Date(_))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the value as text the way a user would read it in the sheet.
    ///
    /// Whole numbers lose their fractional part so numeric employee ids come
    /// out as `"1024"` rather than `"1024.0"`.
    pub fn display_text(&self) -> Cow<'_, str> {
        match self {
            CellValue::Empty => Cow::Borrowed(""),
            CellValue::Text(s) => Cow::Borrowed(s.as_str()),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    Cow::Owned(format!("{}", *n as i64))
                } else {
                    Cow::Owned(n.to_string())
                }
            }
            CellValue::Date(dt) => {
                if dt.time() == chrono::NaiveTime::MIN {
                    Cow::Owned(dt.date().format("%Y-%m-%d").to_string())
                } else {
                    Cow::Owned(dt.format("%Y-%m-%d %H:%M:%S").to_string())
                }
            }
        }
    }
}
