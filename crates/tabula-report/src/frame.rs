use serde::{Deserialize, Serialize};

use tabula_core::error::{Result, TabulaError};

/// A single value in a frame.
///
/// The untagged representation matches the wire format: JSON null, bool,
/// number, or string, nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Numeric view of this cell, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Text rendering used for grouping keys and row labels.
    pub fn render(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Bool(v) => v.to_string(),
            Cell::Int(v) => v.to_string(),
            Cell::Float(v) => v.to_string(),
            Cell::Str(v) => v.clone(),
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Str(v.to_string())
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Float(v)
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Int(v)
    }
}

/// A small column-ordered table: named columns plus rows of cells.
///
/// Serialized as `{"columns": [...], "rows": [[...], ...]}`; `data` is
/// accepted as an alias for `rows` for pandas split-format payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub columns: Vec<String>,
    #[serde(alias = "data")]
    pub rows: Vec<Vec<Cell>>,
}

impl Frame {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    /// Index of a named column.
    pub fn col_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| TabulaError::MissingColumn(name.to_string()))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// All cells of a named column, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<&Cell>> {
        let idx = self.col_index(name)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Numeric values of a named column; non-numeric cells become None.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let idx = self.col_index(name)?;
        Ok(self.rows.iter().map(|r| r[idx].as_f64()).collect())
    }

    /// Every row must match the column count.
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(TabulaError::InvalidRequest("frame has no columns".into()));
        }
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(TabulaError::InvalidRequest(format!(
                    "row {} has {} cells, expected {}",
                    i,
                    row.len(),
                    self.columns.len()
                )));
            }
        }
        Ok(())
    }
}

/// Ordering for sort stages: numeric when both sides are numeric,
/// lexicographic otherwise.
pub fn cmp_cells(a: &Cell, b: &Cell) -> std::cmp::Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
        _ => a.render().cmp(&b.render()),
    }
}

/// Equality used by the filter transform: numeric cells compare by value,
/// everything else by text rendering.
pub fn cells_match(cell: &Cell, value: &Cell) -> bool {
    match (cell.as_f64(), value.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => cell.render() == value.render(),
    }
}
