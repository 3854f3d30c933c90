//! Labeled tables for display and export.
//!
//! Aggregate records keep full precision. Converting one into a [`Table`]
//! is the single place where values get rounded.

use serde::Serialize;

/// One table value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
}

impl Cell {
    /// Round a real value to `places` decimals; other cells are unchanged
    pub fn rounded(self, places: u32) -> Cell {
        match self {
            Cell::Real(v) => Cell::Real(round_to(v, places)),
            other => other,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Text form used by the delimited and report writers. Null is blank.
    pub fn display(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Int(v) => v.to_string(),
            Cell::Real(v) => v.to_string(),
            Cell::Text(s) => s.clone(),
        }
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Int(v)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Real(v)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Cell::Null)
    }
}

/// Round half away from zero.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// A titled table of cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(title: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            title: title.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row. Short rows are padded with nulls.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        debug_assert!(row.len() <= self.columns.len());
        row.resize(self.columns.len(), Cell::Null);
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// File-name form of the title: lowercase with spaces as underscores
    pub fn slug(&self) -> String {
        self.title.trim().replace(' ', "_").to_lowercase()
    }

    /// Round every real cell to `places` decimals
    pub fn rounded(mut self, places: u32) -> Self {
        for row in &mut self.rows {
            for cell in row.iter_mut() {
                *cell = std::mem::replace(cell, Cell::Null).rounded(places);
            }
        }
        self
    }

    /// Text of one column, in row order
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }
}

/// Anything that renders to a display table.
pub trait ToTable {
    /// Decimal places used when the caller does not override them
    const DEFAULT_PLACES: u32;

    /// The unrounded table
    fn raw_table(&self) -> Table;

    /// The table rounded to `places`, or to [`Self::DEFAULT_PLACES`]
    fn to_table(&self, places: Option<u32>) -> Table {
        self.raw_table()
            .rounded(places.unwrap_or(Self::DEFAULT_PLACES))
    }
}
