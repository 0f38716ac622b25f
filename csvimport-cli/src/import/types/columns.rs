//! Resolve mapping column references to cells of a row

use serde::{Deserialize, Serialize};

/// How mapping keys refer to columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnMode {
    /// Keys are 1-based column numbers
    #[default]
    Positional,
    /// Keys are header names from the first row
    HeaderNames,
}

/// Error resolving a column reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnError {
    /// Positional key is not a number of at least 1
    InvalidNumber { column: String },
    /// Header name not present in the header row
    UnknownHeader { column: String },
    /// Row is shorter than the referenced column
    MissingCell { column: String, index: usize },
}

impl std::fmt::Display for ColumnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnError::InvalidNumber { column } => {
                write!(f, "column '{}' is not a column number (1, 2, ...)", column)
            }
            ColumnError::UnknownHeader { column } => {
                write!(f, "column '{}' is not in the header row", column)
            }
            ColumnError::MissingCell { column, index } => {
                write!(f, "column {} (cell {}) is missing from the row", column, index + 1)
            }
        }
    }
}

impl std::error::Error for ColumnError {}

/// Maps column references to 0-based cell positions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnResolver {
    /// Column numbers counted from 1
    Positional,
    /// Header row captured before data rows
    Header(Vec<String>),
}

impl ColumnResolver {
    /// Resolve a column reference to a 0-based index
    pub fn index(&self, column: &str) -> Result<usize, ColumnError> {
        match self {
            ColumnResolver::Positional => match column.trim().parse::<usize>() {
                Ok(n) if n >= 1 => Ok(n - 1),
                _ => Err(ColumnError::InvalidNumber {
                    column: column.to_string(),
                }),
            },
            ColumnResolver::Header(header) => {
                // Exact match first, then case-insensitive
                header
                    .iter()
                    .position(|h| h == column)
                    .or_else(|| {
                        let wanted = column.to_lowercase();
                        header.iter().position(|h| h.trim().to_lowercase() == wanted)
                    })
                    .ok_or_else(|| ColumnError::UnknownHeader {
                        column: column.to_string(),
                    })
            }
        }
    }

    /// Get the cell a column reference points at
    pub fn cell<'r>(&self, row: &'r [String], column: &str) -> Result<&'r str, ColumnError> {
        let index = self.index(column)?;
        row.get(index)
            .map(|s| s.as_str())
            .ok_or_else(|| ColumnError::MissingCell {
                column: column.to_string(),
                index,
            })
    }
}
