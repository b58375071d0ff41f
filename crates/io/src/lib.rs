//! CSV I/O for the reconciliation engine.
//!
//! Imports input snapshots into the embedded store's tables and exports
//! the classified result set back out. The engine itself never touches
//! files; everything on disk goes through this crate.

pub mod csv;

use std::fmt;

#[derive(Debug)]
pub enum IoError {
    /// Malformed CSV or a cell that does not parse as its declared type.
    Parse { line: usize, detail: String },
    /// A required column is absent from the CSV header.
    MissingColumn { table: String, column: String },
    /// Embedded store failure.
    Storage(String),
    /// CSV serialization failure on export.
    Write(String),
}

impl IoError {
    pub(crate) fn storage(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse { line, detail } => write!(f, "line {line}: {detail}"),
            Self::MissingColumn { table, column } => {
                write!(f, "table '{table}': required column '{column}' missing from header")
            }
            Self::Storage(msg) => write!(f, "storage error: {msg}"),
            Self::Write(msg) => write!(f, "export error: {msg}"),
        }
    }
}

impl std::error::Error for IoError {}
