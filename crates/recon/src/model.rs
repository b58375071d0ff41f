use std::collections::BTreeMap;

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Values + rows
// ---------------------------------------------------------------------------

/// A scalar cell value. Empty text counts as null for resolution purposes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Text(String),
    Null,
}

impl Value {
    /// Null, or empty text.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            Value::Integer(_) => false,
        }
    }

    /// Text rendering used by glob filters and CSV export. Null has none.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Text(s) => Some(s.clone()),
            Value::Integer(n) => Some(n.to_string()),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Integer(n) => ToSqlOutput::Owned(SqlValue::Integer(*n)),
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
        })
    }
}

static NULL: Value = Value::Null;

/// One record: column name → value. Column order is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: BTreeMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        self.values.insert(column.into(), value);
    }

    /// Value for a column; absent columns read as null.
    pub fn get(&self, column: &str) -> &Value {
        self.values.get(column).unwrap_or(&NULL)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Classification assigned to each reconciled entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Add,
    Update,
    Delete,
    Keep,
}

impl SyncAction {
    pub fn all() -> [SyncAction; 4] {
        [
            SyncAction::Add,
            SyncAction::Update,
            SyncAction::Delete,
            SyncAction::Keep,
        ]
    }
}

impl std::fmt::Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Add => write!(f, "ADD"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
            Self::Keep => write!(f, "KEEP"),
        }
    }
}

// ---------------------------------------------------------------------------
// Filter statistics
// ---------------------------------------------------------------------------

/// Side-channel counts from one table's filter pass. Observability only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterStats {
    pub total: usize,
    pub passed: usize,
    pub excluded: usize,
    /// excluded / total, rounded to two decimals. 0.0 for empty input.
    pub exclusion_rate: f64,
}

impl FilterStats {
    pub fn from_counts(total: usize, excluded: usize) -> Self {
        let rate = if total == 0 {
            0.0
        } else {
            let raw = excluded as f64 / total as f64;
            (raw * 100.0).round() / 100.0
        };
        Self {
            total,
            passed: total - excluded,
            excluded,
            exclusion_rate: rate,
        }
    }
}

// ---------------------------------------------------------------------------
// Consistency violations
// ---------------------------------------------------------------------------

/// A result-set key combination that appears more than once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateKey {
    pub key: BTreeMap<String, Value>,
    pub count: i64,
}

// ---------------------------------------------------------------------------
// Summary + report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconSummary {
    pub total: usize,
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
    pub kept: usize,
    /// Filtered-out current rows folded back in as KEEP.
    pub reintroduced: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, Serialize)]
pub struct ReconReport {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub provided_filter: FilterStats,
    pub current_filter: FilterStats,
    /// Duplicate result keys found post-classification. Reported, not fatal.
    pub duplicates: Vec<DuplicateKey>,
    pub warnings: Vec<String>,
}

impl ReconReport {
    /// True when the consistency check found no duplicate keys.
    pub fn is_consistent(&self) -> bool {
        self.duplicates.is_empty()
    }
}
