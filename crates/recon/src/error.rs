use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad mapping, empty source list, etc.).
    ConfigValidation(String),
    /// A table declares zero key columns.
    MissingKeyColumns { table: String },
    /// A referenced column does not exist in its table's schema.
    UnknownColumn { table: String, column: String },
    /// Duplicate or non-positive priority in a field's source list.
    BadPriority { field: String, detail: String },
    /// Invalid glob pattern in a filter rule.
    BadPattern {
        field: String,
        pattern: String,
        detail: String,
    },
    /// Embedded store failure.
    Storage(String),
}

impl ReconError {
    pub(crate) fn storage(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }

    /// Configuration errors are fatal and never retried; storage errors may
    /// be retried by re-running the whole rebuild.
    pub fn is_config(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingKeyColumns { table } => {
                write!(f, "table '{table}' declares no key columns")
            }
            Self::UnknownColumn { table, column } => {
                write!(f, "table '{table}': unknown column '{column}'")
            }
            Self::BadPriority { field, detail } => {
                write!(f, "field '{field}': bad priority list: {detail}")
            }
            Self::BadPattern {
                field,
                pattern,
                detail,
            } => {
                write!(f, "filter on '{field}': invalid pattern '{pattern}': {detail}")
            }
            Self::Storage(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_identifier() {
        let err = ReconError::UnknownColumn {
            table: "provided".into(),
            column: "emp_id".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("provided"));
        assert!(msg.contains("emp_id"));
    }

    #[test]
    fn storage_is_not_a_config_error() {
        assert!(!ReconError::Storage("locked".into()).is_config());
        assert!(ReconError::MissingKeyColumns {
            table: "current".into()
        }
        .is_config());
    }
}
