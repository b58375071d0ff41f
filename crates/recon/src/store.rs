use std::thread;
use std::time::Duration;

use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection, ErrorCode};

use crate::config::{ColumnSpec, SyncConfig, TableConfig};
use crate::error::ReconError;
use crate::model::{Row, Value};
use crate::query::{column_list, create_table_sql, quote_ident, Statement};

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE: Duration = Duration::from_millis(25);

/// Scratch table holding the filtered-in rows of an input table.
pub fn active_table(name: &str) -> String {
    format!("{name}_active")
}

/// Scratch table holding the filtered-out rows of an input table.
pub fn excluded_table(name: &str) -> String {
    format!("{name}_excluded")
}

/// Thin wrapper over the embedded store. Holds a borrowed connection so a
/// caller can hand in a transaction and keep the whole run atomic.
pub struct Store<'a> {
    conn: &'a Connection,
}

impl<'a> Store<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create the scratch and result tables if missing and empty them out.
    /// Every run rebuilds from scratch; re-running a config is idempotent.
    pub fn prepare(&self, config: &SyncConfig) -> Result<(), ReconError> {
        let result_columns: Vec<ColumnSpec> = config
            .result
            .fields
            .iter()
            .map(|f| ColumnSpec {
                name: f.name.clone(),
                column_type: f.column_type,
                required: false,
                include: true,
            })
            .collect();

        let tables = [
            create_table_sql(
                &active_table(&config.provided.table),
                &config.provided.columns,
                &[],
            ),
            create_table_sql(
                &active_table(&config.current.table),
                &config.current.columns,
                &[],
            ),
            create_table_sql(
                &excluded_table(&config.current.table),
                &config.current.columns,
                &[],
            ),
            create_table_sql(
                &config.result.table,
                &result_columns,
                &[("sync_action", "TEXT")],
            ),
        ];

        for sql in &tables {
            self.with_retry(|| self.conn.execute(sql, []))?;
        }
        for name in [
            active_table(&config.provided.table),
            active_table(&config.current.table),
            excluded_table(&config.current.table),
            config.result.table.clone(),
        ] {
            let sql = format!("DELETE FROM {}", quote_ident(&name));
            self.with_retry(|| self.conn.execute(&sql, []))?;
        }
        Ok(())
    }

    /// Read all rows of an input table in insertion order.
    pub fn load_rows(&self, table: &TableConfig) -> Result<Vec<Row>, ReconError> {
        let names: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
        let sql = format!(
            "SELECT {} FROM {} ORDER BY rowid",
            column_list(&names),
            quote_ident(&table.table)
        );

        let mut stmt = self.conn.prepare(&sql).map_err(ReconError::storage)?;
        let mut rows = stmt.query([]).map_err(ReconError::storage)?;

        let mut out = Vec::new();
        while let Some(sql_row) = rows.next().map_err(ReconError::storage)? {
            let mut row = Row::new();
            for (i, name) in names.iter().enumerate() {
                let value = value_from_ref(sql_row.get_ref(i).map_err(ReconError::storage)?)?;
                row.set(name.clone(), value);
            }
            out.push(row);
        }
        Ok(out)
    }

    /// Bulk-insert rows into a scratch table, preserving order.
    pub fn stage_rows(
        &self,
        table_name: &str,
        columns: &[ColumnSpec],
        rows: &[Row],
    ) -> Result<(), ReconError> {
        if rows.is_empty() {
            return Ok(());
        }
        let names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
        let placeholders = vec!["?"; names.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table_name),
            column_list(&names),
            placeholders
        );

        let mut stmt = self.conn.prepare(&sql).map_err(ReconError::storage)?;
        for row in rows {
            let values = names.iter().map(|n| row.get(n));
            stmt.execute(params_from_iter(values))
                .map_err(ReconError::storage)?;
        }
        Ok(())
    }

    /// Execute one classification statement, returning the inserted count.
    pub fn run(&self, statement: &Statement) -> Result<usize, ReconError> {
        self.with_retry(|| {
            self.conn
                .execute(&statement.sql, params_from_iter(&statement.params))
        })
    }

    /// Retry transient lock errors with a short linear backoff. Anything
    /// else surfaces immediately.
    fn with_retry<T>(
        &self,
        mut op: impl FnMut() -> rusqlite::Result<T>,
    ) -> Result<T, ReconError> {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(v) => return Ok(v),
                Err(e) if attempt < RETRY_ATTEMPTS && is_transient(&e) => {
                    thread::sleep(RETRY_BASE * attempt);
                    attempt += 1;
                }
                Err(e) => return Err(ReconError::storage(e)),
            }
        }
    }
}

fn is_transient(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(
                failure.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            )
    )
}

/// Map a stored cell back into the engine's value model. Inputs are staged
/// as TEXT or INTEGER only, so other storage classes indicate corruption.
pub(crate) fn value_from_ref(value: ValueRef<'_>) -> Result<Value, ReconError> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(n) => Ok(Value::Integer(n)),
        ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
            Ok(s) => Ok(Value::Text(s.to_string())),
            Err(e) => Err(ReconError::Storage(format!("invalid utf-8 in cell: {e}"))),
        },
        other => Err(ReconError::Storage(format!(
            "unexpected storage class: {:?}",
            other.data_type()
        ))),
    }
}
