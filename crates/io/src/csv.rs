//! CSV import into input tables and export of the result table.

use rusqlite::{params_from_iter, Connection};

use tabsync_recon::config::{ColumnType, ResultConfig, TableConfig};
use tabsync_recon::model::Value;
use tabsync_recon::query::{column_list, create_table_sql, quote_ident};

use crate::IoError;

/// Load CSV content into an input table, replacing whatever was there.
///
/// The header row maps CSV columns onto the declared schema by name.
/// Columns the schema does not declare are ignored; declared columns
/// absent from the header read as null unless marked required. Empty
/// cells become null. Returns the number of imported rows.
pub fn import_csv(
    conn: &Connection,
    table: &TableConfig,
    content: &str,
) -> Result<usize, IoError> {
    let create = create_table_sql(&table.table, &table.columns, &[]);
    conn.execute(&create, []).map_err(IoError::storage)?;
    conn.execute(&format!("DELETE FROM {}", quote_ident(&table.table)), [])
        .map_err(IoError::storage)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| IoError::Parse {
            line: 1,
            detail: e.to_string(),
        })?
        .clone();

    // Declared column → position in the CSV record.
    let positions: Vec<Option<usize>> = table
        .columns
        .iter()
        .map(|col| headers.iter().position(|h| h == col.name))
        .collect();
    for (col, position) in table.columns.iter().zip(&positions) {
        if col.required && position.is_none() {
            return Err(IoError::MissingColumn {
                table: table.table.clone(),
                column: col.name.clone(),
            });
        }
    }

    let names: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
    let placeholders = vec!["?"; names.len()].join(", ");
    let insert = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(&table.table),
        column_list(&names),
        placeholders
    );
    let mut stmt = conn.prepare(&insert).map_err(IoError::storage)?;

    let mut imported = 0usize;
    for (index, record) in reader.records().enumerate() {
        // Header is line 1, first record line 2.
        let line = index + 2;
        let record = record.map_err(|e| IoError::Parse {
            line,
            detail: e.to_string(),
        })?;

        let mut values = Vec::with_capacity(table.columns.len());
        for (col, position) in table.columns.iter().zip(&positions) {
            let cell = position.and_then(|i| record.get(i)).unwrap_or("");
            values.push(parse_cell(cell, col.column_type, &col.name, line)?);
        }
        stmt.execute(params_from_iter(&values))
            .map_err(IoError::storage)?;
        imported += 1;
    }

    Ok(imported)
}

fn parse_cell(cell: &str, kind: ColumnType, column: &str, line: usize) -> Result<Value, IoError> {
    if cell.is_empty() {
        return Ok(Value::Null);
    }
    match kind {
        ColumnType::Text => Ok(Value::Text(cell.to_string())),
        ColumnType::Integer => cell.trim().parse::<i64>().map(Value::Integer).map_err(|_| {
            IoError::Parse {
                line,
                detail: format!("column '{column}': '{cell}' is not an integer"),
            }
        }),
    }
}

/// Serialize the result table to CSV, fields in declared order with
/// sync_action last, rows in classification order. Null cells export as
/// empty.
pub fn export_csv(conn: &Connection, result: &ResultConfig) -> Result<String, IoError> {
    let mut names: Vec<String> = result.fields.iter().map(|f| f.name.clone()).collect();
    names.push("sync_action".into());

    let sql = format!(
        "SELECT {} FROM {} ORDER BY rowid",
        column_list(&names),
        quote_ident(&result.table)
    );
    let mut stmt = conn.prepare(&sql).map_err(IoError::storage)?;
    let mut rows = stmt.query([]).map_err(IoError::storage)?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(&names)
        .map_err(|e| IoError::Write(e.to_string()))?;

    while let Some(row) = rows.next().map_err(IoError::storage)? {
        let mut record = Vec::with_capacity(names.len());
        for i in 0..names.len() {
            let cell = match row.get_ref(i).map_err(IoError::storage)? {
                rusqlite::types::ValueRef::Null => String::new(),
                rusqlite::types::ValueRef::Integer(n) => n.to_string(),
                rusqlite::types::ValueRef::Text(bytes) => {
                    String::from_utf8_lossy(bytes).into_owned()
                }
                other => {
                    return Err(IoError::Write(format!(
                        "unexpected storage class: {:?}",
                        other.data_type()
                    )))
                }
            };
            record.push(cell);
        }
        writer
            .write_record(&record)
            .map_err(|e| IoError::Write(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| IoError::Write(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| IoError::Write(e.to_string()))
}
