use std::collections::BTreeMap;

use rusqlite::Connection;

use crate::config::ResultConfig;
use crate::error::ReconError;
use crate::model::DuplicateKey;
use crate::query::{column_list, quote_ident};
use crate::store::value_from_ref;

/// Find result key combinations that occur more than once. Classification
/// does not prevent duplicates (duplicate keys in an input produce them);
/// this reports them after the fact so callers can decide what to do.
pub fn find_duplicates(
    conn: &Connection,
    result: &ResultConfig,
) -> Result<Vec<DuplicateKey>, ReconError> {
    let keys = column_list(&result.key_columns);
    let sql = format!(
        "SELECT {keys}, COUNT(*) FROM {} GROUP BY {keys} HAVING COUNT(*) > 1 ORDER BY {keys}",
        quote_ident(&result.table)
    );

    let mut stmt = conn.prepare(&sql).map_err(ReconError::storage)?;
    let mut rows = stmt.query([]).map_err(ReconError::storage)?;

    let mut duplicates = Vec::new();
    while let Some(row) = rows.next().map_err(ReconError::storage)? {
        let mut key = BTreeMap::new();
        for (i, name) in result.key_columns.iter().enumerate() {
            let value = value_from_ref(row.get_ref(i).map_err(ReconError::storage)?)?;
            key.insert(name.clone(), value);
        }
        let count: i64 = row
            .get(result.key_columns.len())
            .map_err(ReconError::storage)?;
        duplicates.push(DuplicateKey { key, count });
    }
    Ok(duplicates)
}
