use std::collections::BTreeMap;

use crate::config::TableConfig;
use crate::error::ReconError;

/// Resolve the join column pairs between a left table and a right table.
///
/// Each left key column is translated in order of preference: a forward
/// mapping entry, then an inverse entry (the mapping read right-to-left),
/// then the identity name. The resulting right-side column must exist in the
/// right table's schema.
pub fn join_pairs(
    left: &TableConfig,
    mapping: &BTreeMap<String, String>,
    right: &TableConfig,
) -> Result<Vec<(String, String)>, ReconError> {
    if left.key_columns.is_empty() {
        return Err(ReconError::MissingKeyColumns {
            table: left.table.clone(),
        });
    }

    let inverse: BTreeMap<&str, &str> = mapping
        .iter()
        .map(|(k, v)| (v.as_str(), k.as_str()))
        .collect();

    let mut pairs = Vec::with_capacity(left.key_columns.len());
    for key in &left.key_columns {
        let right_name = mapping
            .get(key)
            .map(String::as_str)
            .or_else(|| inverse.get(key.as_str()).copied())
            .unwrap_or(key);

        if !right.has_column(right_name) {
            return Err(ReconError::UnknownColumn {
                table: right.table.clone(),
                column: right_name.to_string(),
            });
        }
        pairs.push((key.clone(), right_name.to_string()));
    }

    Ok(pairs)
}
