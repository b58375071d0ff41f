use crate::config::ColumnSpec;
use crate::model::Value;

/// Quote an identifier for embedding in SQL. Doubles any embedded quote.
/// Schema names are already validated at config load; this is the second
/// line of defense.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// One parameterized statement ready to execute. Params bind positionally
/// in the order they appear in the SQL.
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// CREATE TABLE IF NOT EXISTS from a declared column list, plus optional
/// extra columns (the result table appends sync_action this way).
pub fn create_table_sql(table: &str, columns: &[ColumnSpec], extra: &[(&str, &str)]) -> String {
    let mut defs: Vec<String> = columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), c.column_type.sql_type()))
        .collect();
    for (name, sql_type) in extra {
        defs.push(format!("{} {}", quote_ident(name), sql_type));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(table),
        defs.join(", ")
    )
}

/// Comma-joined quoted column list.
pub fn column_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| quote_ident(n))
        .collect::<Vec<_>>()
        .join(", ")
}
