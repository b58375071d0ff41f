use crate::config::{FieldRule, SourceKind};
use crate::model::{Row, Value};
use crate::query::quote_ident;

// ---------------------------------------------------------------------------
// In-memory resolution
// ---------------------------------------------------------------------------

/// Resolve one result field from the available sides: walk the field's
/// sources in ascending priority and take the first non-empty value.
/// Empty text counts as missing, same as null.
pub fn resolve(field: &FieldRule, provided: Option<&Row>, current: Option<&Row>) -> Value {
    for source in field.sorted_sources() {
        let value = match source.source {
            SourceKind::Provided => provided
                .zip(source.field.as_deref())
                .map(|(row, name)| row.get(name).clone()),
            SourceKind::Current => current
                .zip(source.field.as_deref())
                .map(|(row, name)| row.get(name).clone()),
            SourceKind::Fixed => source.value.clone().map(Value::Text),
        };
        if let Some(v) = value {
            if !v.is_empty() {
                return v;
            }
        }
    }
    Value::Null
}

// ---------------------------------------------------------------------------
// SQL resolution expressions
// ---------------------------------------------------------------------------

/// Which input sides a classification pass can see. A pass built from the
/// current table alone masks provided sources out of the expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Both,
    CurrentOnly,
}

/// A SQL fragment plus its positional parameters, in order.
pub struct SqlExpr {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Build the COALESCE chain for one result field. Provided columns read as
/// `p."name"`, current columns as `c."name"`, fixed values bind as
/// parameters. Every part is wrapped in NULLIF(.., '') so empty text loses
/// to lower-priority sources, matching [`resolve`].
pub fn resolution_expr(field: &FieldRule, side: Side) -> SqlExpr {
    let mut parts = Vec::new();
    let mut params = Vec::new();

    for source in field.sorted_sources() {
        match source.source {
            SourceKind::Provided => {
                if side == Side::CurrentOnly {
                    continue;
                }
                if let Some(name) = source.field.as_deref() {
                    parts.push(format!("NULLIF(p.{}, '')", quote_ident(name)));
                }
            }
            SourceKind::Current => {
                if let Some(name) = source.field.as_deref() {
                    parts.push(format!("NULLIF(c.{}, '')", quote_ident(name)));
                }
            }
            SourceKind::Fixed => {
                if let Some(value) = &source.value {
                    parts.push("NULLIF(?, '')".into());
                    params.push(Value::Text(value.clone()));
                }
            }
        }
    }

    let sql = match parts.len() {
        0 => "NULL".into(),
        1 => parts.remove(0),
        _ => format!("COALESCE({})", parts.join(", ")),
    };
    SqlExpr { sql, params }
}

// ---------------------------------------------------------------------------
// Join predicates
// ---------------------------------------------------------------------------

/// OR of null-safe inequality over the comparison pairs. None when there is
/// nothing to compare, so the caller can skip the pass entirely.
pub fn difference_predicate(pairs: &[(String, String)]) -> Option<String> {
    if pairs.is_empty() {
        return None;
    }
    let terms: Vec<String> = pairs
        .iter()
        .map(|(p, c)| format!("p.{} IS NOT c.{}", quote_ident(p), quote_ident(c)))
        .collect();
    Some(terms.join(" OR "))
}

/// AND of null-safe equality over the comparison pairs. `1` (always true)
/// when empty, for the pass that picks up everything UPDATE left behind.
pub fn equality_predicate(pairs: &[(String, String)]) -> String {
    if pairs.is_empty() {
        return "1".into();
    }
    let terms: Vec<String> = pairs
        .iter()
        .map(|(p, c)| format!("p.{} IS c.{}", quote_ident(p), quote_ident(c)))
        .collect();
    terms.join(" AND ")
}
