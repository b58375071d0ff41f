use crate::config::SyncConfig;
use crate::model::{SyncAction, Value};
use crate::query::{quote_ident, Statement};
use crate::resolver::{
    difference_predicate, equality_predicate, resolution_expr, Side,
};
use crate::store::{active_table, excluded_table};

/// The classification passes for one run, as ready-to-execute statements.
/// Passes insert directly into the result table and run in this order:
/// add, update, delete, keep, reintroduce.
pub struct PassPlan {
    pub add: Statement,
    /// Absent when the comparison column set is empty; every matched pair
    /// then counts as KEEP.
    pub update: Option<Statement>,
    pub delete: Statement,
    pub keep: Statement,
    /// Present only when the current filter asks for excluded_as_keep.
    pub reintroduce: Option<Statement>,
}

/// Build the pass plan. `join` is the key column pairing from
/// [`crate::matcher::join_pairs`], provided side first.
pub fn build_plan(config: &SyncConfig, join: &[(String, String)]) -> PassPlan {
    let provided = quote_ident(&active_table(&config.provided.table));
    let current = quote_ident(&active_table(&config.current.table));
    let excluded = quote_ident(&excluded_table(&config.current.table));
    let result = quote_ident(&config.result.table);
    let on_keys = equality_predicate(join);
    let comparison = config.comparison_pairs();

    let header = insert_header(config, &result);

    // ADD: provided rows with no key match on the current side.
    let add = {
        let (select, mut params) = select_list(config, Side::Both);
        params.push(label(config, SyncAction::Add));
        Statement {
            sql: format!(
                "{header} SELECT {select} FROM {provided} p \
                 LEFT JOIN {current} c ON {on_keys} \
                 WHERE c.rowid IS NULL ORDER BY p.rowid"
            ),
            params,
        }
    };

    // UPDATE: matched pairs where any comparison column differs.
    let update = difference_predicate(&comparison).map(|differs| {
        let (select, mut params) = select_list(config, Side::Both);
        params.push(label(config, SyncAction::Update));
        Statement {
            sql: format!(
                "{header} SELECT {select} FROM {provided} p \
                 JOIN {current} c ON {on_keys} \
                 WHERE {differs} ORDER BY p.rowid"
            ),
            params,
        }
    });

    // DELETE: current rows with no key match on the provided side. The
    // outer join leaves every p column null, so provided sources drop out
    // of the resolution chain on their own.
    let delete = {
        let (select, mut params) = select_list(config, Side::Both);
        params.push(label(config, SyncAction::Delete));
        Statement {
            sql: format!(
                "{header} SELECT {select} FROM {current} c \
                 LEFT JOIN {provided} p ON {on_keys} \
                 WHERE p.rowid IS NULL ORDER BY c.rowid"
            ),
            params,
        }
    };

    // KEEP: matched pairs with every comparison column equal, unless the
    // resolved key is already in the result set.
    let keep = {
        let equal = equality_predicate(&comparison);
        let (select, mut params) = select_list(config, Side::Both);
        params.push(label(config, SyncAction::Keep));
        let (guard, guard_params) = key_guard(config, Side::Both, &result);
        params.extend(guard_params);
        Statement {
            sql: format!(
                "{header} SELECT {select} FROM {provided} p \
                 JOIN {current} c ON {on_keys} \
                 WHERE ({equal}) AND NOT EXISTS ({guard}) ORDER BY p.rowid"
            ),
            params,
        }
    };

    // Reintroduce: excluded current rows come back as KEEP when their key
    // is not already present.
    let reintroduce = config
        .current
        .filter
        .as_ref()
        .filter(|f| f.enabled && f.excluded_as_keep)
        .map(|_| {
            let (select, mut params) = select_list(config, Side::CurrentOnly);
            params.push(label(config, SyncAction::Keep));
            let (guard, guard_params) = key_guard(config, Side::CurrentOnly, &result);
            params.extend(guard_params);
            Statement {
                sql: format!(
                    "{header} SELECT {select} FROM {excluded} c \
                     WHERE NOT EXISTS ({guard}) ORDER BY c.rowid"
                ),
                params,
            }
        });

    PassPlan {
        add,
        update,
        delete,
        keep,
        reintroduce,
    }
}

fn label(config: &SyncConfig, action: SyncAction) -> Value {
    Value::Text(config.action_labels.label(action).to_string())
}

fn insert_header(config: &SyncConfig, result: &str) -> String {
    let mut columns: Vec<String> = config
        .result
        .fields
        .iter()
        .map(|f| quote_ident(&f.name))
        .collect();
    columns.push(quote_ident("sync_action"));
    format!("INSERT INTO {result} ({})", columns.join(", "))
}

/// Resolution expressions for every result field, plus the trailing `?`
/// that binds the action label.
fn select_list(config: &SyncConfig, side: Side) -> (String, Vec<Value>) {
    let mut parts = Vec::new();
    let mut params = Vec::new();
    for field in &config.result.fields {
        let expr = resolution_expr(field, side);
        parts.push(expr.sql);
        params.extend(expr.params);
    }
    parts.push("?".into());
    (parts.join(", "), params)
}

/// Correlated subquery matching the result table on every resolved key
/// column, null-safe.
fn key_guard(config: &SyncConfig, side: Side, result: &str) -> (String, Vec<Value>) {
    let mut terms = Vec::new();
    let mut params = Vec::new();
    for key in &config.result.key_columns {
        if let Some(field) = config.result.field(key) {
            let expr = resolution_expr(field, side);
            terms.push(format!("r.{} IS {}", quote_ident(key), expr.sql));
            params.extend(expr.params);
        }
    }
    let guard = format!("SELECT 1 FROM {result} r WHERE {}", terms.join(" AND "));
    (guard, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;

    const CONFIG: &str = r#"
name = "t"

[provided]
table = "provided"
key_columns = ["emp_id"]

[[provided.columns]]
name = "emp_id"

[[provided.columns]]
name = "name"

[current]
table = "current"
key_columns = ["employee_id"]

[[current.columns]]
name = "employee_id"

[[current.columns]]
name = "full_name"

[column_mappings]
emp_id = "employee_id"
name = "full_name"

[result]
table = "sync_result"
key_columns = ["emp_id"]

[[result.fields]]
name = "emp_id"

[[result.fields.sources]]
source = "provided"
field = "emp_id"
priority = 1

[[result.fields.sources]]
source = "current"
field = "employee_id"
priority = 2
"#;

    fn config() -> SyncConfig {
        SyncConfig::from_toml(CONFIG).unwrap()
    }

    fn join() -> Vec<(String, String)> {
        vec![("emp_id".into(), "employee_id".into())]
    }

    #[test]
    fn add_pass_is_an_anti_join() {
        let plan = build_plan(&config(), &join());
        assert!(plan.add.sql.contains("LEFT JOIN \"current_active\" c"));
        assert!(plan.add.sql.contains("WHERE c.rowid IS NULL"));
        assert!(plan.add.sql.contains("ORDER BY p.rowid"));
        assert_eq!(plan.add.params, vec![Value::Text("ADD".into())]);
    }

    #[test]
    fn update_pass_compares_all_mapped_pairs() {
        let plan = build_plan(&config(), &join());
        let update = plan.update.unwrap();
        assert!(update.sql.contains("p.\"emp_id\" IS NOT c.\"employee_id\""));
        assert!(update.sql.contains("p.\"name\" IS NOT c.\"full_name\""));
    }

    #[test]
    fn empty_comparison_set_skips_update() {
        let input = CONFIG
            .replace("emp_id = \"employee_id\"\nname = \"full_name\"", "")
            .replace("[column_mappings]", "");
        let config = SyncConfig::from_toml(&input).unwrap();
        let plan = build_plan(&config, &join());
        assert!(plan.update.is_none());
        // KEEP then accepts every matched pair.
        assert!(plan.keep.sql.contains("WHERE (1)"));
    }

    #[test]
    fn delete_pass_reads_from_the_current_side() {
        let plan = build_plan(&config(), &join());
        assert!(plan.delete.sql.starts_with("INSERT INTO \"sync_result\""));
        assert!(plan.delete.sql.contains("FROM \"current_active\" c"));
        assert!(plan.delete.sql.contains("WHERE p.rowid IS NULL"));
        assert!(plan.delete.sql.contains("ORDER BY c.rowid"));
    }

    #[test]
    fn keep_pass_guards_on_resolved_keys() {
        let plan = build_plan(&config(), &join());
        assert!(plan.keep.sql.contains("NOT EXISTS (SELECT 1 FROM \"sync_result\" r"));
        assert!(plan.keep.sql.contains("r.\"emp_id\" IS"));
    }

    #[test]
    fn reintroduce_only_when_requested() {
        let plan = build_plan(&config(), &join());
        assert!(plan.reintroduce.is_none());

        let input = format!(
            "{CONFIG}\n[current.filter]\nenabled = true\nexcluded_as_keep = true\n\n[[current.filter.rules]]\nfield = \"employee_id\"\ntype = \"exclude\"\npattern = \"Z*\"\n"
        );
        let config = SyncConfig::from_toml(&input).unwrap();
        let plan = build_plan(&config, &join());
        let pass = plan.reintroduce.unwrap();
        assert!(pass.sql.contains("FROM \"current_excluded\" c"));
        // Provided sources are masked out of the key expression.
        assert!(!pass.sql.contains("p.\"emp_id\""));
        assert_eq!(pass.params[0], Value::Text("KEEP".into()));
    }

    #[test]
    fn custom_labels_flow_into_params() {
        let input = format!("{CONFIG}\n[action_labels]\nadd = \"NEW\"\n");
        let config = SyncConfig::from_toml(&input).unwrap();
        let plan = build_plan(&config, &join());
        assert_eq!(plan.add.params, vec![Value::Text("NEW".into())]);
    }
}
