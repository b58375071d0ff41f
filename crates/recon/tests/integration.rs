use rusqlite::Connection;
use tabsync_recon::{reconcile, SyncConfig};

const CONFIG: &str = r#"
name = "Employees"

[provided]
table = "provided"
key_columns = ["emp_id"]

[[provided.columns]]
name = "emp_id"
required = true

[[provided.columns]]
name = "name"

[current]
table = "current"
key_columns = ["employee_id"]

[[current.columns]]
name = "employee_id"
required = true

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

[[result.fields]]
name = "name"

[[result.fields.sources]]
source = "provided"
field = "name"
priority = 1

[[result.fields.sources]]
source = "current"
field = "full_name"
priority = 2
"#;

fn conn_with_inputs(provided: &[(&str, &str)], current: &[(&str, &str)]) -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute("CREATE TABLE provided (emp_id TEXT, name TEXT)", [])
        .unwrap();
    conn.execute(
        "CREATE TABLE current (employee_id TEXT, full_name TEXT)",
        [],
    )
    .unwrap();
    for (id, name) in provided {
        conn.execute("INSERT INTO provided VALUES (?, ?)", [id, name])
            .unwrap();
    }
    for (id, name) in current {
        conn.execute("INSERT INTO current VALUES (?, ?)", [id, name])
            .unwrap();
    }
    conn
}

fn standard_conn() -> Connection {
    conn_with_inputs(
        &[("1", "Alice"), ("2", "Bobby"), ("4", "Dora")],
        &[("1", "Alice"), ("2", "Bob"), ("3", "Carol")],
    )
}

fn result_rows(conn: &Connection) -> Vec<(String, String, String)> {
    let mut stmt = conn
        .prepare("SELECT emp_id, name, sync_action FROM sync_result ORDER BY emp_id")
        .unwrap();
    let rows = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
        .unwrap();
    rows.map(Result::unwrap).collect()
}

#[test]
fn classifies_all_four_actions() {
    let mut conn = standard_conn();
    let config = SyncConfig::from_toml(CONFIG).unwrap();
    let report = reconcile(&mut conn, &config).unwrap();

    assert_eq!(report.summary.added, 1);
    assert_eq!(report.summary.updated, 1);
    assert_eq!(report.summary.deleted, 1);
    assert_eq!(report.summary.kept, 1);
    assert_eq!(report.summary.total, 4);

    let rows = result_rows(&conn);
    assert_eq!(
        rows,
        vec![
            ("1".into(), "Alice".into(), "KEEP".into()),
            ("2".into(), "Bobby".into(), "UPDATE".into()),
            ("3".into(), "Carol".into(), "DELETE".into()),
            ("4".into(), "Dora".into(), "ADD".into()),
        ]
    );
}

#[test]
fn every_entity_appears_exactly_once() {
    let mut conn = standard_conn();
    let config = SyncConfig::from_toml(CONFIG).unwrap();
    let report = reconcile(&mut conn, &config).unwrap();

    let rows = result_rows(&conn);
    assert_eq!(rows.len(), report.summary.total);
    let mut keys: Vec<&str> = rows.iter().map(|(id, _, _)| id.as_str()).collect();
    keys.dedup();
    assert_eq!(keys, vec!["1", "2", "3", "4"]);
    assert!(report.is_consistent());
}

#[test]
fn update_prefers_the_provided_value() {
    let mut conn = standard_conn();
    let config = SyncConfig::from_toml(CONFIG).unwrap();
    reconcile(&mut conn, &config).unwrap();

    let name: String = conn
        .query_row(
            "SELECT name FROM sync_result WHERE emp_id = '2'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(name, "Bobby");
}

#[test]
fn empty_provided_text_falls_back_to_current() {
    let mut conn = conn_with_inputs(&[("1", "")], &[("1", "Alice")]);
    let config = SyncConfig::from_toml(CONFIG).unwrap();
    reconcile(&mut conn, &config).unwrap();

    let rows = result_rows(&conn);
    assert_eq!(rows.len(), 1);
    // Differs under null-safe comparison, so it is an UPDATE, but the
    // resolved name comes from the current side.
    assert_eq!(rows[0], ("1".into(), "Alice".into(), "UPDATE".into()));
}

#[test]
fn delete_rows_resolve_from_current_sources() {
    let mut conn = conn_with_inputs(&[], &[("9", "Zoe")]);
    let config = SyncConfig::from_toml(CONFIG).unwrap();
    let report = reconcile(&mut conn, &config).unwrap();

    assert_eq!(report.summary.deleted, 1);
    assert_eq!(
        result_rows(&conn),
        vec![("9".into(), "Zoe".into(), "DELETE".into())]
    );
}

#[test]
fn empty_current_adds_everything() {
    let mut conn = conn_with_inputs(&[("1", "Alice"), ("2", "Bob")], &[]);
    let config = SyncConfig::from_toml(CONFIG).unwrap();
    let report = reconcile(&mut conn, &config).unwrap();

    assert_eq!(report.summary.added, 2);
    assert_eq!(report.summary.total, 2);
}

#[test]
fn both_sides_empty_yield_empty_result() {
    let mut conn = conn_with_inputs(&[], &[]);
    let config = SyncConfig::from_toml(CONFIG).unwrap();
    let report = reconcile(&mut conn, &config).unwrap();

    assert_eq!(report.summary.total, 0);
    assert!(result_rows(&conn).is_empty());
    assert!(report.is_consistent());
}

#[test]
fn rerun_produces_identical_results() {
    let mut conn = standard_conn();
    let config = SyncConfig::from_toml(CONFIG).unwrap();

    let first = reconcile(&mut conn, &config).unwrap();
    let rows_first = result_rows(&conn);

    let second = reconcile(&mut conn, &config).unwrap();
    let rows_second = result_rows(&conn);

    assert_eq!(rows_first, rows_second);
    assert_eq!(first.summary, second.summary);
}

#[test]
fn provided_filter_excludes_before_classification() {
    let mut conn = standard_conn();
    let input = format!(
        "{CONFIG}\n[provided.filter]\nenabled = true\n\n[[provided.filter.rules]]\nfield = \"emp_id\"\ntype = \"exclude\"\npattern = \"4\"\n"
    );
    let config = SyncConfig::from_toml(&input).unwrap();
    let report = reconcile(&mut conn, &config).unwrap();

    assert_eq!(report.summary.added, 0);
    assert_eq!(report.provided_filter.excluded, 1);
    assert_eq!(report.provided_filter.total, 3);
    assert!(!result_rows(&conn).iter().any(|(id, _, _)| id == "4"));
}

#[test]
fn excluded_current_rows_vanish_by_default() {
    let mut conn = standard_conn();
    let input = format!(
        "{CONFIG}\n[current.filter]\nenabled = true\n\n[[current.filter.rules]]\nfield = \"employee_id\"\ntype = \"exclude\"\npattern = \"3\"\n"
    );
    let config = SyncConfig::from_toml(&input).unwrap();
    let report = reconcile(&mut conn, &config).unwrap();

    // Carol is excluded, not deleted: the row never enters classification.
    assert_eq!(report.summary.deleted, 0);
    assert_eq!(report.summary.reintroduced, 0);
    assert!(!result_rows(&conn).iter().any(|(id, _, _)| id == "3"));
}

#[test]
fn excluded_as_keep_reintroduces_current_rows() {
    let mut conn = standard_conn();
    let input = format!(
        "{CONFIG}\n[current.filter]\nenabled = true\nexcluded_as_keep = true\n\n[[current.filter.rules]]\nfield = \"employee_id\"\ntype = \"exclude\"\npattern = \"3\"\n"
    );
    let config = SyncConfig::from_toml(&input).unwrap();
    let report = reconcile(&mut conn, &config).unwrap();

    assert_eq!(report.summary.reintroduced, 1);
    assert_eq!(report.summary.kept, 2);
    let rows = result_rows(&conn);
    let carol = rows.iter().find(|(id, _, _)| id == "3").unwrap();
    assert_eq!(carol.2, "KEEP");
    assert_eq!(carol.1, "Carol");
}

#[test]
fn reintroduction_skips_keys_already_present() {
    // Key 1 is excluded from current but still matched is impossible; here
    // key 1 appears twice in current, once excluded. The surviving copy
    // classifies normally and the excluded copy must not come back.
    let mut conn = conn_with_inputs(
        &[("1", "Alice")],
        &[("1", "Alice"), ("1", "Alice-old")],
    );
    let input = format!(
        "{CONFIG}\n[current.filter]\nenabled = true\nexcluded_as_keep = true\n\n[[current.filter.rules]]\nfield = \"full_name\"\ntype = \"exclude\"\npattern = \"*-old\"\n"
    );
    let config = SyncConfig::from_toml(&input).unwrap();
    let report = reconcile(&mut conn, &config).unwrap();

    assert_eq!(report.summary.reintroduced, 0);
    assert_eq!(result_rows(&conn).len(), 1);
    assert!(report.is_consistent());
}

#[test]
fn duplicate_input_keys_are_reported_not_prevented() {
    let mut conn = conn_with_inputs(
        &[("2", "Bobby"), ("2", "Bobbie")],
        &[("2", "Bob")],
    );
    let config = SyncConfig::from_toml(CONFIG).unwrap();
    let report = reconcile(&mut conn, &config).unwrap();

    // Both provided rows match and differ, so both land in the result.
    assert_eq!(report.summary.updated, 2);
    assert!(!report.is_consistent());
    assert_eq!(report.duplicates.len(), 1);
    assert_eq!(report.duplicates[0].count, 2);
}

#[test]
fn custom_action_labels_reach_the_result_table() {
    let mut conn = standard_conn();
    let input = format!(
        "{CONFIG}\n[action_labels]\nadd = \"1\"\nupdate = \"2\"\ndelete = \"3\"\nkeep = \"4\"\n"
    );
    let config = SyncConfig::from_toml(&input).unwrap();
    reconcile(&mut conn, &config).unwrap();

    let rows = result_rows(&conn);
    let actions: Vec<&str> = rows.iter().map(|(_, _, a)| a.as_str()).collect();
    assert_eq!(actions, vec!["4", "2", "3", "1"]);
}

#[test]
fn report_serializes_to_json() {
    let mut conn = standard_conn();
    let config = SyncConfig::from_toml(CONFIG).unwrap();
    let report = reconcile(&mut conn, &config).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["meta"]["config_name"], "Employees");
    assert_eq!(json["summary"]["added"], 1);
    assert_eq!(json["provided_filter"]["total"], 3);
    assert!(json["duplicates"].as_array().unwrap().is_empty());
}

#[test]
fn identity_key_names_need_no_mapping() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute("CREATE TABLE provided (id TEXT, v TEXT)", [])
        .unwrap();
    conn.execute("CREATE TABLE current (id TEXT, v TEXT)", [])
        .unwrap();
    conn.execute("INSERT INTO provided VALUES ('a', '1')", [])
        .unwrap();
    conn.execute("INSERT INTO current VALUES ('a', '1')", [])
        .unwrap();

    let toml = r#"
name = "identity"

[provided]
table = "provided"
key_columns = ["id"]

[[provided.columns]]
name = "id"

[[provided.columns]]
name = "v"

[current]
table = "current"
key_columns = ["id"]

[[current.columns]]
name = "id"

[[current.columns]]
name = "v"

[column_mappings]
id = "id"
v = "v"

[result]
table = "sync_result"
key_columns = ["id"]

[[result.fields]]
name = "id"

[[result.fields.sources]]
source = "provided"
field = "id"
priority = 1
"#;
    let config = SyncConfig::from_toml(toml).unwrap();
    let mut conn = conn;
    let report = reconcile(&mut conn, &config).unwrap();
    assert_eq!(report.summary.kept, 1);
    assert_eq!(report.summary.total, 1);
}
