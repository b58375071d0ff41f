use rusqlite::Connection;

use crate::check::find_duplicates;
use crate::classify::build_plan;
use crate::config::SyncConfig;
use crate::error::ReconError;
use crate::filter::partition;
use crate::matcher::join_pairs;
use crate::model::{ReconMeta, ReconReport, ReconSummary};
use crate::store::{active_table, excluded_table, Store};

/// Run one full reconciliation: load both input tables, filter, stage,
/// classify into the result table, reintroduce excluded rows if asked,
/// and check consistency.
///
/// The whole run executes inside a single transaction. A failed run leaves
/// the connection exactly as it was; a repeated run rebuilds the result
/// from scratch and produces the identical result set.
pub fn reconcile(conn: &mut Connection, config: &SyncConfig) -> Result<ReconReport, ReconError> {
    config.validate()?;

    let tx = conn.transaction().map_err(ReconError::storage)?;
    let report = run_in_tx(&tx, config)?;
    tx.commit().map_err(ReconError::storage)?;
    Ok(report)
}

fn run_in_tx(conn: &Connection, config: &SyncConfig) -> Result<ReconReport, ReconError> {
    let store = Store::new(conn);
    store.prepare(config)?;

    let mut warnings = Vec::new();

    // Filter and stage the provided side. Its excluded rows are dropped;
    // only the current side can fold exclusions back in.
    let provided_rows = store.load_rows(&config.provided)?;
    let provided = partition(
        &config.provided.table,
        provided_rows,
        config.provided.filter.as_ref(),
    )?;
    warnings.extend(provided.warnings);
    store.stage_rows(
        &active_table(&config.provided.table),
        &config.provided.columns,
        &provided.passed,
    )?;

    let current_rows = store.load_rows(&config.current)?;
    let current = partition(
        &config.current.table,
        current_rows,
        config.current.filter.as_ref(),
    )?;
    warnings.extend(current.warnings);
    store.stage_rows(
        &active_table(&config.current.table),
        &config.current.columns,
        &current.passed,
    )?;
    store.stage_rows(
        &excluded_table(&config.current.table),
        &config.current.columns,
        &current.excluded,
    )?;

    let join = join_pairs(&config.provided, &config.column_mappings, &config.current)?;
    let plan = build_plan(config, &join);

    let added = store.run(&plan.add)?;
    let updated = match &plan.update {
        Some(pass) => store.run(pass)?,
        None => 0,
    };
    let deleted = store.run(&plan.delete)?;
    let mut kept = store.run(&plan.keep)?;
    let reintroduced = match &plan.reintroduce {
        Some(pass) => store.run(pass)?,
        None => 0,
    };
    kept += reintroduced;

    let duplicates = find_duplicates(conn, &config.result)?;

    Ok(ReconReport {
        meta: ReconMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary: ReconSummary {
            total: added + updated + deleted + kept,
            added,
            updated,
            deleted,
            kept,
            reintroduced,
        },
        provided_filter: provided.stats,
        current_filter: current.stats,
        duplicates,
        warnings,
    })
}
