use glob::Pattern;

use crate::config::{FilterConfig, FilterKind};
use crate::error::ReconError;
use crate::model::{FilterStats, Row};

// ---------------------------------------------------------------------------
// Compiled rules
// ---------------------------------------------------------------------------

pub(crate) struct CompiledRule {
    field: String,
    kind: FilterKind,
    pattern: Pattern,
}

/// Compile a filter's rules. Blank patterns are skipped with a warning so one
/// sloppy config line cannot silently exclude everything.
pub(crate) fn compile_rules(
    table: &str,
    config: &FilterConfig,
) -> Result<(Vec<CompiledRule>, Vec<String>), ReconError> {
    let mut rules = Vec::new();
    let mut warnings = Vec::new();

    for rule in &config.rules {
        if rule.pattern.trim().is_empty() {
            warnings.push(format!(
                "table '{}': skipping filter rule on '{}' with blank pattern",
                table, rule.field
            ));
            continue;
        }
        let pattern = Pattern::new(&rule.pattern).map_err(|e| ReconError::BadPattern {
            field: rule.field.clone(),
            pattern: rule.pattern.clone(),
            detail: e.to_string(),
        })?;
        rules.push(CompiledRule {
            field: rule.field.clone(),
            kind: rule.kind,
            pattern,
        });
    }

    Ok((rules, warnings))
}

// ---------------------------------------------------------------------------
// Partitioning
// ---------------------------------------------------------------------------

/// Result of running one table's rows through its filter.
pub struct FilterOutcome {
    pub passed: Vec<Row>,
    pub excluded: Vec<Row>,
    pub stats: FilterStats,
    pub warnings: Vec<String>,
}

/// Split rows into passed and excluded. A row passes when every include rule
/// matches it and no exclude rule does. Missing filter, disabled filter, or
/// zero usable rules all mean everything passes.
pub fn partition(
    table: &str,
    rows: Vec<Row>,
    filter: Option<&FilterConfig>,
) -> Result<FilterOutcome, ReconError> {
    let total = rows.len();

    let config = match filter {
        Some(f) if f.enabled => f,
        _ => {
            return Ok(FilterOutcome {
                stats: FilterStats::from_counts(total, 0),
                passed: rows,
                excluded: Vec::new(),
                warnings: Vec::new(),
            })
        }
    };

    let (rules, warnings) = compile_rules(table, config)?;
    if rules.is_empty() {
        return Ok(FilterOutcome {
            stats: FilterStats::from_counts(total, 0),
            passed: rows,
            excluded: Vec::new(),
            warnings,
        });
    }

    let mut passed = Vec::new();
    let mut excluded = Vec::new();
    for row in rows {
        if row_passes(&row, &rules) {
            passed.push(row);
        } else {
            excluded.push(row);
        }
    }

    Ok(FilterOutcome {
        stats: FilterStats::from_counts(total, excluded.len()),
        passed,
        excluded,
        warnings,
    })
}

fn row_passes(row: &Row, rules: &[CompiledRule]) -> bool {
    for rule in rules {
        // Null cells never match any pattern: an include rule rejects them,
        // an exclude rule lets them through.
        let matched = row
            .get(&rule.field)
            .as_text()
            .map(|text| rule.pattern.matches(&text))
            .unwrap_or(false);
        match rule.kind {
            FilterKind::Include if !matched => return false,
            FilterKind::Exclude if matched => return false,
            _ => {}
        }
    }
    true
}
