use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::error::ReconError;
use crate::model::SyncAction;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// A full reconciliation configuration: two input table schemas, the
/// provided→current column mapping, the result-field resolution rules, and
/// the action label vocabulary. Validated once at load; the engine never
/// inspects shape at runtime.
#[derive(Debug, Deserialize)]
pub struct SyncConfig {
    pub name: String,
    pub provided: TableConfig,
    pub current: TableConfig,
    /// Provided column name → current column name. One-directional; the
    /// matcher derives the reverse by swapping.
    #[serde(default)]
    pub column_mappings: BTreeMap<String, String>,
    pub result: ResultConfig,
    #[serde(default)]
    pub action_labels: ActionLabels,
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct TableConfig {
    pub table: String,
    /// Default CSV path hint for the CLI. The engine ignores it.
    #[serde(default)]
    pub file: Option<String>,
    pub columns: Vec<ColumnSpec>,
    pub key_columns: Vec<String>,
    #[serde(default)]
    pub filter: Option<FilterConfig>,
}

impl TableConfig {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub column_type: ColumnType,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_true")]
    pub include: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Integer,
}

impl ColumnType {
    pub fn sql_type(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
        }
    }
}

impl Default for ColumnType {
    fn default() -> Self {
        Self::Text
    }
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub rules: Vec<FilterRule>,
    /// Fold rows this filter excludes back into the result as KEEP.
    /// Only meaningful on the current table.
    #[serde(default)]
    pub excluded_as_keep: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilterRule {
    pub field: String,
    #[serde(rename = "type")]
    pub kind: FilterKind,
    pub pattern: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Include,
    Exclude,
}

// ---------------------------------------------------------------------------
// Result fields + sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ResultConfig {
    pub table: String,
    pub key_columns: Vec<String>,
    pub fields: Vec<FieldRule>,
}

impl ResultConfig {
    pub fn field(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldRule {
    pub name: String,
    #[serde(rename = "type", default)]
    pub column_type: ColumnType,
    pub sources: Vec<SourceRule>,
}

impl FieldRule {
    /// Sources in ascending priority order.
    pub fn sorted_sources(&self) -> Vec<&SourceRule> {
        let mut sources: Vec<&SourceRule> = self.sources.iter().collect();
        sources.sort_by_key(|s| s.priority);
        sources
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceRule {
    pub source: SourceKind,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    pub priority: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Provided,
    Current,
    Fixed,
}

// ---------------------------------------------------------------------------
// Action labels
// ---------------------------------------------------------------------------

/// Literal values written into the sync_action column. Callers may remap
/// these to arbitrary codes.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionLabels {
    #[serde(default = "default_add")]
    pub add: String,
    #[serde(default = "default_update")]
    pub update: String,
    #[serde(default = "default_delete")]
    pub delete: String,
    #[serde(default = "default_keep")]
    pub keep: String,
}

fn default_add() -> String {
    "ADD".into()
}
fn default_update() -> String {
    "UPDATE".into()
}
fn default_delete() -> String {
    "DELETE".into()
}
fn default_keep() -> String {
    "KEEP".into()
}

impl Default for ActionLabels {
    fn default() -> Self {
        Self {
            add: default_add(),
            update: default_update(),
            delete: default_delete(),
            keep: default_keep(),
        }
    }
}

impl ActionLabels {
    pub fn label(&self, action: SyncAction) -> &str {
        match action {
            SyncAction::Add => &self.add,
            SyncAction::Update => &self.update,
            SyncAction::Delete => &self.delete,
            SyncAction::Keep => &self.keep,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl SyncConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: SyncConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Comparison column set: every mapped (provided, current) pair.
    /// Key pairs are equal by construction on inner joins, so including them
    /// never misclassifies.
    pub fn comparison_pairs(&self) -> Vec<(String, String)> {
        self.column_mappings
            .iter()
            .map(|(p, c)| (p.clone(), c.clone()))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        validate_table(&self.provided)?;
        validate_table(&self.current)?;

        // Mapping invariant: keys in provided schema, values in current schema.
        for (from, to) in &self.column_mappings {
            if !self.provided.has_column(from) {
                return Err(ReconError::UnknownColumn {
                    table: self.provided.table.clone(),
                    column: from.clone(),
                });
            }
            if !self.current.has_column(to) {
                return Err(ReconError::UnknownColumn {
                    table: self.current.table.clone(),
                    column: to.clone(),
                });
            }
        }

        self.validate_result()?;
        Ok(())
    }

    fn validate_result(&self) -> Result<(), ReconError> {
        if self.result.key_columns.is_empty() {
            return Err(ReconError::MissingKeyColumns {
                table: self.result.table.clone(),
            });
        }
        for key in &self.result.key_columns {
            if self.result.field(key).is_none() {
                return Err(ReconError::UnknownColumn {
                    table: self.result.table.clone(),
                    column: key.clone(),
                });
            }
        }
        if self.result.fields.is_empty() {
            return Err(ReconError::ConfigValidation(format!(
                "result table '{}' declares no fields",
                self.result.table
            )));
        }

        for field in &self.result.fields {
            if field.sources.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "result field '{}' has no sources",
                    field.name
                )));
            }

            let mut seen = BTreeSet::new();
            for source in &field.sources {
                if source.priority == 0 {
                    return Err(ReconError::BadPriority {
                        field: field.name.clone(),
                        detail: "priorities must be positive".into(),
                    });
                }
                if !seen.insert(source.priority) {
                    return Err(ReconError::BadPriority {
                        field: field.name.clone(),
                        detail: format!("duplicate priority {}", source.priority),
                    });
                }

                match source.source {
                    SourceKind::Provided => {
                        let name = source.field.as_deref().ok_or_else(|| {
                            ReconError::ConfigValidation(format!(
                                "result field '{}': provided source needs a field",
                                field.name
                            ))
                        })?;
                        if !self.provided.has_column(name) {
                            return Err(ReconError::UnknownColumn {
                                table: self.provided.table.clone(),
                                column: name.to_string(),
                            });
                        }
                    }
                    SourceKind::Current => {
                        let name = source.field.as_deref().ok_or_else(|| {
                            ReconError::ConfigValidation(format!(
                                "result field '{}': current source needs a field",
                                field.name
                            ))
                        })?;
                        if !self.current.has_column(name) {
                            return Err(ReconError::UnknownColumn {
                                table: self.current.table.clone(),
                                column: name.to_string(),
                            });
                        }
                    }
                    SourceKind::Fixed => {
                        if source.value.is_none() {
                            return Err(ReconError::ConfigValidation(format!(
                                "result field '{}': fixed source needs a value",
                                field.name
                            )));
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

fn validate_table(table: &TableConfig) -> Result<(), ReconError> {
    if table.key_columns.is_empty() {
        return Err(ReconError::MissingKeyColumns {
            table: table.table.clone(),
        });
    }
    for key in &table.key_columns {
        if !table.has_column(key) {
            return Err(ReconError::UnknownColumn {
                table: table.table.clone(),
                column: key.clone(),
            });
        }
    }
    if let Some(ref filter) = table.filter {
        for rule in &filter.rules {
            if !table.has_column(&rule.field) {
                return Err(ReconError::UnknownColumn {
                    table: table.table.clone(),
                    column: rule.field.clone(),
                });
            }
            // Blank patterns are a warning at filter time, not an error here.
            if !rule.pattern.trim().is_empty() {
                glob::Pattern::new(&rule.pattern).map_err(|e| ReconError::BadPattern {
                    field: rule.field.clone(),
                    pattern: rule.pattern.clone(),
                    detail: e.to_string(),
                })?;
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
