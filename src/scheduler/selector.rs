use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::catalog::DatasetIdentifier;
use crate::conf::ScanConfig;
use crate::core::ScanError;

/// Resolves which databases and tables a scan covers.
///
/// Patterns follow the metastore convention: `|` separates alternatives and
/// each alternative is a case-insensitive glob. Exclusions are matched
/// against `database.table`.
#[derive(Debug, Clone)]
pub struct DatasetSelector {
    databases: GlobSet,
    tables: GlobSet,
    excluded: GlobSet,
}

fn build_set<'a>(
    alternatives: impl IntoIterator<Item = &'a str>,
    raw: &str,
) -> Result<GlobSet, ScanError> {
    let mut builder = GlobSetBuilder::new();
    for alternative in alternatives {
        let glob = GlobBuilder::new(alternative)
            .case_insensitive(true)
            .build()
            .map_err(|e| ScanError::InvalidPattern(format!("'{}': {}", raw, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| ScanError::InvalidPattern(format!("'{}': {}", raw, e)))
}

fn pattern_set(raw: &str) -> Result<GlobSet, ScanError> {
    let alternatives: Vec<&str> = raw
        .split('|')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .collect();
    if alternatives.is_empty() {
        return Err(ScanError::InvalidPattern(format!(
            "'{}' selects nothing",
            raw
        )));
    }
    build_set(alternatives, raw)
}

impl DatasetSelector {
    pub fn new(
        database_pattern: &str,
        table_pattern: &str,
        exclude: &[String],
    ) -> Result<Self, ScanError> {
        let excluded = build_set(
            exclude.iter().map(|e| e.trim()).filter(|e| !e.is_empty()),
            &exclude.join(","),
        )?;
        Ok(Self {
            databases: pattern_set(database_pattern)?,
            tables: pattern_set(table_pattern)?,
            excluded,
        })
    }

    pub fn from_config(config: &ScanConfig) -> Result<Self, ScanError> {
        Self::new(&config.database_pattern, &config.table_pattern, &config.exclude)
    }

    pub fn matches_database(&self, database: &str) -> bool {
        self.databases.is_match(database)
    }

    pub fn matches_table(&self, id: &DatasetIdentifier) -> bool {
        self.matches_database(&id.database)
            && self.tables.is_match(&id.table)
            && !self
                .excluded
                .is_match(format!("{}.{}", id.database, id.table))
    }

    /// Keeps the matching names, preserving catalog order.
    pub fn select_databases(&self, databases: Vec<String>) -> Vec<String> {
        databases
            .into_iter()
            .filter(|db| self.matches_database(db))
            .collect()
    }
}
