use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::catalog::DatasetIdentifier;
use crate::core::ScanError;

/// How an update time compares against the prior watermark.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkBoundary {
    /// Only strictly newer entities are admitted; equal means already processed.
    #[default]
    Exclusive,
    /// Entities at the watermark are admitted again.
    Inclusive,
}

impl WatermarkBoundary {
    pub fn is_new(&self, update_time: i64, prior: Option<i64>) -> bool {
        match (self, prior) {
            (_, None) => true,
            (WatermarkBoundary::Exclusive, Some(prior)) => update_time > prior,
            (WatermarkBoundary::Inclusive, Some(prior)) => update_time >= prior,
        }
    }
}

/// Snapshot of the highest update time processed per dataset, as handed over
/// by the host before a scan. A scan only reads it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatermarkStore {
    marks: HashMap<DatasetIdentifier, i64>,
}

impl WatermarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from `database@table` keyed entries. A dataset that
    /// appears more than once keeps its highest watermark.
    pub fn from_urns<I, K>(entries: I) -> Result<Self, ScanError>
    where
        I: IntoIterator<Item = (K, i64)>,
        K: AsRef<str>,
    {
        let mut store = Self::new();
        for (urn, mark) in entries {
            let id: DatasetIdentifier = urn.as_ref().parse()?;
            store.advance(id, mark);
        }
        Ok(store)
    }

    /// Parses a JSON object of `{"database@table": millis}`.
    pub fn from_json(raw: &str) -> Result<Self, ScanError> {
        let entries: BTreeMap<String, i64> = serde_json::from_str(raw)
            .map_err(|e| ScanError::ConfigParsingError(format!("watermarks: {}", e)))?;
        Self::from_urns(entries)
    }

    pub fn get(&self, id: &DatasetIdentifier) -> Option<i64> {
        self.marks.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Raises the watermark for `id`; lower values are ignored.
    pub fn advance(&mut self, id: DatasetIdentifier, mark: i64) {
        self.marks
            .entry(id)
            .and_modify(|current| *current = (*current).max(mark))
            .or_insert(mark);
    }

    /// Folds the watermarks produced by a scan into this snapshot.
    pub fn merge(&mut self, advanced: &BTreeMap<DatasetIdentifier, i64>) {
        for (id, mark) in advanced {
            self.advance(id.clone(), *mark);
        }
    }

    pub fn to_urns(&self) -> BTreeMap<String, i64> {
        self.marks
            .iter()
            .map(|(id, mark)| (id.urn(), *mark))
            .collect()
    }
}
