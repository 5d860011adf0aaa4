use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::ScanError;

/// `database@table`, the key watermarks are tracked under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DatasetIdentifier {
    pub database: String,
    pub table: String,
}

impl DatasetIdentifier {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
        }
    }

    /// Stringified form used as the watermark key.
    pub fn urn(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DatasetIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.database, self.table)
    }
}

impl FromStr for DatasetIdentifier {
    type Err = ScanError;

    fn from_str(urn: &str) -> Result<Self, Self::Err> {
        match urn.split_once('@') {
            Some((db, table)) if !db.is_empty() && !table.is_empty() && !table.contains('@') => {
                Ok(Self::new(db, table))
            }
            _ => Err(ScanError::InvalidDatasetUrn(urn.to_string())),
        }
    }
}

/// Serialization-format descriptor of a table's storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageFormat {
    #[serde(default)]
    pub schema_url: Option<String>,
    #[serde(default)]
    pub serde_lib: Option<String>,
}

/// Read-only snapshot of a table's catalog metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableHandle {
    pub id: DatasetIdentifier,
    pub location: String,
    /// Ordered partition key names; empty for non-partitioned tables.
    #[serde(default)]
    pub partition_keys: Vec<String>,
    #[serde(default)]
    pub format: StorageFormat,
    /// Whole seconds since epoch, as the metastore stores it. Zero when unknown.
    #[serde(default)]
    pub create_time: i64,
}

impl TableHandle {
    pub fn is_partitioned(&self) -> bool {
        !self.partition_keys.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionHandle {
    pub table: DatasetIdentifier,
    /// Values aligned with the owning table's `partition_keys`.
    pub values: Vec<String>,
    pub location: String,
    /// Whole seconds since epoch. Zero when unknown.
    #[serde(default)]
    pub create_time: i64,
}

impl PartitionHandle {
    /// `key1=value1/key2=value2`, escaped the way partition directories are named.
    pub fn name(&self, keys: &[String]) -> String {
        keys.iter()
            .zip(self.values.iter())
            .map(|(k, v)| format!("{}={}", escape_path_name(k), escape_path_name(v)))
            .collect::<Vec<_>>()
            .join("/")
    }
}

const ESCAPED_CHARS: &[char] = &[
    '"', '#', '%', '\'', '*', '/', ':', '=', '?', '\\', '{', '[', ']', '^',
];

fn needs_escape(c: char) -> bool {
    c.is_control() || ESCAPED_CHARS.contains(&c)
}

/// Percent-encodes characters that cannot appear verbatim in a partition
/// path segment.
pub fn escape_path_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if needs_escape(c) {
            out.push_str(&format!("%{:02X}", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urn_roundtrip() {
        let id = DatasetIdentifier::new("tracking", "page_views");
        assert_eq!(id.urn(), "tracking@page_views");
        assert_eq!("tracking@page_views".parse::<DatasetIdentifier>(), Ok(id));
    }

    #[test]
    fn test_urn_rejects_malformed() {
        for urn in ["tracking", "@t", "db@", "a@b@c", ""] {
            assert_eq!(
                urn.parse::<DatasetIdentifier>(),
                Err(ScanError::InvalidDatasetUrn(urn.to_string()))
            );
        }
    }

    #[test]
    fn test_partition_name() {
        let partition = PartitionHandle {
            table: DatasetIdentifier::new("db", "t"),
            values: vec!["2024-01-14".to_string(), "us".to_string()],
            location: "/data/db/t/ds=2024-01-14/region=us".to_string(),
            create_time: 1,
        };
        let keys = vec!["ds".to_string(), "region".to_string()];
        assert_eq!(partition.name(&keys), "ds=2024-01-14/region=us");
    }

    #[test]
    fn test_partition_name_escapes_separators() {
        let partition = PartitionHandle {
            table: DatasetIdentifier::new("db", "t"),
            values: vec!["a/b=c".to_string()],
            location: String::new(),
            create_time: 0,
        };
        assert_eq!(partition.name(&["k".to_string()]), "k=a%2Fb%3Dc");
    }

    #[test]
    fn test_escape_leaves_plain_names() {
        assert_eq!(escape_path_name("2024-01-14 10.00"), "2024-01-14 10.00");
        assert_eq!(escape_path_name("50%"), "50%25");
    }
}
