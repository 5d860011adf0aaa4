use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::ScanError;

use super::client::MetastoreClient;
use super::model::{DatasetIdentifier, PartitionHandle, TableHandle};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryTable {
    pub table: TableHandle,
    #[serde(default)]
    pub partitions: Vec<PartitionHandle>,
}

/// Metastore held entirely in memory. Databases list in name order, tables
/// and partitions in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetastore {
    #[serde(default)]
    databases: BTreeMap<String, Vec<MemoryTable>>,
}

impl MemoryMetastore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a JSON snapshot shaped as
    /// `{"databases": {"db": [{"table": .., "partitions": [..]}]}}`.
    pub fn from_json_file(path: &Path) -> Result<Self, ScanError> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            ScanError::ConfigParsingError(format!("catalog {}: {}", path.display(), e))
        })
    }

    pub fn create_database(&mut self, name: &str) {
        self.databases.entry(name.to_string()).or_default();
    }

    /// Adds or replaces a table, creating its database on demand.
    pub fn add_table(&mut self, table: TableHandle) {
        let tables = self.databases.entry(table.id.database.clone()).or_default();
        match tables.iter().position(|t| t.table.id == table.id) {
            Some(idx) => tables[idx].table = table,
            None => tables.push(MemoryTable {
                table,
                partitions: Vec::new(),
            }),
        }
    }

    pub fn add_partition(&mut self, partition: PartitionHandle) -> Result<(), ScanError> {
        let entry = self.find_mut(&partition.table).ok_or_else(|| {
            ScanError::CatalogListingFailure(format!("table {} does not exist", partition.table))
        })?;
        if partition.values.len() != entry.table.partition_keys.len() {
            return Err(ScanError::CatalogListingFailure(format!(
                "partition of {} has {} values, expected {}",
                partition.table,
                partition.values.len(),
                entry.table.partition_keys.len()
            )));
        }
        entry.partitions.push(partition);
        Ok(())
    }

    pub fn drop_database(&mut self, name: &str) {
        self.databases.remove(name);
    }

    pub fn table(&self, id: &DatasetIdentifier) -> Option<&TableHandle> {
        self.databases
            .get(&id.database)?
            .iter()
            .find(|t| &t.table.id == id)
            .map(|t| &t.table)
    }

    fn find_mut(&mut self, id: &DatasetIdentifier) -> Option<&mut MemoryTable> {
        self.databases
            .get_mut(&id.database)?
            .iter_mut()
            .find(|t| &t.table.id == id)
    }
}

#[async_trait]
impl MetastoreClient for MemoryMetastore {
    async fn list_databases(&self) -> Result<Vec<String>, ScanError> {
        Ok(self.databases.keys().cloned().collect())
    }

    async fn list_tables(&self, database: &str) -> Result<Vec<TableHandle>, ScanError> {
        let tables = self.databases.get(database).ok_or_else(|| {
            ScanError::CatalogListingFailure(format!("database '{}' does not exist", database))
        })?;
        Ok(tables.iter().map(|t| t.table.clone()).collect())
    }

    async fn list_partitions(
        &self,
        table: &TableHandle,
    ) -> Result<Vec<PartitionHandle>, ScanError> {
        self.databases
            .get(&table.id.database)
            .and_then(|tables| tables.iter().find(|t| t.table.id == table.id))
            .map(|t| t.partitions.clone())
            .ok_or_else(|| {
                ScanError::CatalogListingFailure(format!("table {} does not exist", table.id))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(db: &str, name: &str, keys: &[&str]) -> TableHandle {
        TableHandle {
            id: DatasetIdentifier::new(db, name),
            location: format!("/data/{}/{}", db, name),
            partition_keys: keys.iter().map(|k| k.to_string()).collect(),
            format: Default::default(),
            create_time: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn test_lists_in_catalog_order() {
        let mut store = MemoryMetastore::new();
        store.add_table(table("b", "t2", &[]));
        store.add_table(table("b", "t1", &[]));
        store.add_table(table("a", "t3", &[]));

        assert_eq!(store.list_databases().await.unwrap(), vec!["a", "b"]);
        let names: Vec<String> = store
            .list_tables("b")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id.table)
            .collect();
        assert_eq!(names, vec!["t2", "t1"]);
    }

    #[tokio::test]
    async fn test_missing_database_is_listing_failure() {
        let store = MemoryMetastore::new();
        assert!(matches!(
            store.list_tables("nope").await,
            Err(ScanError::CatalogListingFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_add_partition_checks_arity() {
        let mut store = MemoryMetastore::new();
        let t = table("db", "t", &["ds"]);
        store.add_table(t.clone());

        let bad = PartitionHandle {
            table: t.id.clone(),
            values: vec!["a".into(), "b".into()],
            location: String::new(),
            create_time: 1,
        };
        assert!(store.add_partition(bad).is_err());

        let good = PartitionHandle {
            table: t.id.clone(),
            values: vec!["2024-01-14".into()],
            location: "/data/db/t/ds=2024-01-14".into(),
            create_time: 1,
        };
        store.add_partition(good.clone()).unwrap();
        assert_eq!(store.list_partitions(&t).await.unwrap(), vec![good]);
    }

    #[test]
    fn test_snapshot_json() {
        let json = r#"{
            "databases": {
                "db": [{
                    "table": {
                        "id": {"database": "db", "table": "t"},
                        "location": "/data/db/t",
                        "partition_keys": ["ds"],
                        "format": {"schema_url": "/schemas/t.avsc"},
                        "create_time": 1700000000
                    },
                    "partitions": [{
                        "table": {"database": "db", "table": "t"},
                        "values": ["2024-01-14"],
                        "location": "/data/db/t/ds=2024-01-14",
                        "create_time": 1700000100
                    }]
                }]
            }
        }"#;
        let store: MemoryMetastore = serde_json::from_str(json).unwrap();
        let t = store.table(&DatasetIdentifier::new("db", "t")).unwrap();
        assert_eq!(t.format.schema_url.as_deref(), Some("/schemas/t.avsc"));
        assert!(t.is_partitioned());
    }
}
