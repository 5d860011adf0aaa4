//! Test fixtures.
//!
//! This module is only available when the `testutil` feature is enabled.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::catalog::{
    ClientPool, DatasetIdentifier, MemoryMetastore, MetastoreClient, PartitionHandle,
    StorageFormat, TableHandle,
};
use crate::conf::MetastoreConfig;
use crate::core::ScanError;
use crate::provider::MetastoreUpdateProvider;
use crate::scheduler::ChangeScheduler;

pub const DAY_MS: i64 = 86_400_000;

/// Non-partitioned table created at `create_time_ms` (truncated to seconds,
/// as the metastore stores it).
pub fn make_table(database: &str, table: &str, create_time_ms: i64) -> TableHandle {
    make_partitioned_table(database, table, &[], create_time_ms)
}

pub fn make_partitioned_table(
    database: &str,
    table: &str,
    partition_keys: &[&str],
    create_time_ms: i64,
) -> TableHandle {
    TableHandle {
        id: DatasetIdentifier::new(database, table),
        location: format!("/tmp/{}", table),
        partition_keys: partition_keys.iter().map(|k| k.to_string()).collect(),
        format: StorageFormat {
            schema_url: Some("/tmp/dummy".to_string()),
            serde_lib: Some("org.apache.hadoop.hive.serde2.avro.AvroSerDe".to_string()),
        },
        create_time: create_time_ms / 1000,
    }
}

pub fn make_partition(
    table: &TableHandle,
    values: &[&str],
    create_time_ms: i64,
) -> PartitionHandle {
    PartitionHandle {
        table: table.id.clone(),
        values: values.iter().map(|v| v.to_string()).collect(),
        location: format!("{}/{}", table.location, values.join("/")),
        create_time: create_time_ms / 1000,
    }
}

/// Millis as the metastore provider will report them.
pub fn metastore_millis(ms: i64) -> i64 {
    (ms / 1000) * 1000
}

pub fn make_pool(client: Arc<dyn MetastoreClient>, max_leases: usize) -> Arc<ClientPool> {
    let config = MetastoreConfig {
        max_leases,
        acquire_timeout: Duration::from_millis(200),
    };
    Arc::new(ClientPool::new(client, &config))
}

/// Scheduler over `client` with metastore create times and default policies.
pub fn make_scheduler(client: Arc<dyn MetastoreClient>) -> ChangeScheduler {
    let provider = Arc::new(MetastoreUpdateProvider::new());
    ChangeScheduler::new(make_pool(client, 2), provider)
}

/// Wraps a `MemoryMetastore` and fails chosen listings.
#[derive(Default)]
pub struct FlakyMetastore {
    inner: MemoryMetastore,
    failing_databases: HashSet<String>,
    failing_tables: HashSet<DatasetIdentifier>,
    disconnected: bool,
}

impl FlakyMetastore {
    pub fn new(inner: MemoryMetastore) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    pub fn fail_database(mut self, database: &str) -> Self {
        self.failing_databases.insert(database.to_string());
        self
    }

    pub fn fail_table(mut self, id: DatasetIdentifier) -> Self {
        self.failing_tables.insert(id);
        self
    }

    /// Every call reports a lost connection.
    pub fn disconnected(mut self) -> Self {
        self.disconnected = true;
        self
    }

    fn check_connection(&self) -> Result<(), ScanError> {
        if self.disconnected {
            return Err(ScanError::CatalogConnectionFailure(
                "connection reset by peer".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl MetastoreClient for FlakyMetastore {
    async fn list_databases(&self) -> Result<Vec<String>, ScanError> {
        self.check_connection()?;
        self.inner.list_databases().await
    }

    async fn list_tables(&self, database: &str) -> Result<Vec<TableHandle>, ScanError> {
        self.check_connection()?;
        if self.failing_databases.contains(database) {
            return Err(ScanError::CatalogListingFailure(format!(
                "timed out listing tables of '{}'",
                database
            )));
        }
        self.inner.list_tables(database).await
    }

    async fn list_partitions(
        &self,
        table: &TableHandle,
    ) -> Result<Vec<PartitionHandle>, ScanError> {
        self.check_connection()?;
        if self.failing_tables.contains(&table.id) {
            return Err(ScanError::CatalogListingFailure(format!(
                "timed out listing partitions of {}",
                table.id
            )));
        }
        self.inner.list_partitions(table).await
    }
}
