use async_trait::async_trait;

use crate::core::ScanError;

use super::model::{PartitionHandle, TableHandle};

/// Listing surface of a metastore. Calls are expected to carry their own
/// timeout; implementations report failures as `CatalogListingFailure` and
/// leave retries to themselves.
#[async_trait]
pub trait MetastoreClient: Send + Sync {
    async fn list_databases(&self) -> Result<Vec<String>, ScanError>;

    async fn list_tables(&self, database: &str) -> Result<Vec<TableHandle>, ScanError>;

    async fn list_partitions(&self, table: &TableHandle) -> Result<Vec<PartitionHandle>, ScanError>;
}
