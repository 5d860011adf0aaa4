mod filesystem;
mod metastore;

use async_trait::async_trait;
use log::debug;

use crate::catalog::{PartitionHandle, TableHandle};
use crate::conf::UpdateTimeProviderKind;
use crate::core::ScanError;

pub use filesystem::{FileSystemUpdateProvider, location_to_path};
pub use metastore::MetastoreUpdateProvider;

/// Source of an entity's last update time in millis since epoch.
///
/// Returns `ScanError::UpdateTimeNotFound` when the entity carries no usable
/// timestamp; the scheduler skips such entities.
#[async_trait]
pub trait UpdateProvider: Send + Sync {
    async fn table_update_time(&self, table: &TableHandle) -> Result<i64, ScanError>;

    async fn partition_update_time(&self, partition: &PartitionHandle) -> Result<i64, ScanError>;
}

/// Enum dispatch over the built-in providers, selected by configuration.
pub enum ConfiguredProvider {
    Metastore(MetastoreUpdateProvider),
    FileSystem(FileSystemUpdateProvider),
    /// Metastore first, file system when the metastore has nothing.
    MetastoreWithFallback(MetastoreUpdateProvider, FileSystemUpdateProvider),
}

impl ConfiguredProvider {
    pub fn new(kind: UpdateTimeProviderKind) -> Self {
        match kind {
            UpdateTimeProviderKind::Metastore => {
                ConfiguredProvider::Metastore(MetastoreUpdateProvider::new())
            }
            UpdateTimeProviderKind::FileSystem => {
                ConfiguredProvider::FileSystem(FileSystemUpdateProvider::new())
            }
            UpdateTimeProviderKind::MetastoreWithFileSystemFallback => {
                ConfiguredProvider::MetastoreWithFallback(
                    MetastoreUpdateProvider::new(),
                    FileSystemUpdateProvider::new(),
                )
            }
        }
    }
}

#[async_trait]
impl UpdateProvider for ConfiguredProvider {
    async fn table_update_time(&self, table: &TableHandle) -> Result<i64, ScanError> {
        match self {
            ConfiguredProvider::Metastore(p) => p.table_update_time(table).await,
            ConfiguredProvider::FileSystem(p) => p.table_update_time(table).await,
            ConfiguredProvider::MetastoreWithFallback(primary, fallback) => {
                match primary.table_update_time(table).await {
                    Err(ScanError::UpdateTimeNotFound(why)) => {
                        debug!("{}; falling back to file system", why);
                        fallback.table_update_time(table).await
                    }
                    other => other,
                }
            }
        }
    }

    async fn partition_update_time(&self, partition: &PartitionHandle) -> Result<i64, ScanError> {
        match self {
            ConfiguredProvider::Metastore(p) => p.partition_update_time(partition).await,
            ConfiguredProvider::FileSystem(p) => p.partition_update_time(partition).await,
            ConfiguredProvider::MetastoreWithFallback(primary, fallback) => {
                match primary.partition_update_time(partition).await {
                    Err(ScanError::UpdateTimeNotFound(why)) => {
                        debug!("{}; falling back to file system", why);
                        fallback.partition_update_time(partition).await
                    }
                    other => other,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DatasetIdentifier;
    use std::fs::{self, File};
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn partition(location: String, create_time: i64) -> PartitionHandle {
        PartitionHandle {
            table: DatasetIdentifier::new("db", "t"),
            values: vec!["2024-01-14".to_string()],
            location,
            create_time,
        }
    }

    #[tokio::test]
    async fn test_fallback_used_only_without_create_time() {
        let dir = TempDir::new().unwrap();
        let part_dir = dir.path().join("ds=2024-01-14");
        fs::create_dir_all(&part_dir).unwrap();
        File::create(part_dir.join("part_0000.avro"))
            .unwrap()
            .set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000))
            .unwrap();
        let location = part_dir.to_string_lossy().to_string();

        let provider =
            ConfiguredProvider::new(UpdateTimeProviderKind::MetastoreWithFileSystemFallback);

        assert_eq!(
            provider
                .partition_update_time(&partition(location.clone(), 1_700_000_000))
                .await,
            Ok(1_700_000_000_000)
        );
        assert_eq!(
            provider
                .partition_update_time(&partition(location, 0))
                .await,
            Ok(1_600_000_000_000)
        );
    }

    #[tokio::test]
    async fn test_metastore_kind_ignores_files() {
        let provider = ConfiguredProvider::new(UpdateTimeProviderKind::Metastore);
        assert!(matches!(
            provider
                .partition_update_time(&partition("/nonexistent".to_string(), 0))
                .await,
            Err(ScanError::UpdateTimeNotFound(_))
        ));
    }
}
