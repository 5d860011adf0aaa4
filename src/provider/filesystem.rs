use std::sync::Arc;

use async_trait::async_trait;
use object_store::ObjectStore;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use tokio_stream::StreamExt;

use crate::catalog::{PartitionHandle, TableHandle};
use crate::core::ScanError;

use super::UpdateProvider;

/// Uses the newest modification time of any object under the entity's
/// storage location.
pub struct FileSystemUpdateProvider {
    store: Arc<dyn ObjectStore>,
}

impl FileSystemUpdateProvider {
    pub fn new() -> Self {
        Self::with_store(Arc::new(LocalFileSystem::new()))
    }

    pub fn with_store(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    async fn newest_modification(&self, location: &str) -> Result<i64, ScanError> {
        let not_found =
            |why: String| ScanError::UpdateTimeNotFound(format!("{}: {}", location, why));

        let prefix = location_to_path(location).map_err(not_found)?;
        let mut stream = self.store.list(Some(&prefix));
        let mut newest: Option<i64> = None;

        while let Some(result) = stream.next().await {
            let meta = result.map_err(|e| not_found(e.to_string()))?;
            let modified = meta.last_modified.timestamp_millis();
            newest = Some(newest.map_or(modified, |n| n.max(modified)));
        }

        newest.ok_or_else(|| not_found("no files under location".to_string()))
    }
}

impl Default for FileSystemUpdateProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Drops any `scheme://authority` prefix and the leading slash, which is the
/// form `LocalFileSystem` expects.
pub fn location_to_path(location: &str) -> Result<ObjectPath, String> {
    let path = match location.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("", |idx| &rest[idx..]),
        None => location,
    };
    let path = path.trim_start_matches('/').trim_end_matches('/');
    if path.is_empty() {
        return Err("empty storage location".to_string());
    }
    ObjectPath::parse(path).map_err(|e| e.to_string())
}

#[async_trait]
impl UpdateProvider for FileSystemUpdateProvider {
    async fn table_update_time(&self, table: &TableHandle) -> Result<i64, ScanError> {
        self.newest_modification(&table.location).await
    }

    async fn partition_update_time(&self, partition: &PartitionHandle) -> Result<i64, ScanError> {
        self.newest_modification(&partition.location).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DatasetIdentifier;
    use std::fs::{self, File};
    use std::path::Path;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn touch(path: &Path, epoch_secs: u64) {
        let file = File::create(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(epoch_secs))
            .unwrap();
    }

    fn table_at(location: String) -> TableHandle {
        TableHandle {
            id: DatasetIdentifier::new("db", "t"),
            location,
            partition_keys: Vec::new(),
            format: Default::default(),
            create_time: 0,
        }
    }

    #[test]
    fn test_location_to_path() {
        assert_eq!(location_to_path("/tmp/t1").unwrap().as_ref(), "tmp/t1");
        assert_eq!(
            location_to_path("file:///tmp/t1/").unwrap().as_ref(),
            "tmp/t1"
        );
        assert_eq!(
            location_to_path("hdfs://namenode:8020/data/t1")
                .unwrap()
                .as_ref(),
            "data/t1"
        );
        assert!(location_to_path("hdfs://namenode").is_err());
        assert!(location_to_path("/").is_err());
    }

    #[tokio::test]
    async fn test_newest_file_wins() {
        let dir = TempDir::new().unwrap();
        let table_dir = dir.path().join("t");
        fs::create_dir_all(table_dir.join("nested")).unwrap();
        touch(&table_dir.join("part_0000.avro"), 1_700_000_000);
        touch(&table_dir.join("nested").join("part_0001.avro"), 1_700_000_500);

        let provider = FileSystemUpdateProvider::new();
        let table = table_at(table_dir.to_string_lossy().to_string());

        assert_eq!(
            provider.table_update_time(&table).await,
            Ok(1_700_000_500_000)
        );
    }

    #[tokio::test]
    async fn test_empty_location_not_found() {
        let dir = TempDir::new().unwrap();
        let table_dir = dir.path().join("empty");
        fs::create_dir_all(&table_dir).unwrap();

        let provider = FileSystemUpdateProvider::new();
        let table = table_at(table_dir.to_string_lossy().to_string());

        assert!(matches!(
            provider.table_update_time(&table).await,
            Err(ScanError::UpdateTimeNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_location_not_found() {
        let dir = TempDir::new().unwrap();
        let provider = FileSystemUpdateProvider::new();
        let table = table_at(dir.path().join("gone").to_string_lossy().to_string());

        assert!(matches!(
            provider.table_update_time(&table).await,
            Err(ScanError::UpdateTimeNotFound(_))
        ));
    }
}
