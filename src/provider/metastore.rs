use async_trait::async_trait;

use crate::catalog::{PartitionHandle, TableHandle};
use crate::core::ScanError;

use super::UpdateProvider;

/// Reads the create time the metastore keeps on each table and partition.
/// That field has whole-second precision, so returned millis always end in 000.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetastoreUpdateProvider;

impl MetastoreUpdateProvider {
    pub fn new() -> Self {
        Self
    }
}

fn seconds_to_millis(seconds: i64, entity: impl FnOnce() -> String) -> Result<i64, ScanError> {
    if seconds <= 0 {
        return Err(ScanError::UpdateTimeNotFound(format!(
            "{} has no create time",
            entity()
        )));
    }
    seconds.checked_mul(1000).ok_or_else(|| {
        ScanError::UpdateTimeNotFound(format!(
            "{} has an out of range create time {}",
            entity(),
            seconds
        ))
    })
}

#[async_trait]
impl UpdateProvider for MetastoreUpdateProvider {
    async fn table_update_time(&self, table: &TableHandle) -> Result<i64, ScanError> {
        seconds_to_millis(table.create_time, || format!("table {}", table.id))
    }

    async fn partition_update_time(&self, partition: &PartitionHandle) -> Result<i64, ScanError> {
        seconds_to_millis(partition.create_time, || {
            format!(
                "partition {} of {}",
                partition.values.join("/"),
                partition.table
            )
        })
    }
}
