use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::catalog::{DatasetIdentifier, PartitionHandle, TableHandle};
use crate::core::ScanError;

pub const DATASET_URN_KEY: &str = "dataset.urn";
pub const DATABASE_KEY: &str = "hive.database";
pub const TABLE_KEY: &str = "hive.table";
pub const TABLE_LOCATION_KEY: &str = "hive.table.location";
pub const TABLE_SCHEMA_URL_KEY: &str = "hive.table.schema.url";
pub const TABLE_SERDE_KEY: &str = "hive.table.serde";
pub const TABLE_SERIALIZED_KEY: &str = "hive.table.serialized";
pub const PARTITION_NAME_KEY: &str = "hive.partition.name";
pub const PARTITION_LOCATION_KEY: &str = "hive.partition.location";
pub const PARTITION_SERIALIZED_KEY: &str = "hive.partition.serialized";
pub const UPDATE_TIME_KEY: &str = "hive.update.time";
pub const LOW_WATERMARK_KEY: &str = "watermark.low";

/// One table or partition that changed since the prior scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkDescriptor {
    dataset: DatasetIdentifier,
    table: TableHandle,
    partition: Option<PartitionHandle>,
    update_time: i64,
    low_watermark: Option<i64>,
}

impl WorkDescriptor {
    pub fn for_table(table: TableHandle, update_time: i64, low_watermark: Option<i64>) -> Self {
        Self {
            dataset: table.id.clone(),
            table,
            partition: None,
            update_time,
            low_watermark,
        }
    }

    pub fn for_partition(
        table: TableHandle,
        partition: PartitionHandle,
        update_time: i64,
        low_watermark: Option<i64>,
    ) -> Self {
        Self {
            dataset: table.id.clone(),
            table,
            partition: Some(partition),
            update_time,
            low_watermark,
        }
    }

    pub fn dataset(&self) -> &DatasetIdentifier {
        &self.dataset
    }

    pub fn table(&self) -> &TableHandle {
        &self.table
    }

    pub fn partition(&self) -> Option<&PartitionHandle> {
        self.partition.as_ref()
    }

    /// The update time the entity was admitted with; the consumer's high watermark.
    pub fn update_time(&self) -> i64 {
        self.update_time
    }

    /// The prior watermark the entity was compared against.
    pub fn low_watermark(&self) -> Option<i64> {
        self.low_watermark
    }

    pub fn partition_name(&self) -> Option<String> {
        self.partition
            .as_ref()
            .map(|p| p.name(&self.table.partition_keys))
    }

    /// Flattens the descriptor into the string property bag consumers read.
    /// The full table and partition handles travel as JSON under the
    /// `*.serialized` keys, so [`WorkDescriptor::from_properties`] restores
    /// the descriptor exactly.
    pub fn to_properties(&self) -> Result<BTreeMap<String, String>, ScanError> {
        let mut props = BTreeMap::new();
        props.insert(DATASET_URN_KEY.to_string(), self.dataset.urn());
        props.insert(DATABASE_KEY.to_string(), self.dataset.database.clone());
        props.insert(TABLE_KEY.to_string(), self.dataset.table.clone());
        props.insert(TABLE_LOCATION_KEY.to_string(), self.table.location.clone());
        props.insert(TABLE_SERIALIZED_KEY.to_string(), to_json(&self.table)?);
        if let Some(url) = &self.table.format.schema_url {
            props.insert(TABLE_SCHEMA_URL_KEY.to_string(), url.clone());
        }
        if let Some(serde_lib) = &self.table.format.serde_lib {
            props.insert(TABLE_SERDE_KEY.to_string(), serde_lib.clone());
        }
        if let Some(partition) = &self.partition {
            props.insert(
                PARTITION_NAME_KEY.to_string(),
                partition.name(&self.table.partition_keys),
            );
            props.insert(PARTITION_LOCATION_KEY.to_string(), partition.location.clone());
            props.insert(PARTITION_SERIALIZED_KEY.to_string(), to_json(partition)?);
        }
        props.insert(UPDATE_TIME_KEY.to_string(), self.update_time.to_string());
        if let Some(low) = self.low_watermark {
            props.insert(LOW_WATERMARK_KEY.to_string(), low.to_string());
        }
        Ok(props)
    }

    /// Rebuilds a descriptor from the bag produced by `to_properties`.
    pub fn from_properties(props: &BTreeMap<String, String>) -> Result<Self, ScanError> {
        let table: TableHandle = from_json(required(props, TABLE_SERIALIZED_KEY)?)?;
        let partition: Option<PartitionHandle> = props
            .get(PARTITION_SERIALIZED_KEY)
            .map(String::as_str)
            .map(from_json)
            .transpose()?;
        if let Some(partition) = partition.as_ref().filter(|p| p.table != table.id) {
            return Err(ScanError::InvalidWorkDescriptor(format!(
                "partition belongs to {}, not {}",
                partition.table, table.id
            )));
        }

        let update_time = parse_millis(UPDATE_TIME_KEY, required(props, UPDATE_TIME_KEY)?)?;
        let low_watermark = props
            .get(LOW_WATERMARK_KEY)
            .map(|raw| parse_millis(LOW_WATERMARK_KEY, raw))
            .transpose()?;

        Ok(Self {
            dataset: table.id.clone(),
            table,
            partition,
            update_time,
            low_watermark,
        })
    }
}

fn required<'a>(props: &'a BTreeMap<String, String>, key: &str) -> Result<&'a str, ScanError> {
    props
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| ScanError::InvalidWorkDescriptor(format!("missing '{}'", key)))
}

fn parse_millis(key: &str, raw: &str) -> Result<i64, ScanError> {
    raw.parse()
        .map_err(|e| ScanError::InvalidWorkDescriptor(format!("'{}' = '{}': {}", key, raw, e)))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, ScanError> {
    serde_json::to_string(value).map_err(|e| ScanError::InvalidWorkDescriptor(e.to_string()))
}

fn from_json<T: DeserializeOwned>(raw: &str) -> Result<T, ScanError> {
    serde_json::from_str(raw).map_err(|e| ScanError::InvalidWorkDescriptor(e.to_string()))
}
