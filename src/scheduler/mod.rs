mod descriptor;
mod lookback;
mod scheduler;
mod selector;

pub use descriptor::{
    DATABASE_KEY, DATASET_URN_KEY, LOW_WATERMARK_KEY, PARTITION_LOCATION_KEY, PARTITION_NAME_KEY,
    PARTITION_SERIALIZED_KEY, TABLE_KEY, TABLE_LOCATION_KEY, TABLE_SCHEMA_URL_KEY,
    TABLE_SERDE_KEY, TABLE_SERIALIZED_KEY, UPDATE_TIME_KEY, WorkDescriptor,
};
pub use lookback::{LookbackBoundary, LookbackPolicy, admit};
pub use scheduler::{ChangeScheduler, FailureKind, ScanFailure, ScanResult};
pub use selector::DatasetSelector;
