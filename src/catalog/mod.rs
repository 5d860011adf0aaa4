mod client;
mod memory;
mod model;
mod pool;

pub use client::MetastoreClient;
pub use memory::{MemoryMetastore, MemoryTable};
pub use model::{DatasetIdentifier, PartitionHandle, StorageFormat, TableHandle, escape_path_name};
pub use pool::{ClientLease, ClientPool};
