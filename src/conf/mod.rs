mod config;
mod duration;
mod scan;

pub use config::Config;
pub use duration::parse_duration;
pub use scan::{MetastoreConfig, ScanConfig, UpdateTimeProviderKind};
