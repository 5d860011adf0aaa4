use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::scheduler::LookbackBoundary;
use crate::watermark::WatermarkBoundary;

/// Which source of truth to consult for an entity's last update time.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpdateTimeProviderKind {
    #[default]
    Metastore,
    FileSystem,
    MetastoreWithFileSystemFallback,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    #[serde(default = "ScanConfig::default_pattern")]
    pub database_pattern: String,
    #[serde(default = "ScanConfig::default_pattern")]
    pub table_pattern: String,
    /// `database.table` globs dropped after the allow patterns match.
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default, with = "super::duration::option")]
    pub lookback_duration: Option<Duration>,
    #[serde(default)]
    pub update_time_provider_kind: UpdateTimeProviderKind,
    #[serde(default = "ScanConfig::default_table_concurrency")]
    pub table_concurrency: usize,
    #[serde(default = "ScanConfig::default_partition_concurrency")]
    pub partition_concurrency: usize,
    #[serde(default)]
    pub watermark_boundary: WatermarkBoundary,
    #[serde(default)]
    pub lookback_boundary: LookbackBoundary,
}

impl ScanConfig {
    fn default_pattern() -> String {
        String::from("*")
    }

    fn default_table_concurrency() -> usize {
        8
    }

    fn default_partition_concurrency() -> usize {
        16
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            database_pattern: Self::default_pattern(),
            table_pattern: Self::default_pattern(),
            exclude: Vec::new(),
            lookback_duration: None,
            update_time_provider_kind: UpdateTimeProviderKind::default(),
            table_concurrency: Self::default_table_concurrency(),
            partition_concurrency: Self::default_partition_concurrency(),
            watermark_boundary: WatermarkBoundary::default(),
            lookback_boundary: LookbackBoundary::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetastoreConfig {
    #[serde(default = "MetastoreConfig::default_max_leases")]
    pub max_leases: usize,
    #[serde(
        with = "humantime_serde",
        default = "MetastoreConfig::default_acquire_timeout"
    )]
    pub acquire_timeout: Duration,
}

impl MetastoreConfig {
    fn default_max_leases() -> usize {
        4
    }

    fn default_acquire_timeout() -> Duration {
        Duration::from_secs(30)
    }
}

impl Default for MetastoreConfig {
    fn default() -> Self {
        Self {
            max_leases: Self::default_max_leases(),
            acquire_timeout: Self::default_acquire_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_default() {
        let scan = ScanConfig::default();
        assert_eq!(scan.database_pattern, "*");
        assert_eq!(scan.table_pattern, "*");
        assert_eq!(scan.lookback_duration, None);
        assert_eq!(
            scan.update_time_provider_kind,
            UpdateTimeProviderKind::Metastore
        );
        assert_eq!(scan.watermark_boundary, WatermarkBoundary::Exclusive);
        assert_eq!(scan.lookback_boundary, LookbackBoundary::Inclusive);
    }

    #[test]
    fn test_metastore_default() {
        let metastore = MetastoreConfig::default();
        assert_eq!(metastore.max_leases, 4);
        assert_eq!(metastore.acquire_timeout, Duration::from_secs(30));
    }
}
