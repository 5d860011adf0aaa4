use crate::{
    conf::{MetastoreConfig, ScanConfig},
    core::ScanError::{self, ConfigParsingError},
};
use config::Config as CConfig;
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "HIVESCAN";

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub metastore: MetastoreConfig,
}

impl Config {
    pub fn from_str(toml_str: &str) -> Result<Config, ScanError> {
        let config = CConfig::builder()
            .add_source(config::File::from_str(toml_str, config::FileFormat::Toml))
            .build()
            .map_err(|e| ConfigParsingError(e.to_string()))?
            .try_deserialize::<Config>()
            .map_err(|e| ConfigParsingError(e.to_string()))?;
        return Ok(config);
    }

    /// Loads an optional TOML file, then applies `HIVESCAN_SECTION__KEY`
    /// environment overrides on top of it. `HIVESCAN_SCAN__EXCLUDE` takes a
    /// comma-separated list.
    pub fn load(path: Option<&str>) -> Result<Config, ScanError> {
        let mut builder = CConfig::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("scan.exclude"),
            )
            .build()
            .map_err(|e| ConfigParsingError(e.to_string()))?
            .try_deserialize::<Config>()
            .map_err(|e| ConfigParsingError(e.to_string()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::conf::UpdateTimeProviderKind;
    use crate::scheduler::LookbackBoundary;
    use crate::watermark::WatermarkBoundary;

    #[test]
    fn load_correct_toml() {
        let toml = r#"
        [scan]
        database_pattern = "tracking|events_*"
        table_pattern = "*"
        exclude = ["tracking.tmp_*"]
        lookback_duration = "30d"
        update_time_provider_kind = "metastore_with_file_system_fallback"
        table_concurrency = 2

        [metastore]
        max_leases = 1
        acquire_timeout = "5s"
        "#;
        let conf = Config::from_str(toml).unwrap();
        assert_eq!(conf.scan.database_pattern, "tracking|events_*");
        assert_eq!(conf.scan.exclude, vec!["tracking.tmp_*".to_string()]);
        assert_eq!(
            conf.scan.lookback_duration,
            Some(Duration::from_secs(30 * 86_400))
        );
        assert_eq!(
            conf.scan.update_time_provider_kind,
            UpdateTimeProviderKind::MetastoreWithFileSystemFallback
        );
        assert_eq!(conf.scan.table_concurrency, 2);
        assert_eq!(conf.scan.partition_concurrency, 16);
        assert_eq!(conf.metastore.max_leases, 1);
        assert_eq!(conf.metastore.acquire_timeout, Duration::from_secs(5));
    }

    #[test]
    fn load_empty_toml_uses_defaults() {
        let conf = Config::from_str("").unwrap();
        assert_eq!(conf, Config::default());
    }

    #[test]
    fn load_iso_lookback_and_boundaries() {
        let toml = r#"
        [scan]
        lookback_duration = "P1DT12H"
        watermark_boundary = "inclusive"
        lookback_boundary = "exclusive"
        "#;
        let conf = Config::from_str(toml).unwrap();
        assert_eq!(
            conf.scan.lookback_duration,
            Some(Duration::from_secs(36 * 3_600))
        );
        assert_eq!(conf.scan.watermark_boundary, WatermarkBoundary::Inclusive);
        assert_eq!(conf.scan.lookback_boundary, LookbackBoundary::Exclusive);
    }

    #[test]
    fn reject_unknown_fields() {
        let toml = r#"
        [scan]
        table_pattern = "*"
        partition_filter = "ds > 1"
        "#;
        assert!(matches!(
            Config::from_str(toml),
            Err(ScanError::ConfigParsingError(_))
        ));
    }

    /// Sets environment variables for the lifetime of the guard.
    struct EnvGuard {
        keys: Vec<&'static str>,
    }

    impl EnvGuard {
        fn set(vars: &[(&'static str, &str)]) -> Self {
            for (key, value) in vars {
                // SAFETY: HIVESCAN_* variables are only read by this test.
                unsafe { std::env::set_var(key, value) };
            }
            Self {
                keys: vars.iter().map(|(key, _)| *key).collect(),
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for key in &self.keys {
                // SAFETY: see `EnvGuard::set`.
                unsafe { std::env::remove_var(key) };
            }
        }
    }

    #[test]
    fn load_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hivescan.toml");
        std::fs::write(&path, "[metastore]\nmax_leases = 4\n").unwrap();

        let conf = {
            let _env = EnvGuard::set(&[
                ("HIVESCAN_METASTORE__MAX_LEASES", "9"),
                ("HIVESCAN_SCAN__EXCLUDE", "a.b,c.d"),
            ]);
            Config::load(path.to_str()).unwrap()
        };
        assert_eq!(conf.metastore.max_leases, 9);
        assert_eq!(conf.scan.exclude, vec!["a.b", "c.d"]);

        let conf = Config::load(path.to_str()).unwrap();
        assert_eq!(conf.metastore.max_leases, 4);
        assert!(conf.scan.exclude.is_empty());
    }

    #[test]
    fn reject_bad_lookback() {
        let toml = r#"
        [scan]
        lookback_duration = "P3M"
        "#;
        assert!(Config::from_str(toml).is_err());
    }
}
