use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::catalog::{ClientPool, DatasetIdentifier, PartitionHandle, TableHandle};
use crate::conf::ScanConfig;
use crate::core::ScanError;
use crate::provider::UpdateProvider;
use crate::watermark::{WatermarkBoundary, WatermarkStore};

use super::descriptor::WorkDescriptor;
use super::lookback::LookbackPolicy;
use super::selector::DatasetSelector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UpdateTimeNotFound,
    CatalogListingFailure,
}

/// An entity the scan could not evaluate. The rest of the scan is unaffected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanFailure {
    pub entity: String,
    pub kind: FailureKind,
    pub message: String,
}

impl ScanFailure {
    fn new(entity: impl Into<String>, kind: FailureKind, err: &ScanError) -> Self {
        Self {
            entity: entity.into(),
            kind,
            message: err.to_string(),
        }
    }
}

/// A connection failure ends the scan; anything else is recorded against
/// the entity and skipped.
fn absorb(
    entity: impl Into<String>,
    kind: FailureKind,
    err: ScanError,
) -> Result<ScanFailure, ScanError> {
    match err {
        ScanError::CatalogConnectionFailure(_) => Err(err),
        err => {
            let failure = ScanFailure::new(entity, kind, &err);
            warn!("Skipping {}: {}", failure.entity, failure.message);
            Ok(failure)
        }
    }
}

#[derive(Debug, Default)]
pub struct ScanResult {
    /// In catalog traversal order: database, table, partition.
    pub descriptors: Vec<WorkDescriptor>,
    /// Only datasets whose watermark advanced in this scan.
    pub watermarks: BTreeMap<DatasetIdentifier, i64>,
    pub failures: Vec<ScanFailure>,
}

impl ScanResult {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Databases or tables whose listing failed.
    pub fn failed_listings(&self) -> Vec<&str> {
        self.failures
            .iter()
            .filter(|f| f.kind == FailureKind::CatalogListingFailure)
            .map(|f| f.entity.as_str())
            .collect()
    }

    pub fn watermark_urns(&self) -> BTreeMap<String, i64> {
        self.watermarks
            .iter()
            .map(|(id, mark)| (id.urn(), *mark))
            .collect()
    }
}

#[derive(Default)]
struct TableOutcome {
    descriptors: Vec<WorkDescriptor>,
    watermark: Option<i64>,
    failures: Vec<ScanFailure>,
}

enum Verdict {
    Admitted(i64),
    Rejected,
    Failed(ScanFailure),
}

/// Finds the tables and partitions that changed since the prior watermarks.
#[derive(Clone)]
pub struct ChangeScheduler {
    pool: Arc<ClientPool>,
    provider: Arc<dyn UpdateProvider>,
    lookback: LookbackPolicy,
    boundary: WatermarkBoundary,
    table_concurrency: usize,
    partition_concurrency: usize,
}

impl ChangeScheduler {
    pub fn new(pool: Arc<ClientPool>, provider: Arc<dyn UpdateProvider>) -> Self {
        Self::from_config(pool, provider, &ScanConfig::default())
    }

    pub fn from_config(
        pool: Arc<ClientPool>,
        provider: Arc<dyn UpdateProvider>,
        config: &ScanConfig,
    ) -> Self {
        Self {
            pool,
            provider,
            lookback: LookbackPolicy::new(config.lookback_duration, config.lookback_boundary),
            boundary: config.watermark_boundary,
            table_concurrency: config.table_concurrency.max(1),
            partition_concurrency: config.partition_concurrency.max(1),
        }
    }

    pub fn with_lookback(mut self, lookback: LookbackPolicy) -> Self {
        self.lookback = lookback;
        self
    }

    pub fn with_watermark_boundary(mut self, boundary: WatermarkBoundary) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn with_concurrency(mut self, tables: usize, partitions: usize) -> Self {
        self.table_concurrency = tables.max(1);
        self.partition_concurrency = partitions.max(1);
        self
    }

    /// Runs one scan over the selected tables.
    ///
    /// `prior` is only read. The returned watermarks are candidates for the
    /// host to persist. Fails only when no metastore lease can be obtained.
    pub async fn scan(
        &self,
        selector: &DatasetSelector,
        prior: &WatermarkStore,
        now: i64,
    ) -> Result<ScanResult, ScanError> {
        info!(
            "Starting scan at {} with {} prior watermarks",
            now,
            prior.len()
        );

        let mut result = ScanResult::default();
        let tables = self
            .list_selected_tables(selector, &mut result.failures)
            .await?;
        debug!("Selected {} tables", tables.len());

        let permits = Arc::new(Semaphore::new(self.table_concurrency));
        let mut tasks = JoinSet::new();
        let table_count = tables.len();

        for (index, table) in tables.into_iter().enumerate() {
            let scheduler = self.clone();
            let permits = Arc::clone(&permits);
            let prior_mark = prior.get(&table.id);
            tasks.spawn(async move {
                // The semaphore is never closed, so holding the result holds the permit.
                let _permit = permits.acquire_owned().await;
                let outcome = scheduler.evaluate_table(table, prior_mark, now).await;
                (index, outcome)
            });
        }

        let mut outcomes = Vec::with_capacity(table_count);
        while let Some(joined) = tasks.join_next().await {
            let (index, outcome) = joined.map_err(|e| ScanError::TaskFailure(e.to_string()))?;
            outcomes.push((index, outcome?));
        }
        outcomes.sort_by_key(|(index, _)| *index);

        for (_, outcome) in outcomes {
            if let (Some(mark), Some(first)) = (outcome.watermark, outcome.descriptors.first()) {
                result.watermarks.insert(first.dataset().clone(), mark);
            }
            result.descriptors.extend(outcome.descriptors);
            result.failures.extend(outcome.failures);
        }

        info!(
            "Scan finished: {} work descriptors, {} datasets advanced, {} failures",
            result.descriptors.len(),
            result.watermarks.len(),
            result.failures.len()
        );
        Ok(result)
    }

    async fn list_selected_tables(
        &self,
        selector: &DatasetSelector,
        failures: &mut Vec<ScanFailure>,
    ) -> Result<Vec<TableHandle>, ScanError> {
        let lease = self.pool.acquire().await?;

        let databases = match lease.list_databases().await {
            Ok(databases) => selector.select_databases(databases),
            Err(e) => {
                failures.push(absorb("*", FailureKind::CatalogListingFailure, e)?);
                return Ok(Vec::new());
            }
        };

        let mut tables = Vec::new();
        for database in databases {
            match lease.list_tables(&database).await {
                Ok(listed) => {
                    tables.extend(listed.into_iter().filter(|t| selector.matches_table(&t.id)))
                }
                Err(e) => failures.push(absorb(database, FailureKind::CatalogListingFailure, e)?),
            }
        }
        Ok(tables)
    }

    async fn evaluate_table(
        &self,
        table: TableHandle,
        prior: Option<i64>,
        now: i64,
    ) -> Result<TableOutcome, ScanError> {
        if !table.is_partitioned() {
            return Ok(self.evaluate_unpartitioned(table, prior, now).await);
        }

        let listed = {
            let lease = self.pool.acquire().await?;
            lease.list_partitions(&table).await
        };
        match listed {
            Ok(partitions) => self.evaluate_partitions(table, partitions, prior, now).await,
            Err(e) => {
                let failure = absorb(table.id.urn(), FailureKind::CatalogListingFailure, e)?;
                Ok(TableOutcome {
                    failures: vec![failure],
                    ..Default::default()
                })
            }
        }
    }

    async fn evaluate_unpartitioned(
        &self,
        table: TableHandle,
        prior: Option<i64>,
        now: i64,
    ) -> TableOutcome {
        let update_time = self.provider.table_update_time(&table).await;
        match self.verdict(&table.id.urn(), update_time, prior, now) {
            Verdict::Admitted(t) => TableOutcome {
                descriptors: vec![WorkDescriptor::for_table(table, t, prior)],
                watermark: Some(prior.map_or(t, |p| p.max(t))),
                failures: Vec::new(),
            },
            Verdict::Rejected => TableOutcome::default(),
            Verdict::Failed(failure) => TableOutcome {
                failures: vec![failure],
                ..Default::default()
            },
        }
    }

    async fn evaluate_partitions(
        &self,
        table: TableHandle,
        partitions: Vec<PartitionHandle>,
        prior: Option<i64>,
        now: i64,
    ) -> Result<TableOutcome, ScanError> {
        let table = Arc::new(table);
        let high_watermark = Arc::new(AtomicI64::new(i64::MIN));
        let permits = Arc::new(Semaphore::new(self.partition_concurrency));
        let mut tasks = JoinSet::new();
        let partition_count = partitions.len();

        for (index, partition) in partitions.into_iter().enumerate() {
            let scheduler = self.clone();
            let table = Arc::clone(&table);
            let high_watermark = Arc::clone(&high_watermark);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let entity = format!("{}/{}", table.id, partition.name(&table.partition_keys));
                let update_time = scheduler.provider.partition_update_time(&partition).await;
                let verdict = scheduler.verdict(&entity, update_time, prior, now);
                if let Verdict::Admitted(t) = verdict {
                    high_watermark.fetch_max(t, Ordering::AcqRel);
                }
                (index, partition, verdict)
            });
        }

        let mut evaluated = Vec::with_capacity(partition_count);
        while let Some(joined) = tasks.join_next().await {
            evaluated.push(joined.map_err(|e| ScanError::TaskFailure(e.to_string()))?);
        }
        evaluated.sort_by_key(|(index, _, _)| *index);

        let mut outcome = TableOutcome::default();
        for (_, partition, verdict) in evaluated {
            match verdict {
                Verdict::Admitted(t) => {
                    let descriptor = WorkDescriptor::for_partition(
                        table.as_ref().clone(),
                        partition,
                        t,
                        prior,
                    );
                    outcome.descriptors.push(descriptor);
                }
                Verdict::Rejected => {}
                Verdict::Failed(failure) => outcome.failures.push(failure),
            }
        }

        let high = high_watermark.load(Ordering::Acquire);
        if !outcome.descriptors.is_empty() {
            outcome.watermark = Some(prior.map_or(high, |p| p.max(high)));
        }
        Ok(outcome)
    }

    /// Admission test: a known update time inside the lookback window and past
    /// the prior watermark.
    fn verdict(
        &self,
        entity: &str,
        update_time: Result<i64, ScanError>,
        prior: Option<i64>,
        now: i64,
    ) -> Verdict {
        let update_time = match update_time {
            Ok(t) => t,
            Err(e) => {
                let failure = ScanFailure::new(entity, FailureKind::UpdateTimeNotFound, &e);
                warn!("Skipping {}: {}", entity, failure.message);
                return Verdict::Failed(failure);
            }
        };

        if !self.lookback.admit(update_time, now) {
            debug!(
                "{} updated at {} is outside the lookback window {:?}",
                entity,
                update_time,
                self.lookback.window()
            );
            return Verdict::Rejected;
        }
        if !self.boundary.is_new(update_time, prior) {
            debug!(
                "{} updated at {} is not past watermark {:?}",
                entity, update_time, prior
            );
            return Verdict::Rejected;
        }
        Verdict::Admitted(update_time)
    }
}
