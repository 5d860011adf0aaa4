use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::conf::MetastoreConfig;
use crate::core::ScanError;

use super::client::MetastoreClient;

/// Bounded pool of metastore leases shared by all scans of one process.
pub struct ClientPool {
    client: Arc<dyn MetastoreClient>,
    leases: Arc<Semaphore>,
    max_leases: usize,
    acquire_timeout: Duration,
}

/// A checked-out client. The lease goes back to the pool when dropped.
pub struct ClientLease {
    client: Arc<dyn MetastoreClient>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for ClientLease {
    type Target = dyn MetastoreClient;

    fn deref(&self) -> &Self::Target {
        self.client.as_ref()
    }
}

impl ClientPool {
    pub fn new(client: Arc<dyn MetastoreClient>, config: &MetastoreConfig) -> Self {
        let max_leases = config.max_leases.max(1);
        Self {
            client,
            leases: Arc::new(Semaphore::new(max_leases)),
            max_leases,
            acquire_timeout: config.acquire_timeout,
        }
    }

    /// Waits up to the configured timeout for a free lease.
    pub async fn acquire(&self) -> Result<ClientLease, ScanError> {
        let acquire = self.leases.clone().acquire_owned();
        let permit = match tokio::time::timeout(self.acquire_timeout, acquire).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => {
                return Err(ScanError::CatalogConnectionFailure(
                    "metastore pool is closed".to_string(),
                ));
            }
            Err(_) => {
                return Err(ScanError::CatalogConnectionFailure(format!(
                    "no metastore lease available after {:?}",
                    self.acquire_timeout
                )));
            }
        };

        Ok(ClientLease {
            client: Arc::clone(&self.client),
            _permit: permit,
        })
    }

    /// Refuses every pending and future `acquire`.
    pub fn close(&self) {
        self.leases.close();
    }

    pub fn available(&self) -> usize {
        self.leases.available_permits()
    }

    pub fn max_leases(&self) -> usize {
        self.max_leases
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryMetastore;

    fn pool(max_leases: usize, timeout: Duration) -> ClientPool {
        let config = MetastoreConfig {
            max_leases,
            acquire_timeout: timeout,
        };
        ClientPool::new(Arc::new(MemoryMetastore::default()), &config)
    }

    #[tokio::test]
    async fn test_lease_released_on_drop() {
        let pool = pool(2, Duration::from_secs(1));
        let lease = pool.acquire().await.unwrap();
        assert_eq!(pool.available(), 1);
        assert!(lease.list_databases().await.unwrap().is_empty());
        drop(lease);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn test_acquire_times_out_when_exhausted() {
        let pool = pool(1, Duration::from_millis(20));
        let _held = pool.acquire().await.unwrap();
        let result = pool.acquire().await;
        assert!(matches!(result, Err(ScanError::CatalogConnectionFailure(_))));
    }

    #[tokio::test]
    async fn test_acquire_fails_after_close() {
        let pool = pool(1, Duration::from_secs(1));
        pool.close();
        assert_eq!(
            pool.acquire().await.err(),
            Some(ScanError::CatalogConnectionFailure(
                "metastore pool is closed".to_string()
            ))
        );
    }

    #[test]
    fn test_zero_leases_clamped() {
        let pool = pool(0, Duration::from_secs(1));
        assert_eq!(pool.max_leases(), 1);
    }
}
