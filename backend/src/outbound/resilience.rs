//! Retry and timeout decorator for record repositories.
//!
//! Every call gets a deadline. Connection failures are retried with
//! exponential backoff plus jitter; once attempts run out the shared
//! [`ConnectionHealthMonitor`] is flagged so the HTTP layer fails fast until
//! a probe succeeds.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pagination::{Page, PageRequest};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::domain::ConnectionHealthMonitor;
use crate::domain::ports::{RecordFilter, RecordRepository, RecordRepositoryError};
use crate::domain::{AttributeRecord, Identnr, NewRecord, RecordId};

/// Attempts, backoff and per-attempt deadline.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use merkmal_backend::outbound::RetryPolicy;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_attempts(), 3);
/// assert!(policy.delay_for(2) >= Duration::from_millis(2000));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    operation_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000), Duration::from_secs(30))
    }
}

impl RetryPolicy {
    /// Policy with at least one attempt.
    pub fn new(max_attempts: u32, base_delay: Duration, operation_timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            operation_timeout,
        }
    }

    /// Total attempts per call, the first one included.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Deadline of a single attempt.
    pub fn operation_timeout(&self) -> Duration {
        self.operation_timeout
    }

    /// Pause after failed attempt number `attempt` (1-based): the base delay
    /// doubled per earlier attempt plus up to 10% jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self.base_delay.saturating_mul(1 << exponent);
        let jitter_cap = u64::try_from(backoff.as_millis() / 10).unwrap_or(u64::MAX);
        if jitter_cap == 0 {
            return backoff;
        }
        let jitter = SmallRng::from_entropy().gen_range(0..=jitter_cap);
        backoff.saturating_add(Duration::from_millis(jitter))
    }
}

/// [`RecordRepository`] decorator adding deadlines and retries.
#[derive(Clone)]
pub struct RetryingRecordRepository {
    inner: Arc<dyn RecordRepository>,
    monitor: Arc<ConnectionHealthMonitor>,
    policy: RetryPolicy,
}

impl RetryingRecordRepository {
    /// Wrap `inner`, reporting exhausted retries to `monitor`.
    pub fn new(
        inner: Arc<dyn RecordRepository>,
        monitor: Arc<ConnectionHealthMonitor>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            inner,
            monitor,
            policy,
        }
    }

    async fn run<T, F, Fut>(
        &self,
        operation: &'static str,
        mut call: F,
    ) -> Result<T, RecordRepositoryError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, RecordRepositoryError>> + Send,
        T: Send,
    {
        let mut attempt = 1;
        loop {
            let outcome = tokio::time::timeout(self.policy.operation_timeout, call())
                .await
                .unwrap_or_else(|_| Err(RecordRepositoryError::timeout(operation)));
            match outcome {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    debug!(
                        operation,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        %error,
                        "retrying record store call"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    if error.is_transient() {
                        warn!(operation, attempts = attempt, %error, "record store retries exhausted");
                        self.monitor.mark_unhealthy(&error.to_string());
                    }
                    return Err(error);
                }
            }
        }
    }
}

#[async_trait]
impl RecordRepository for RetryingRecordRepository {
    async fn list_all(&self) -> Result<Vec<AttributeRecord>, RecordRepositoryError> {
        self.run("list_all", || self.inner.list_all()).await
    }

    async fn list_page(
        &self,
        filter: &RecordFilter,
        page: PageRequest,
    ) -> Result<Page<AttributeRecord>, RecordRepositoryError> {
        self.run("list_page", || self.inner.list_page(filter, page))
            .await
    }

    async fn find_by_id(
        &self,
        id: RecordId,
    ) -> Result<Option<AttributeRecord>, RecordRepositoryError> {
        self.run("find_by_id", || self.inner.find_by_id(id)).await
    }

    async fn find_by_ids(
        &self,
        ids: &[RecordId],
    ) -> Result<Vec<AttributeRecord>, RecordRepositoryError> {
        self.run("find_by_ids", || self.inner.find_by_ids(ids)).await
    }

    async fn find_by_identnr(
        &self,
        identnr: &Identnr,
    ) -> Result<Vec<AttributeRecord>, RecordRepositoryError> {
        self.run("find_by_identnr", || self.inner.find_by_identnr(identnr))
            .await
    }

    async fn find_by_text(
        &self,
        merkmal: &str,
        auspraegung: &str,
        drucktext: &str,
    ) -> Result<Vec<AttributeRecord>, RecordRepositoryError> {
        self.run("find_by_text", || {
            self.inner.find_by_text(merkmal, auspraegung, drucktext)
        })
        .await
    }

    async fn find_duplicate(
        &self,
        record: &NewRecord,
        exclude: Option<RecordId>,
    ) -> Result<Option<RecordId>, RecordRepositoryError> {
        self.run("find_duplicate", || self.inner.find_duplicate(record, exclude))
            .await
    }

    async fn insert(&self, record: &NewRecord) -> Result<AttributeRecord, RecordRepositoryError> {
        self.run("insert", || self.inner.insert(record)).await
    }

    async fn update(
        &self,
        id: RecordId,
        record: &NewRecord,
    ) -> Result<Option<AttributeRecord>, RecordRepositoryError> {
        self.run("update", || self.inner.update(id, record)).await
    }

    async fn update_positions(
        &self,
        positions: &[(RecordId, i32)],
    ) -> Result<Vec<AttributeRecord>, RecordRepositoryError> {
        self.run("update_positions", || self.inner.update_positions(positions))
            .await
    }

    async fn delete(&self, id: RecordId) -> Result<bool, RecordRepositoryError> {
        self.run("delete", || self.inner.delete(id)).await
    }

    async fn delete_many(&self, ids: &[RecordId]) -> Result<Vec<RecordId>, RecordRepositoryError> {
        self.run("delete_many", || self.inner.delete_many(ids)).await
    }

    async fn delete_by_identnr(&self, identnr: &Identnr) -> Result<u64, RecordRepositoryError> {
        self.run("delete_by_identnr", || self.inner.delete_by_identnr(identnr))
            .await
    }

    async fn distinct_identnrs(&self) -> Result<Vec<String>, RecordRepositoryError> {
        self.run("distinct_identnrs", || self.inner.distinct_identnrs())
            .await
    }

    async fn count_all(&self) -> Result<u64, RecordRepositoryError> {
        self.run("count_all", || self.inner.count_all()).await
    }

    async fn count_by_identnr(&self, identnr: &Identnr) -> Result<u64, RecordRepositoryError> {
        self.run("count_by_identnr", || self.inner.count_by_identnr(identnr))
            .await
    }

    async fn max_position(&self) -> Result<Option<i32>, RecordRepositoryError> {
        self.run("max_position", || self.inner.max_position()).await
    }
}
