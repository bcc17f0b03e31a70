//! `SELECT 1` round trip used by the connection health monitor.

use async_trait::async_trait;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{StoreHealthProbe, StoreProbeError};

use super::pool::DbPool;

/// Probes the database through the shared pool.
#[derive(Clone)]
pub struct DieselStoreHealthProbe {
    pool: DbPool,
}

impl DieselStoreHealthProbe {
    /// Create a probe over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoreHealthProbe for DieselStoreHealthProbe {
    async fn ping(&self) -> Result<(), StoreProbeError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| StoreProbeError::unreachable(err.to_string()))?;
        diesel::sql_query("SELECT 1")
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| StoreProbeError::unreachable(err.to_string()))
    }
}
