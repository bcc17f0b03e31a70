//! Port for checking that the record store answers at all.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Probe failures.
    pub enum StoreProbeError {
        /// The store did not answer the probe.
        Unreachable { message: String } => "record store unreachable: {message}",
    }
}

/// Cheap round trip against the store, used by the health monitor.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoreHealthProbe: Send + Sync {
    /// Succeeds when the store answered a trivial query.
    async fn ping(&self) -> Result<(), StoreProbeError>;
}

/// Probe that always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureStoreHealthProbe;

#[async_trait]
impl StoreHealthProbe for FixtureStoreHealthProbe {
    async fn ping(&self) -> Result<(), StoreProbeError> {
        Ok(())
    }
}
