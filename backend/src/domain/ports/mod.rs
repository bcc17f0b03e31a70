//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod in_memory_record_repository;
mod record_repository;
mod store_health_probe;

pub use in_memory_record_repository::InMemoryRecordRepository;
#[cfg(test)]
pub use record_repository::MockRecordRepository;
pub use record_repository::{
    RecordFilter, RecordRepository, RecordRepositoryError, same_identity,
};
#[cfg(test)]
pub use store_health_probe::MockStoreHealthProbe;
pub use store_health_probe::{FixtureStoreHealthProbe, StoreHealthProbe, StoreProbeError};
