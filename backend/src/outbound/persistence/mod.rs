//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Adapters only translate between Diesel rows and domain records. Row
//! structs (`models.rs`) and table definitions (`schema.rs`) stay private to
//! this module. Connections come from a `bb8` pool via `diesel-async`.
//!
//! # Example
//!
//! ```ignore
//! use merkmal_backend::outbound::persistence::{DbPool, DieselRecordRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/merkmale")).await?;
//! let repo = DieselRecordRepository::new(pool);
//! ```

mod diesel_basic_error_mapping;
mod diesel_record_repository;
mod diesel_store_health_probe;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_record_repository::DieselRecordRepository;
pub use diesel_store_health_probe::DieselStoreHealthProbe;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
