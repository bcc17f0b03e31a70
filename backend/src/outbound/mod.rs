//! Outbound adapters implementing domain ports for infrastructure.
//!
//! - **persistence**: PostgreSQL record store and health probe via Diesel.
//! - **resilience**: deadline and retry decorator for any record store.
//!
//! Adapters translate between domain types and infrastructure
//! representations and hold no business rules.

pub mod persistence;
mod resilience;

pub use resilience::{RetryPolicy, RetryingRecordRepository};
