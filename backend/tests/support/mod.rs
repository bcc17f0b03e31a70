//! Shared helpers for backend integration tests.
//!
//! Integration tests compile as separate crates, so each suite pulls these
//! helpers in with `mod support;` and uses only what it needs.

#![allow(dead_code, reason = "each integration test crate uses a subset")]

pub mod cluster_skip;
pub mod pg_embed;

pub use cluster_skip::handle_cluster_setup_failure;
pub use pg_embed::{ProvisionedDatabase, provision_database};
