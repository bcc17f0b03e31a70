//! Policy for suites that need an embedded PostgreSQL cluster.
//!
//! Starting a cluster needs downloadable binaries and an unprivileged user,
//! which CI images and sandboxes do not always offer. Suites therefore skip
//! with a marker line by default and fail hard only when
//! `MERKMAL_REQUIRE_TEST_CLUSTER` is truthy.

/// Returns true when `MERKMAL_REQUIRE_TEST_CLUSTER` is "1", "true" or "yes"
/// (case-insensitive).
pub fn cluster_required() -> bool {
    std::env::var("MERKMAL_REQUIRE_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Skip (returning `None`) or panic after a failed cluster setup.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if cluster_required() {
        panic!("test cluster setup failed: {reason}");
    }
    eprintln!("SKIP-TEST-CLUSTER: {reason}");
    None
}
