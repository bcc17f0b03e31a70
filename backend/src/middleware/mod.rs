//! Request middleware.
//!
//! Purpose: request lifecycle concerns shared by every route: the trace-id
//! scope and the fail-fast gate for an unreachable record store.

pub mod health_gate;
pub mod trace;

pub use health_gate::StoreHealthGate;
pub use trace::Trace;
