//! Shared HTTP adapter state.
//!
//! Handlers accept this state via `actix_web::web::Data` so they only depend
//! on domain services and remain testable over the in-memory repository.

use std::sync::Arc;

use crate::domain::ports::RecordRepository;
use crate::domain::{GroupService, IdentifierService, RecordService};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Single-record use cases.
    pub records: RecordService,
    /// Virtual group use cases.
    pub groups: GroupService,
    /// Per-identnr use cases.
    pub identifiers: IdentifierService,
}

impl HttpState {
    /// Build every service over one repository.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use merkmal_backend::domain::ports::InMemoryRecordRepository;
    /// use merkmal_backend::inbound::http::state::HttpState;
    ///
    /// let state = HttpState::new(Arc::new(InMemoryRecordRepository::new()));
    /// let _records = state.records.clone();
    /// ```
    pub fn new(repo: Arc<dyn RecordRepository>) -> Self {
        Self {
            records: RecordService::new(repo.clone()),
            groups: GroupService::new(repo.clone()),
            identifiers: IdentifierService::new(repo),
        }
    }
}
