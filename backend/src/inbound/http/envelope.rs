//! Success envelope shared by every JSON endpoint.
//!
//! Clients always receive `{ success, data, message?, timestamp }` on success;
//! failures use the matching error body built in [`super::error`].

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Successful response body.
///
/// # Examples
/// ```
/// use actix_web::http::StatusCode;
/// use merkmal_backend::inbound::http::envelope::Envelope;
///
/// let response = Envelope::new(vec!["4711"]).with_message("1 identnr").created();
/// assert_eq!(response.status(), StatusCode::CREATED);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    timestamp: DateTime<Utc>,
}

impl<T: Serialize> Envelope<T> {
    /// Wrap `data`, stamped with the current time.
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach a human-readable summary.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// `200 OK` response.
    pub fn ok(self) -> HttpResponse {
        self.respond(StatusCode::OK)
    }

    /// `201 Created` response.
    pub fn created(self) -> HttpResponse {
        self.respond(StatusCode::CREATED)
    }

    /// Response with an explicit status.
    pub fn respond(self, status: StatusCode) -> HttpResponse {
        HttpResponse::build(status).json(self)
    }
}
