//! Merkmalstexte administration backend.
//!
//! Layers follow a hexagonal split: [`domain`] holds the record model and use
//! cases, [`inbound`] adapts HTTP onto them, [`outbound`] implements storage,
//! and [`server`] wires everything into an actix-web server.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
