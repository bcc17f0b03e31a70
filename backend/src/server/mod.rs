//! Server construction and middleware wiring.

mod config;
#[cfg(feature = "metrics")]
mod metrics;

pub use config::{ServerConfig, ServerSettings, SettingsError};

#[cfg(feature = "metrics")]
pub use metrics::build_prometheus;
#[cfg(feature = "metrics")]
use metrics::MetricsLayer;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use tracing::info;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[cfg(debug_assertions)]
use crate::doc::ApiDoc;
use crate::inbound::http::api_routes;
use crate::inbound::http::health::{HealthState, live, ready, store};
use crate::inbound::http::state::HttpState;
use crate::middleware::{StoreHealthGate, Trace};

/// Shared state handed to every worker's app.
#[derive(Clone)]
pub struct AppDependencies {
    /// Probe flags and the store monitor.
    pub health_state: web::Data<HealthState>,
    /// Services used by the `/api` handlers.
    pub http_state: web::Data<HttpState>,
}

/// Assemble the application: `/api` behind the store gate, health probes,
/// and Swagger UI in debug builds. Every route runs in a trace-id scope.
pub fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
    } = deps;
    let gate = StoreHealthGate::new(health_state.monitor().clone());

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(gate)
        .wrap(Trace)
        .configure(api_routes)
        .service(ready)
        .service(live)
        .service(store);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Bind the HTTP server and mark the service ready.
///
/// # Errors
///
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let ServerConfig {
        bind_addr,
        repository,
        #[cfg(feature = "metrics")]
        prometheus,
    } = config;
    let http_state = web::Data::new(HttpState::new(repository));
    let server_health_state = health_state.clone();

    #[cfg(feature = "metrics")]
    let metrics_layer = MetricsLayer::from_option(prometheus);

    let server = HttpServer::new(move || {
        let app = build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
        });

        #[cfg(feature = "metrics")]
        let app = app.wrap(metrics_layer.clone());

        app
    })
    .bind(bind_addr)?
    .run();

    info!(%bind_addr, "http server listening");
    health_state.mark_ready();
    Ok(server)
}
