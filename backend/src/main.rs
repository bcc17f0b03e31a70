//! Backend entry-point: loads settings, prepares the record store and serves
//! the REST API.

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{Context, Result, eyre};
use ortho_config::OrthoConfig as _;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use merkmal_backend::domain::ConnectionHealthMonitor;
use merkmal_backend::inbound::http::health::HealthState;
use merkmal_backend::outbound::RetryingRecordRepository;
use merkmal_backend::outbound::persistence::{
    DbPool, DieselRecordRepository, DieselStoreHealthProbe, run_pending_migrations,
};
#[cfg(feature = "metrics")]
use merkmal_backend::server::build_prometheus;
use merkmal_backend::server::{ServerConfig, ServerSettings, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings =
        ServerSettings::load().map_err(|err| eyre!("failed to load settings: {err}"))?;
    let pool_config = settings.pool_config()?;
    info!(database = %pool_config.redacted_url(), "using record store");

    if settings.skip_migrations {
        info!("skipping database migrations");
    } else {
        run_pending_migrations(pool_config.database_url())
            .await
            .wrap_err("database migrations failed")?;
    }

    let pool = DbPool::new(pool_config)
        .await
        .wrap_err("failed to build database pool")?;
    let monitor = Arc::new(ConnectionHealthMonitor::new(
        Arc::new(DieselStoreHealthProbe::new(pool.clone())),
        settings.health_check_interval(),
    ));
    monitor.start();
    let repository = RetryingRecordRepository::new(
        Arc::new(DieselRecordRepository::new(pool)),
        monitor.clone(),
        settings.retry_policy(),
    );

    let health_state = web::Data::new(HealthState::new(monitor.clone()));
    let config = ServerConfig::new(settings.bind_addr()?, Arc::new(repository));
    #[cfg(feature = "metrics")]
    let config = config.with_metrics(Some(build_prometheus()?));

    let server = create_server(health_state.clone(), config)?;
    let outcome = server.await;
    health_state.mark_unhealthy();
    monitor.stop();
    outcome.wrap_err("http server failed")
}
