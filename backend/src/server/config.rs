//! Server settings loaded via OrthoConfig and the server construction object.
//!
//! Settings merge CLI flags, `MERKMAL_*` environment variables and an
//! optional config file. Unset values fall back to the defaults below.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

#[cfg(feature = "metrics")]
use actix_web_prom::PrometheusMetrics;

use crate::domain::ports::RecordRepository;
use crate::outbound::RetryPolicy;
use crate::outbound::persistence::PoolConfig;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_DB_HOST: &str = "localhost";
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_DB_USER: &str = "postgres";
const DEFAULT_POOL_MAX_SIZE: u32 = 10;
const DEFAULT_POOL_MIN_IDLE: u32 = 2;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HEALTH_CHECK_INTERVAL_SECS: u64 = 30;
const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1000;

/// Errors raised while turning settings into concrete values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// Neither `database_url` nor `db_name` was given.
    #[error("set MERKMAL_DATABASE_URL or MERKMAL_DB_NAME")]
    MissingDatabase,
    /// The composed database URL is invalid.
    #[error("invalid database settings: {message}")]
    InvalidDatabase { message: String },
    /// `host` is not an IP address.
    #[error("invalid listen host '{host}'")]
    InvalidHost { host: String },
}

/// Runtime settings of the HTTP service.
///
/// Short flags are pinned so the `db_*` family does not collide.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "MERKMAL")]
pub struct ServerSettings {
    /// Listen address.
    #[ortho_config(cli_short = 'H')]
    pub host: Option<String>,
    /// Listen port.
    #[ortho_config(cli_short = 'p')]
    pub port: Option<u16>,
    /// Full PostgreSQL URL; overrides the `db_*` parts.
    #[ortho_config(cli_short = 'd')]
    pub database_url: Option<String>,
    /// Database host.
    #[ortho_config(cli_short = 'D')]
    pub db_host: Option<String>,
    /// Database port.
    #[ortho_config(cli_short = 'P')]
    pub db_port: Option<u16>,
    /// Database name.
    #[ortho_config(cli_short = 'n')]
    pub db_name: Option<String>,
    /// Database user.
    #[ortho_config(cli_short = 'u')]
    pub db_user: Option<String>,
    /// Database password.
    #[ortho_config(cli_short = 'w')]
    pub db_password: Option<String>,
    /// Upper bound of pooled connections.
    #[ortho_config(cli_short = 'm')]
    pub pool_max_size: Option<u32>,
    /// Idle connections kept open.
    #[ortho_config(cli_short = 'i')]
    pub pool_min_idle: Option<u32>,
    /// Seconds to wait for a pooled connection.
    #[ortho_config(cli_short = 'c')]
    pub connection_timeout_secs: Option<u64>,
    /// Seconds a single store call may take.
    #[ortho_config(cli_short = 't')]
    pub request_timeout_secs: Option<u64>,
    /// Seconds between background store probes.
    #[ortho_config(cli_short = 'k')]
    pub health_check_interval_secs: Option<u64>,
    /// Attempts per store call on connection errors.
    #[ortho_config(cli_short = 'r')]
    pub retry_max_attempts: Option<u32>,
    /// First retry delay in milliseconds; doubles per attempt.
    #[ortho_config(cli_short = 'b')]
    pub retry_base_delay_ms: Option<u64>,
    /// Skip embedded migrations at start-up.
    #[ortho_config(default = false, cli_short = 's')]
    pub skip_migrations: bool,
}

impl ServerSettings {
    /// Socket address to bind.
    ///
    /// # Errors
    ///
    /// [`SettingsError::InvalidHost`] when `host` is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let host = self.host.as_deref().unwrap_or(DEFAULT_HOST);
        let ip: IpAddr = host.parse().map_err(|_| SettingsError::InvalidHost {
            host: host.to_owned(),
        })?;
        Ok(SocketAddr::new(ip, self.port.unwrap_or(DEFAULT_PORT)))
    }

    /// PostgreSQL URL, composed from the `db_*` parts unless given whole.
    ///
    /// # Errors
    ///
    /// [`SettingsError::MissingDatabase`] when no database is named, and
    /// [`SettingsError::InvalidDatabase`] when the parts do not form a URL.
    pub fn database_url(&self) -> Result<String, SettingsError> {
        if let Some(url) = self.database_url.as_deref().filter(|url| !url.trim().is_empty()) {
            return Ok(url.to_owned());
        }
        let name = self
            .db_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .ok_or(SettingsError::MissingDatabase)?;
        let host = self.db_host.as_deref().unwrap_or(DEFAULT_DB_HOST);
        let invalid = |message: String| SettingsError::InvalidDatabase { message };

        let mut url = Url::parse(&format!("postgres://{host}"))
            .map_err(|err| invalid(err.to_string()))?;
        url.set_port(Some(self.db_port.unwrap_or(DEFAULT_DB_PORT)))
            .map_err(|()| invalid(format!("host '{host}' cannot carry a port")))?;
        url.set_username(self.db_user.as_deref().unwrap_or(DEFAULT_DB_USER))
            .map_err(|()| invalid("user cannot be set".to_owned()))?;
        url.set_password(self.db_password.as_deref())
            .map_err(|()| invalid("password cannot be set".to_owned()))?;
        url.set_path(&format!("/{name}"));
        Ok(url.to_string())
    }

    /// Pool settings for [`crate::outbound::persistence::DbPool`].
    ///
    /// # Errors
    ///
    /// Propagates [`ServerSettings::database_url`] failures.
    pub fn pool_config(&self) -> Result<PoolConfig, SettingsError> {
        Ok(PoolConfig::new(self.database_url()?)
            .with_max_size(self.pool_max_size.unwrap_or(DEFAULT_POOL_MAX_SIZE))
            .with_min_idle(Some(self.pool_min_idle.unwrap_or(DEFAULT_POOL_MIN_IDLE)))
            .with_connection_timeout(Duration::from_secs(
                self.connection_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            )))
    }

    /// Deadline and retry policy for store calls.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_max_attempts.unwrap_or(DEFAULT_RETRY_MAX_ATTEMPTS),
            Duration::from_millis(self.retry_base_delay_ms.unwrap_or(DEFAULT_RETRY_BASE_DELAY_MS)),
            Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        )
    }

    /// Period of the background store probe.
    #[must_use]
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(
            self.health_check_interval_secs
                .unwrap_or(DEFAULT_HEALTH_CHECK_INTERVAL_SECS),
        )
    }
}

/// Everything [`super::create_server`] needs besides the health state.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) repository: Arc<dyn RecordRepository>,
    #[cfg(feature = "metrics")]
    pub(crate) prometheus: Option<PrometheusMetrics>,
}

impl ServerConfig {
    /// Serve `repository` on `bind_addr`.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, repository: Arc<dyn RecordRepository>) -> Self {
        Self {
            bind_addr,
            repository,
            #[cfg(feature = "metrics")]
            prometheus: None,
        }
    }

    /// Socket address the server binds to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    #[cfg(feature = "metrics")]
    /// Attach Prometheus middleware.
    #[must_use]
    pub fn with_metrics(mut self, prometheus: Option<PrometheusMetrics>) -> Self {
        self.prometheus = prometheus;
        self
    }
}
