//! Liveness, readiness and store probes for orchestrators and operators.
//!
//! Probe responses are never cached. These routes sit outside `/api`, so the
//! store health gate does not intercept them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use actix_web::http::{StatusCode, header};
use actix_web::{HttpResponse, get, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::ConnectionHealthMonitor;
use crate::inbound::http::envelope::Envelope;

/// Process lifecycle flags plus the store monitor.
pub struct HealthState {
    ready: AtomicBool,
    live: AtomicBool,
    monitor: Arc<ConnectionHealthMonitor>,
}

impl HealthState {
    /// Start not ready but live.
    pub fn new(monitor: Arc<ConnectionHealthMonitor>) -> Self {
        Self {
            ready: AtomicBool::new(false),
            live: AtomicBool::new(true),
            monitor,
        }
    }

    /// Mark the server as ready to take traffic.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Fail liveness probes from now on, e.g. while draining.
    pub fn mark_unhealthy(&self) {
        self.live.store(false, Ordering::Release);
    }

    /// Ready and the store answers.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire) && self.monitor.is_healthy()
    }

    /// Whether the process reports itself alive.
    pub fn is_alive(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Store monitor shared with the gate and the repository decorator.
    pub fn monitor(&self) -> &Arc<ConnectionHealthMonitor> {
        &self.monitor
    }

    fn probe_response(probe_ok: bool) -> HttpResponse {
        let mut response = if probe_ok {
            HttpResponse::Ok()
        } else {
            HttpResponse::ServiceUnavailable()
        };
        response
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .finish()
    }
}

/// Result of an on-demand store probe.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct StoreHealthBody {
    /// Whether the store answered.
    pub healthy: bool,
}

/// Readiness probe: 200 once started and while the store answers.
#[utoipa::path(
    get,
    path = "/health/ready",
    tags = ["health"],
    responses(
        (status = 200, description = "Server is ready to handle traffic"),
        (status = 503, description = "Server starting or record store unreachable")
    )
)]
#[get("/health/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    HealthState::probe_response(state.is_ready())
}

/// Liveness probe: 200 while the process is marked alive.
#[utoipa::path(
    get,
    path = "/health/live",
    tags = ["health"],
    responses(
        (status = 200, description = "Server is alive"),
        (status = 503, description = "Server is shutting down")
    )
)]
#[get("/health/live")]
pub async fn live(state: web::Data<HealthState>) -> HttpResponse {
    HealthState::probe_response(state.is_alive())
}

/// Probe the record store now and report the outcome.
#[utoipa::path(
    get,
    path = "/health/db",
    tags = ["health"],
    responses(
        (status = 200, description = "Record store reachable", body = StoreHealthBody),
        (status = 503, description = "Record store unreachable", body = StoreHealthBody)
    )
)]
#[get("/health/db")]
pub async fn store(state: web::Data<HealthState>) -> HttpResponse {
    let healthy = state.monitor.check_now().await;
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let mut response = Envelope::new(StoreHealthBody { healthy }).respond(status);
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use actix_web::{App, test as actix_test};
    use rstest::{fixture, rstest};
    use serde_json::Value;

    use super::*;
    use crate::domain::ports::{InMemoryRecordRepository, RecordRepositoryError};

    #[fixture]
    fn store() -> Arc<InMemoryRecordRepository> {
        Arc::new(InMemoryRecordRepository::new())
    }

    fn health_state(store: &Arc<InMemoryRecordRepository>) -> web::Data<HealthState> {
        let monitor = ConnectionHealthMonitor::new(store.clone(), Duration::from_secs(30));
        web::Data::new(HealthState::new(Arc::new(monitor)))
    }

    #[rstest]
    #[actix_web::test]
    async fn readiness_waits_for_start_and_store(store: Arc<InMemoryRecordRepository>) {
        let state = health_state(&store);
        let app = actix_test::init_service(
            App::new().app_data(state.clone()).service(ready),
        )
        .await;
        let probe = || actix_test::TestRequest::get().uri("/health/ready").to_request();

        let before = actix_test::call_service(&app, probe()).await;
        assert_eq!(before.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            before.headers().get(header::CACHE_CONTROL).map(|v| v.as_bytes()),
            Some(&b"no-store"[..])
        );

        state.mark_ready();
        let after = actix_test::call_service(&app, probe()).await;
        assert_eq!(after.status(), StatusCode::OK);

        state.monitor().mark_unhealthy("retries exhausted");
        let degraded = actix_test::call_service(&app, probe()).await;
        assert_eq!(degraded.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[rstest]
    #[actix_web::test]
    async fn liveness_fails_once_draining(store: Arc<InMemoryRecordRepository>) {
        let state = health_state(&store);
        let app = actix_test::init_service(
            App::new().app_data(state.clone()).service(live),
        )
        .await;
        let probe = || actix_test::TestRequest::get().uri("/health/live").to_request();

        assert_eq!(actix_test::call_service(&app, probe()).await.status(), StatusCode::OK);
        state.mark_unhealthy();
        assert_eq!(
            actix_test::call_service(&app, probe()).await.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[rstest]
    #[actix_web::test]
    async fn store_probe_updates_monitor(store: Arc<InMemoryRecordRepository>) {
        let state = health_state(&store);
        let app = actix_test::init_service(
            App::new().app_data(state.clone()).service(super::store),
        )
        .await;
        let probe = || actix_test::TestRequest::get().uri("/health/db").to_request();

        store.fail_on("ping", RecordRepositoryError::connection("refused"));
        let down = actix_test::call_service(&app, probe()).await;
        assert_eq!(down.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = actix_test::read_body_json(down).await;
        assert_eq!(body["data"]["healthy"], false);
        assert!(!state.monitor().is_healthy());

        store.recover("ping");
        let up: Value = actix_test::call_and_read_body_json(&app, probe()).await;
        assert_eq!(up["data"]["healthy"], true);
        assert!(state.monitor().is_healthy());
    }
}
