//! Fail-fast gate for API requests while the record store is down.
//!
//! Once the store adapter exhausts its retries the monitor flips to unhealthy
//! and every `/api` request is answered with `503 service_unavailable` without
//! reaching a handler. Health probes stay reachable so operators can see when
//! the store recovers.

use std::sync::Arc;
use std::task::{Context, Poll};

use actix_web::body::{BoxBody, MessageBody};
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, ResponseError};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::debug;

use crate::domain::{ConnectionHealthMonitor, Error as DomainError};

const GATED_PREFIX: &str = "/api";

/// Reject `/api` requests while `monitor` reports the store unhealthy.
#[derive(Clone)]
pub struct StoreHealthGate {
    monitor: Arc<ConnectionHealthMonitor>,
}

impl StoreHealthGate {
    /// Gate requests on `monitor`.
    pub fn new(monitor: Arc<ConnectionHealthMonitor>) -> Self {
        Self { monitor }
    }
}

impl<S, B> Transform<S, ServiceRequest> for StoreHealthGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = StoreHealthGateMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(StoreHealthGateMiddleware {
            service,
            monitor: self.monitor.clone(),
        }))
    }
}

/// Service wrapper produced by [`StoreHealthGate`].
pub struct StoreHealthGateMiddleware<S> {
    service: S,
    monitor: Arc<ConnectionHealthMonitor>,
}

fn is_gated(path: &str) -> bool {
    path == GATED_PREFIX
        || path
            .strip_prefix(GATED_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'))
}

impl<S, B> Service<ServiceRequest> for StoreHealthGateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if is_gated(req.path()) && !self.monitor.is_healthy() {
            debug!(path = req.path(), "rejecting request while record store is unhealthy");
            return Box::pin(async move {
                let response = DomainError::service_unavailable(
                    "database connection unavailable, retry shortly",
                )
                .error_response();
                Ok(req.into_response(response))
            });
        }
        let fut = self.service.call(req);
        Box::pin(async move { Ok(fut.await?.map_into_boxed_body()) })
    }
}
