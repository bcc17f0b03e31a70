//! Prometheus request metrics behind the `metrics` feature.
//!
//! [`MetricsLayer`] wraps the app either way so `create_server` keeps one
//! concrete app type; the disabled variant only boxes the body.

use std::sync::Arc;

use actix_service::boxed::{self, BoxService};
use actix_service::{Service, ServiceExt as _, Transform};
use actix_web::body::{BoxBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Compat;
use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use futures_util::future::LocalBoxFuture;

const NAMESPACE: &str = "merkmal";
const ENDPOINT: &str = "/metrics";

/// Build the Prometheus middleware serving [`ENDPOINT`].
///
/// # Errors
///
/// Returns an error if the default collectors cannot be registered.
pub(crate) fn build_prometheus() -> std::io::Result<PrometheusMetrics> {
    PrometheusMetricsBuilder::new(NAMESPACE)
        .endpoint(ENDPOINT)
        .build()
        .map_err(|err| std::io::Error::other(format!("prometheus setup failed: {err}")))
}

#[derive(Clone)]
pub(crate) enum MetricsLayer {
    Enabled(Arc<PrometheusMetrics>),
    Disabled,
}

impl MetricsLayer {
    pub(crate) fn from_option(metrics: Option<PrometheusMetrics>) -> Self {
        metrics.map_or(Self::Disabled, |metrics| Self::Enabled(Arc::new(metrics)))
    }
}

type BoxedApp = BoxService<ServiceRequest, ServiceResponse<BoxBody>, actix_web::Error>;

impl<S, B> Transform<S, ServiceRequest> for MetricsLayer
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = BoxedApp;
    type Future = LocalBoxFuture<'static, Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        match self {
            Self::Enabled(metrics) => {
                let transform = Compat::new(PrometheusMetrics::clone(metrics)).new_transform(service);
                Box::pin(async move { Ok(boxed::service(transform.await?)) })
            }
            Self::Disabled => {
                let service = service.map(ServiceResponse::map_into_boxed_body);
                Box::pin(async move { Ok(boxed::service(service)) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test, web};

    use super::*;

    #[actix_web::test]
    async fn enabled_layer_serves_metrics_endpoint() {
        let prometheus = build_prometheus().expect("prometheus");
        let app = test::init_service(
            App::new()
                .wrap(MetricsLayer::from_option(Some(prometheus)))
                .route("/api/records", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let api = test::TestRequest::get().uri("/api/records").to_request();
        let _ = test::call_and_read_body(&app, api).await;

        let scrape = test::TestRequest::get().uri(ENDPOINT).to_request();
        let body = test::call_and_read_body(&app, scrape).await;
        let text = std::str::from_utf8(&body).expect("utf8 metrics");
        assert!(text.contains("merkmal_http_requests_total"));
    }

    #[actix_web::test]
    async fn disabled_layer_passes_through() {
        let app = test::init_service(
            App::new()
                .wrap(MetricsLayer::from_option(None))
                .route("/", web::get().to(|| async { HttpResponse::NoContent().finish() })),
        )
        .await;
        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let missing = test::TestRequest::get().uri(ENDPOINT).to_request();
        assert_eq!(
            test::call_service(&app, missing).await.status(),
            StatusCode::NOT_FOUND
        );
    }
}
