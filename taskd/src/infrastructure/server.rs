use crate::api::task_routes;
use crate::infrastructure::config::Settings;
use crate::task::TaskRepository;
use axum::{
    extract::Request,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde_json::json;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

async fn health_check() -> &'static str {
    "OK"
}

fn routes(repository: Arc<TaskRepository>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(task_routes())
        .with_state(repository)
}

/// Builds the application router: health check, task API, and middleware.
pub fn app(repository: Arc<TaskRepository>) -> Router {
    with_middleware(routes(repository))
}

/// Like [`app`], plus a `/metrics` route rendering `handle`.
///
/// The metrics route sits behind the same middleware as the API.
pub fn app_with_metrics(repository: Arc<TaskRepository>, handle: PrometheusHandle) -> Router {
    let router = routes(repository)
        .route("/metrics", get(move || std::future::ready(handle.render())));
    with_middleware(router)
}

/// Wraps a router with request ids, panic recovery, request tracing, and CORS.
pub fn with_middleware(router: Router) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    });

    // Layers added last run first.
    router
        .layer(cors)
        .layer(trace)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = %detail, "Request handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal server error" })),
    )
        .into_response()
}

/// Runs the HTTP server until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the server fails to start or encounters an error while running.
pub async fn run_server(
    config: &Settings,
    repository: Arc<TaskRepository>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {e}"))?;

    let app = app_with_metrics(repository, handle);

    let addr = config.server.bind_address().to_socket_addr()?;

    tracing::info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
