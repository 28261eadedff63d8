use axum::{
    http::header::ALLOW,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{error::AppError, state::AppState, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .merge(users::router())
        .fallback(|| async { AppError::NotFound("Route") })
        .with_state(state)
        .layer(middleware::map_response(method_not_allowed))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

// The router answers a known path with the wrong method by an empty 405.
async fn method_not_allowed(res: Response) -> Response {
    if res.status() != axum::http::StatusCode::METHOD_NOT_ALLOWED {
        return res;
    }
    let allow = res.headers().get(ALLOW).cloned();
    let mut structured = AppError::MethodNotAllowed.into_response();
    if let Some(allow) = allow {
        structured.headers_mut().insert(ALLOW, allow);
    }
    structured
}

async fn home() -> Json<Value> {
    Json(json!({ "message": "Welcome to the User Management System API" }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
