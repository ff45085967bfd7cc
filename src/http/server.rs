//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the batch endpoint
//! - Wire up middleware (tracing, limits, request ID, CORS)
//! - Bind server to listener
//! - Hand each batch to the dispatch engine

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ListenerConfig;
use crate::dispatch::BatchError;
use crate::http::request::request_context;
use crate::routing::Router as BlestRouter;

/// Application state injected into handlers.
#[derive(Clone)]
struct AppState {
    router: Arc<BlestRouter>,
}

/// HTTP host serving one route registry.
pub struct HttpServer {
    app: Router,
}

impl HttpServer {
    pub fn new(router: BlestRouter, config: &ListenerConfig) -> Self {
        let state = AppState {
            router: Arc::new(router),
        };
        Self {
            app: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ListenerConfig, state: AppState) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::POST, Method::OPTIONS])
            .allow_headers(Any);

        Router::new()
            .route("/", post(batch_handler))
            .with_state(state)
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(config.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(cors)
    }

    /// The fully layered router, for serving or in-process testing.
    pub fn app(&self) -> Router {
        self.app.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn batch_handler(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let batch: Value = match serde_json::from_slice(&body) {
        Ok(batch) => batch,
        Err(e) => {
            tracing::debug!(error = %e, "Rejecting unparseable batch");
            return batch_error(BatchError::bad_request(format!("Request body is not valid JSON: {e}")));
        }
    };

    let context = request_context(&headers);
    match state.router.handle(&batch, &context).await {
        Ok(results) => (StatusCode::OK, Json(results)).into_response(),
        Err(err) => batch_error(err),
    }
}

fn batch_error(err: BatchError) -> Response {
    let status = StatusCode::from_u16(err.status).unwrap_or(StatusCode::BAD_REQUEST);
    (status, Json(err)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Context;
    use crate::dispatch::HandlerError;
    use crate::routing::{handler, RouterOptions};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    fn server() -> HttpServer {
        let mut router = BlestRouter::new(RouterOptions::default()).unwrap();
        router
            .register(
                "whoami",
                handler(|_body: Value, ctx: Context| async move {
                    Ok::<_, HandlerError>(Some(json!({
                        "requestId": ctx.get("httpRequestId"),
                        "agent": ctx.get("httpHeaders").and_then(|h| h.get("user-agent").cloned()),
                    })))
                }),
            )
            .unwrap();
        HttpServer::new(router, &ListenerConfig::default())
    }

    async fn post(app: Router, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .header("user-agent", "unit-test")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_http_context_reaches_handler() {
        let (status, body) = post(server().app(), r#"[["a", "whoami"]]"#).await;
        assert_eq!(status, StatusCode::OK);

        let result = &body[0][2];
        assert_eq!(result["agent"], json!("unit-test"));
        assert!(result["requestId"].as_str().is_some_and(|id| !id.is_empty()));
        assert_eq!(body[0][3], Value::Null);
    }

    #[tokio::test]
    async fn test_invalid_json_is_bad_request() {
        let (status, body) = post(server().app(), "[[").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], json!(400));
    }

    #[tokio::test]
    async fn test_malformed_batch_is_bad_request() {
        let (status, body) = post(server().app(), r#"{"not": "a batch"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"status": 400, "message": "Request should be an array"}));
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let config = ListenerConfig {
            max_body_size: 16,
            ..ListenerConfig::default()
        };
        let app = HttpServer::new(BlestRouter::default(), &config).app();
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from(format!(r#"[["a", "whoami", {{"pad": "{}"}}]]"#, "x".repeat(64))))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_request_id_propagated() {
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header("x-request-id", "fixed-id")
            .body(Body::from("[]"))
            .unwrap();
        let response = server().app().oneshot(request).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "fixed-id");
    }
}
