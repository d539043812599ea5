use std::{any::Any, net::SocketAddr};

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, Any as AnyCors, CorsLayer},
    trace::TraceLayer,
};
use tracing::error;

use crate::{admin, auth, config::AppConfig, packages, state::AppState, users};

const DEV_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://localhost:3000"];

pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.frontend_base_url);
    let expose_errors = !state.config.production;

    Router::new()
        .route("/", get(root))
        .nest("/api/auth", auth::router())
        .nest("/api/packages", packages::router())
        .nest("/api/users", users::router())
        .nest("/api/admin", admin::router())
        .fallback(not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(move |err: Box<dyn Any + Send + 'static>| {
            panic_response(err, expose_errors)
        }))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

fn cors_layer(frontend: &str) -> CorsLayer {
    let origins: Vec<HeaderValue> = std::iter::once(frontend.trim_end_matches('/'))
        .chain(DEV_ORIGINS)
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AnyCors)
        .allow_headers(AnyCors)
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "environment": state.config.environment(),
        "endpoints": {
            "auth": "/api/auth",
            "packages": "/api/packages",
            "users": "/api/users",
            "admin": "/api/admin",
        },
    }))
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": "Route not found",
            "path": uri.path(),
        })),
    )
}

fn panic_response(err: Box<dyn Any + Send + 'static>, expose: bool) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(panic = %detail, "handler panicked");

    let mut body = json!({ "success": false, "message": "Internal server error" });
    if expose {
        body["error"] = Value::String(detail);
    }
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

pub fn bind_addr(config: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", config.host, config.port).parse()?)
}

pub async fn serve(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
