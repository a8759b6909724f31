use std::net::SocketAddr;

use axum::{middleware, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::extractors::{require_admin, require_auth};
use crate::config::AppConfig;
use crate::error::reveal_internal_details;
use crate::state::AppState;
use crate::{admin, auth, resumes};

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "Server is running" }))
}

pub fn build_app(state: AppState) -> Router {
    // Layers run outside-in: require_auth, then require_admin.
    let admin_routes = admin::router().route_layer(middleware::from_fn(require_admin));

    let protected = Router::new()
        .merge(auth::protected_router())
        .merge(resumes::router())
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let api = Router::new()
        .merge(auth::router())
        .merge(protected)
        .route("/test", get(health));

    let mut app = Router::new().nest("/api", api).with_state(state.clone());
    if state.config.exposes_internal_errors() {
        app = app.layer(middleware::map_response(reveal_internal_details));
    }

    app.layer(CorsLayer::permissive()).layer(
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

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
