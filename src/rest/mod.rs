// rest/mod.rs — Public HTTP API server.
//
// Endpoints:
//   GET    /                   (no auth, greeting)
//   GET    /health             (no auth)
//   POST   /tasks/
//   GET    /tasks/?status=X
//   GET    /tasks/{id}
//   PUT    /tasks/{id}
//   DELETE /tasks/{id}

pub mod auth;
pub mod error;
pub mod routes;

use anyhow::Result;
use axum::{middleware, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::AppContext;

pub async fn start_rest_server(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;

    let router = build_router(ctx);

    info!("Task API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to install ctrl-c handler: {e}");
    }
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    // Task routes sit behind the shared-key guard; the greeting and health
    // probe stay open. Both /tasks and /tasks/ are routed directly — axum
    // does not redirect between them.
    let tasks = Router::new()
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/tasks/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/tasks/{id}",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route_layer(middleware::from_fn_with_state(
            ctx.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/", get(routes::health::root))
        .route("/health", get(routes::health::health))
        .merge(tasks)
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}
