//! HTTP surface: rendered pages, JSON, live feeds, health and assets.

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use vpcviz_config::FeedMode;
use vpcviz_core::{
    LineageStore, NetworkTopology, Publisher, RefreshStatus, SnapshotStore, StackTopology,
    Topology,
};

use crate::{feed, render};

/// Shared by every handler. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SnapshotStore>,
    pub publisher: Publisher,
    /// Parent of every live viewer's token; cancelled on shutdown.
    pub shutdown: CancellationToken,
}

pub fn router(state: AppState, feed_mode: FeedMode, assets_dir: &Path) -> Router {
    let router = Router::new()
        .route("/api/vpc", get(api_vpc))
        .route("/api/stack", get(api_stack))
        .route("/healthz", get(healthz));

    let router = match feed_mode {
        FeedMode::Render => router
            .route("/vpc", get(view_vpc))
            .route("/stack", get(view_stack)),
        FeedMode::Push => router
            .route("/vpc", get(feed_vpc))
            .route("/stack", get(feed_stack))
            .route("/view/vpc", get(live_view_vpc))
            .route("/view/stack", get(live_view_stack)),
    };

    router
        .nest_service("/assets", ServeDir::new(assets_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `shutdown` is cancelled, then drain open connections.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

/// Resolves on Ctrl-C or (on unix) SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("shutdown signal received");
}

// ── Rendered views ──────────────────────────────────────────────────

async fn view_vpc(State(state): State<AppState>) -> Html<String> {
    Html(render::render_networks(&state.store.networks().current()))
}

async fn view_stack(State(state): State<AppState>) -> Html<String> {
    Html(render::render_stacks(&state.store.stacks().current()))
}

async fn live_view_vpc(State(state): State<AppState>) -> Html<String> {
    let page = render::render_networks(&state.store.networks().current());
    Html(render::with_live_feed(&page))
}

async fn live_view_stack(State(state): State<AppState>) -> Html<String> {
    let page = render::render_stacks(&state.store.stacks().current());
    Html(render::with_live_feed(&page))
}

// ── JSON ────────────────────────────────────────────────────────────

fn json_response<T: Serialize + ?Sized>(value: &T) -> Response {
    match serde_json::to_string(value) {
        Ok(json) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            json,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("serialization error: {e}"),
        )
            .into_response(),
    }
}

async fn api_vpc(State(state): State<AppState>) -> Response {
    json_response(&*state.store.networks().current())
}

async fn api_stack(State(state): State<AppState>) -> Response {
    json_response(&*state.store.stacks().current())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LineageHealth {
    generation: u64,
    captured_at: Option<DateTime<Utc>>,
    degraded_branches: usize,
    #[serde(flatten)]
    status: RefreshStatus,
}

impl LineageHealth {
    fn of<T: Topology>(lineage: &LineageStore<T>) -> Self {
        let current = lineage.current();
        Self {
            generation: current.generation,
            captured_at: current.captured_at,
            degraded_branches: current.degraded.len(),
            status: lineage.status(),
        }
    }
}

#[derive(Serialize)]
struct Health {
    network: LineageHealth,
    stack: LineageHealth,
}

async fn healthz(State(state): State<AppState>) -> Response {
    json_response(&Health {
        network: LineageHealth::of(state.store.networks()),
        stack: LineageHealth::of(state.store.stacks()),
    })
}

// ── Live feeds ──────────────────────────────────────────────────────

async fn feed_vpc(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| async move {
        feed::run_feed::<NetworkTopology>(socket, &state.publisher, &state.shutdown).await;
    })
}

async fn feed_stack(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| async move {
        feed::run_feed::<StackTopology>(socket, &state.publisher, &state.shutdown).await;
    })
}
