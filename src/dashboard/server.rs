//! HTTP server implementation for the graph view.
//!
//! This module provides the axum-based HTTP server that serves the view page
//! and exposes the session through a small JSON API. The layout itself runs
//! server-side; the page only draws snapshots and forwards pointer input.

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify, oneshot, watch};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use super::templates;
use crate::config::UiConfig;
use crate::error::{ErrorCode, GraphError};
use crate::graph::{Policy, ViewConfig};
use crate::interaction::{OpenRequest, PointerEvent};
use crate::layout::Size;
use crate::opener::{OpenOutcome, Opener};
use crate::render::{FrameStats, Reconcile, RetainedScene, SvgSurface};
use crate::session::{GraphSession, GraphSnapshot};

/// View server state shared across handlers.
#[derive(Clone)]
pub struct GraphViewServer {
    session: Arc<Mutex<GraphSession>>,
    /// Element mirror for `/api/frame`.
    frame: Arc<Mutex<RetainedScene>>,
    opener: Arc<dyn Opener>,
    /// Signalled whenever the view asks for a fresh scan.
    rescan: Arc<Notify>,
    lod_threshold: f64,
}

impl GraphViewServer {
    pub fn new(
        session: Arc<Mutex<GraphSession>>,
        opener: Arc<dyn Opener>,
        rescan: Arc<Notify>,
        lod_threshold: f64,
    ) -> Self {
        Self {
            session,
            frame: Arc::new(Mutex::new(RetainedScene::new(lod_threshold))),
            opener,
            rescan,
            lod_threshold,
        }
    }

    pub fn session(&self) -> &Arc<Mutex<GraphSession>> {
        &self.session
    }
}

/// Error wrapper that renders a [`GraphError`] as a JSON body.
pub struct ApiError(GraphError);

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.code {
            ErrorCode::MissingRequiredField | ErrorCode::InvalidFieldValue => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::DocumentNotFound | ErrorCode::NodeNotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self.0)).into_response()
    }
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Partial update of the view toggles. Absent fields keep their value.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ViewUpdate {
    pub show_completed: Option<bool>,
    pub show_blocked: Option<bool>,
    pub live_update: Option<bool>,
    pub use_dates: Option<bool>,
    pub task_limit: Option<usize>,
    pub show_without_tags: Option<bool>,
    pub policy: Option<Policy>,
    pub pinned_tag: Option<String>,
    /// Replace the tag selection.
    pub selected_tags: Option<BTreeSet<String>>,
    /// Flip one tag in the selection.
    pub toggle_tag: Option<String>,
    /// Clear the tag selection and the untagged toggle.
    pub clear_tags: bool,
}

impl ViewUpdate {
    /// A new configuration with this update applied on top of `base`.
    pub fn apply(&self, base: &ViewConfig) -> ViewConfig {
        let mut next = if self.clear_tags {
            base.with_tags_cleared()
        } else {
            base.clone()
        };
        if let Some(v) = self.show_completed {
            next.show_completed = v;
        }
        if let Some(v) = self.show_blocked {
            next.show_blocked = v;
        }
        if let Some(v) = self.live_update {
            next.live_update = v;
        }
        if let Some(v) = self.use_dates {
            next.use_dates = v;
        }
        if let Some(v) = self.task_limit {
            next.task_limit = v;
        }
        if let Some(v) = self.show_without_tags {
            next.show_without_tags = v;
        }
        if let Some(v) = self.policy {
            next.policy = v;
        }
        if let Some(ref tag) = self.pinned_tag {
            next.pinned_tag = tag.to_lowercase();
        }
        if let Some(ref tags) = self.selected_tags {
            next.selected_tags = tags.iter().map(|t| t.to_lowercase()).collect();
        }
        if let Some(ref tag) = self.toggle_tag {
            next = next.with_tag_toggled(tag);
        }
        next
    }
}

#[derive(Debug, Serialize)]
struct ViewResponse {
    config: ViewConfig,
    /// A fresh scan was scheduled to honor the change.
    rescan: bool,
}

#[derive(Debug, Serialize)]
struct TagsResponse {
    tags: BTreeSet<String>,
    selected: BTreeSet<String>,
    show_without_tags: bool,
}

#[derive(Debug, Deserialize)]
struct ResizeRequest {
    width: f64,
    height: f64,
}

#[derive(Debug, Serialize)]
struct PointerResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    open: Option<OpenRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<OpenOutcome>,
    dragging: bool,
}

#[derive(Debug, Serialize)]
struct FrameResponse {
    stats: FrameStats,
    reconcile: Reconcile,
    nodes: serde_json::Value,
    edges: serde_json::Value,
}

/// Root endpoint - serves the graph view page.
async fn root() -> Html<&'static str> {
    Html(templates::GRAPH_TEMPLATE)
}

/// Health check endpoint.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn api_graph(State(state): State<GraphViewServer>) -> Json<GraphSnapshot> {
    Json(state.session.lock().await.snapshot())
}

async fn api_graph_svg(State(state): State<GraphViewServer>) -> impl IntoResponse {
    let mut surface = SvgSurface::new(state.lod_threshold);
    let stats = state.session.lock().await.render(&mut surface);
    debug!(
        drawn = stats.nodes_drawn,
        culled = stats.culled,
        "Rendered SVG frame"
    );
    ([(header::CONTENT_TYPE, "image/svg+xml")], surface.into_svg())
}

/// Draw into the retained element mirror and return it with the churn.
async fn api_frame(State(state): State<GraphViewServer>) -> Json<FrameResponse> {
    let session = state.session.lock().await;
    let mut frame = state.frame.lock().await;
    let stats = session.render(&mut *frame);
    let nodes: serde_json::Map<String, serde_json::Value> = frame
        .nodes()
        .map(|(id, el)| (id.to_string(), json!(el)))
        .collect();
    Json(FrameResponse {
        stats,
        reconcile: frame.last_reconcile(),
        nodes: serde_json::Value::Object(nodes),
        edges: json!(frame.edges().collect::<Vec<_>>()),
    })
}

async fn api_tags(State(state): State<GraphViewServer>) -> Json<TagsResponse> {
    let session = state.session.lock().await;
    let config = session.config();
    Json(TagsResponse {
        tags: session.tags().clone(),
        selected: config.selected_tags.clone(),
        show_without_tags: config.show_without_tags,
    })
}

async fn api_view(State(state): State<GraphViewServer>) -> Json<ViewConfig> {
    Json((*state.session.lock().await.config()).clone())
}

async fn api_view_update(
    State(state): State<GraphViewServer>,
    Json(update): Json<ViewUpdate>,
) -> Json<ViewResponse> {
    let mut session = state.session.lock().await;
    let next = update.apply(&session.config());
    let rescan = session.set_config(next);
    if rescan {
        state.rescan.notify_one();
    }
    Json(ViewResponse {
        config: (*session.config()).clone(),
        rescan,
    })
}

async fn api_refresh(State(state): State<GraphViewServer>) -> impl IntoResponse {
    state.rescan.notify_one();
    Json(json!({ "status": "scheduled" }))
}

async fn api_fit(State(state): State<GraphViewServer>) -> impl IntoResponse {
    let fitted = state.session.lock().await.fit_to_view();
    Json(json!({ "fitted": fitted }))
}

async fn api_resize(
    State(state): State<GraphViewServer>,
    Json(request): Json<ResizeRequest>,
) -> Result<Json<Size>, ApiError> {
    let size = Size::new(request.width, request.height);
    if !(size.width.is_finite() && size.height.is_finite()) || size.is_empty() {
        return Err(GraphError::invalid_value("width/height", "must be positive").into());
    }
    state.session.lock().await.resize(size);
    Ok(Json(size))
}

async fn api_pointer(
    State(state): State<GraphViewServer>,
    Json(event): Json<PointerEvent>,
) -> Result<Json<PointerResponse>, ApiError> {
    let (request, dragging) = {
        let mut session = state.session.lock().await;
        let request = session.handle_pointer(event);
        (request, session.is_dragging())
    };
    let Some(request) = request else {
        return Ok(Json(PointerResponse {
            open: None,
            outcome: None,
            dragging,
        }));
    };
    let outcome = state.opener.open(&request).await?;
    Ok(Json(PointerResponse {
        open: Some(request),
        outcome: Some(outcome),
        dragging,
    }))
}

/// Build the router with all routes.
pub fn build_router(state: GraphViewServer) -> Router {
    // Configure CORS for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Page routes
        .route("/", get(root))
        // Graph routes
        .route("/api/graph", get(api_graph))
        .route("/api/graph/svg", get(api_graph_svg))
        .route("/api/frame", get(api_frame))
        .route("/api/tags", get(api_tags))
        .route("/api/view", get(api_view).post(api_view_update))
        // Commands
        .route("/api/refresh", post(api_refresh))
        .route("/api/fit", post(api_fit))
        .route("/api/resize", post(api_resize))
        .route("/api/pointer", post(api_pointer))
        .route("/api/health", get(health))
        // Add middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Status of the view server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    /// Serving requests.
    Running,
    /// Failed to bind, retrying in background.
    Retrying,
    /// Shut down.
    Stopped,
}

/// Handle for managing the view server lifecycle.
pub struct ServerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    status_rx: watch::Receiver<ServerStatus>,
}

impl ServerHandle {
    pub fn status(&self) -> ServerStatus {
        *self.status_rx.borrow()
    }

    /// Trigger shutdown of the view server.
    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Start the HTTP server on `host:port`.
///
/// Returns a oneshot sender that can be used to signal shutdown,
/// and the actual address the server is bound to.
pub async fn start_server(
    state: GraphViewServer,
    host: &str,
    port: u16,
) -> anyhow::Result<(oneshot::Sender<()>, SocketAddr)> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    let bound_addr = listener.local_addr()?;

    info!("Graph view listening on http://{}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("Graph view shutting down");
            })
            .await
        {
            tracing::error!("Graph view server error: {}", e);
        }
    });

    Ok((shutdown_tx, bound_addr))
}

/// Jittered retry delay: `base_ms` plus or minus up to `jitter_ms`, never
/// below one second.
fn compute_jittered_delay(base_ms: u64, jitter_ms: u64) -> Duration {
    use std::time::SystemTime;

    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    jittered(base_ms, jitter_ms, nanos)
}

fn jittered(base_ms: u64, jitter_ms: u64, entropy: u32) -> Duration {
    let span = jitter_ms.saturating_mul(2) as i64;
    let jitter = if span > 0 {
        (entropy as i64 % span) - jitter_ms as i64
    } else {
        0
    };
    Duration::from_millis((base_ms as i64 + jitter).max(1000) as u64)
}

/// Start the HTTP server, retrying in the background with exponential
/// backoff while the port is taken. Never fails.
pub fn start_server_with_retry(state: GraphViewServer, ui_config: &UiConfig) -> ServerHandle {
    let host = ui_config.host.clone();
    let port = ui_config.port;
    let retry_jitter_ms = ui_config.retry_jitter_ms;
    let retry_max_ms = ui_config.retry_max_ms;
    let retry_multiplier = ui_config.retry_multiplier;
    let mut current_delay_ms = ui_config.retry_initial_ms;

    let (status_tx, status_rx) = watch::channel(ServerStatus::Retrying);
    let (handle_shutdown_tx, mut handle_shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        loop {
            match handle_shutdown_rx.try_recv() {
                Ok(()) | Err(oneshot::error::TryRecvError::Closed) => {
                    info!("Graph view retry loop shutting down");
                    let _ = status_tx.send(ServerStatus::Stopped);
                    break;
                }
                Err(oneshot::error::TryRecvError::Empty) => {}
            }

            match start_server(state.clone(), &host, port).await {
                Ok((server_shutdown_tx, bound_addr)) => {
                    info!("Graph view available at http://{}", bound_addr);
                    let _ = status_tx.send(ServerStatus::Running);

                    let _ = handle_shutdown_rx.await;
                    let _ = server_shutdown_tx.send(());
                    let _ = status_tx.send(ServerStatus::Stopped);
                    break;
                }
                Err(e) => {
                    warn!(
                        "Failed to start graph view on {}:{}: {}. Retrying in {:.1}s...",
                        host,
                        port,
                        e,
                        current_delay_ms as f64 / 1000.0
                    );
                    let _ = status_tx.send(ServerStatus::Retrying);

                    tokio::time::sleep(compute_jittered_delay(current_delay_ms, retry_jitter_ms))
                        .await;

                    current_delay_ms =
                        ((current_delay_ms as f64 * retry_multiplier) as u64).min(retry_max_ms);
                }
            }
        }
    });

    ServerHandle {
        shutdown_tx: Some(handle_shutdown_tx),
        status_rx,
    }
}
