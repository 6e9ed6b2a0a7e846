use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use gear_predictor::{SnapshotError, TelemetryUpdate};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::analysis::{AnalysisOutcome, TelemetryAnalyst, UnavailableReason};
use crate::chart::render_curve_svg;
use crate::pages::render_page;
use crate::view::{Dashboard, NavView, Shell, ViewError};

// ---------- Server state ----------

#[derive(Clone)]
pub struct AppState {
    pub shell: Arc<Mutex<Shell>>,
    pub analyst: Arc<dyn TelemetryAnalyst>,
}

impl AppState {
    pub fn new(analyst: Arc<dyn TelemetryAnalyst>, log_predictions: bool) -> Self {
        Self {
            shell: Arc::new(Mutex::new(Shell::new(log_predictions))),
            analyst,
        }
    }
}

// ---------- Errors ----------

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    InvalidTelemetry(#[from] SnapshotError),
    #[error(transparent)]
    Busy(#[from] ViewError),
    #[error("analysis task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidTelemetry(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Busy(_) => StatusCode::CONFLICT,
            ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

// ---------- Request types ----------

#[derive(Deserialize, Debug)]
pub struct ViewQuery {
    view: Option<NavView>,
}

#[derive(Deserialize, Debug)]
pub struct NavRequest {
    view: NavView,
}

// ---------- Handlers ----------

async fn index(State(state): State<AppState>, Query(q): Query<ViewQuery>) -> Html<String> {
    let mut shell = state.shell.lock();
    if let Some(view) = q.view {
        shell.view = view;
    }
    Html(render_page(shell.view, &shell.predictor.dashboard()))
}

async fn nav(State(state): State<AppState>, Json(req): Json<NavRequest>) -> Json<serde_json::Value> {
    state.shell.lock().view = req.view;
    tracing::debug!("view -> {}", req.view);
    Json(json!({ "view": req.view }))
}

async fn dashboard(State(state): State<AppState>) -> Json<Dashboard> {
    Json(state.shell.lock().predictor.dashboard())
}

async fn telemetry(
    State(state): State<AppState>,
    Json(update): Json<TelemetryUpdate>,
) -> Result<Json<Dashboard>, ApiError> {
    let mut shell = state.shell.lock();
    shell.predictor.apply(&update)?;
    Ok(Json(shell.predictor.dashboard()))
}

async fn analyze(State(state): State<AppState>) -> Result<Json<Dashboard>, ApiError> {
    let (snapshot, gear) = state.shell.lock().predictor.begin_analysis()?;
    tracing::info!(
        "analysis requested speed={} rpm={} gear={}",
        snapshot.speed_kmh(),
        snapshot.rpm(),
        gear
    );

    // Runs detached so a dropped client connection cannot strand the view in Loading.
    let task_state = state.clone();
    let handle = tokio::spawn(async move {
        let outcome = task_state.analyst.analyze(snapshot, gear).await;
        tracing::info!("analysis finished ok={}", outcome.is_ok());
        let mut shell = task_state.shell.lock();
        shell.predictor.finish_analysis(outcome);
        shell.predictor.dashboard()
    });

    match handle.await {
        Ok(dashboard) => Ok(Json(dashboard)),
        Err(e) => {
            // the task never reached finish_analysis; release the slot
            tracing::error!("analysis task failed: {}", e);
            state
                .shell
                .lock()
                .predictor
                .finish_analysis(AnalysisOutcome::Unavailable(UnavailableReason::Remote(e.to_string())));
            Err(ApiError::Task(e))
        }
    }
}

async fn chart_svg(State(state): State<AppState>) -> impl IntoResponse {
    let curve = state.shell.lock().predictor.dashboard().curve;
    ([(header::CONTENT_TYPE, "image/svg+xml")], render_curve_svg(&curve))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Each inbound text frame is a slider update; each reply is the new dashboard.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut tx, mut rx) = socket.split();

    let initial = state.shell.lock().predictor.dashboard();
    if let Ok(text) = serde_json::to_string(&initial) {
        if tx.send(Message::Text(text)).await.is_err() {
            return;
        }
    }

    while let Some(msg) = rx.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!("ws receive error: {}", e);
                break;
            }
        };
        let text = match msg {
            Message::Text(t) => t,
            Message::Close(_) => break,
            _ => continue,
        };

        let reply = match apply_ws_update(&state, &text) {
            Ok(d) => serde_json::to_value(&d).unwrap_or_else(|e| json!({ "error": e.to_string() })),
            Err(e) => json!({ "error": e }),
        };
        if tx.send(Message::Text(reply.to_string())).await.is_err() {
            break;
        }
    }
}

fn apply_ws_update(state: &AppState, text: &str) -> Result<Dashboard, String> {
    let update: TelemetryUpdate = serde_json::from_str(text).map_err(|e| e.to_string())?;
    let mut shell = state.shell.lock();
    shell.predictor.apply(&update).map_err(|e| e.to_string())?;
    Ok(shell.predictor.dashboard())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/ws", get(ws))
        .route("/api/nav", post(nav))
        .route("/api/dashboard", get(dashboard))
        .route("/api/telemetry", post(telemetry))
        .route("/api/analyze", post(analyze))
        .route("/api/chart.svg", get(chart_svg))
        .with_state(state)
}
