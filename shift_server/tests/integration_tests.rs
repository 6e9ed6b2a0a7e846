/// Integration tests for the predictor server routes
///
/// Run with: cargo test -p shift_server --test integration_tests -- --nocapture

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use futures::{channel::oneshot, future::BoxFuture, FutureExt};
use gear_predictor::{Gear, TelemetrySnapshot};
use parking_lot::Mutex;
use serde_json::{json, Value};
use shift_server::{
    analysis::{FALLBACK_TEXT, UNAVAILABLE_TEXT},
    config::GeminiConfig,
    router, AnalysisOutcome, AnalysisRequestState, AppState, GeminiClient, NavView,
    TelemetryAnalyst, UnavailableReason,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tower::ServiceExt;

struct FixedAnalyst(AnalysisOutcome);

impl TelemetryAnalyst for FixedAnalyst {
    fn analyze(&self, _: TelemetrySnapshot, _: Gear) -> BoxFuture<'_, AnalysisOutcome> {
        let outcome = self.0.clone();
        async move { outcome }.boxed()
    }
}

/// Holds the first request open until the test releases it.
struct GatedAnalyst {
    gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl TelemetryAnalyst for GatedAnalyst {
    fn analyze(&self, _: TelemetrySnapshot, _: Gear) -> BoxFuture<'_, AnalysisOutcome> {
        let gate = self.gate.lock().take();
        async move {
            if let Some(rx) = gate {
                let _ = rx.await;
            }
            AnalysisOutcome::Ok("Efficient cruising in fourth.".to_string())
        }
        .boxed()
    }
}

/// Panics on its first request, answers normally afterwards.
struct PanicOnceAnalyst {
    tripped: AtomicBool,
}

impl TelemetryAnalyst for PanicOnceAnalyst {
    fn analyze(&self, _: TelemetrySnapshot, _: Gear) -> BoxFuture<'_, AnalysisOutcome> {
        let first = !self.tripped.swap(true, Ordering::SeqCst);
        async move {
            if first {
                panic!("analyst blew up");
            }
            AnalysisOutcome::Ok("Recovered after a failed request.".to_string())
        }
        .boxed()
    }
}

fn app_with(analyst: Arc<dyn TelemetryAnalyst>) -> (AppState, Router) {
    let state = AppState::new(analyst, false);
    let app = router(state.clone());
    (state, app)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, String) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(v.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let resp = app.clone().oneshot(req).await.expect("response");
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

async fn call_json(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, text) = call(app, method, uri, body).await;
    let value = serde_json::from_str(&text).unwrap_or(Value::String(text));
    (status, value)
}

#[tokio::test]
async fn test_initial_dashboard() {
    println!("\n=== Test: Initial Dashboard ===");
    let (_, app) = app_with(Arc::new(FixedAnalyst(AnalysisOutcome::Ok("x".into()))));

    let (status, d) = call_json(&app, "GET", "/api/dashboard", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(d["gear"], 4);
    assert_eq!(d["gear_label"], "4");
    assert_eq!(d["efficiency_label"], "100.0%");
    assert_eq!(d["curve"].as_array().map(|c| c.len()), Some(32));
    assert_eq!(d["analysis"], Value::Null);
    assert_eq!(d["analysis_state"], "IDLE");
    assert_eq!(d["analyze_enabled"], true);
    println!("✓ Default snapshot predicts gear 4");
}

#[tokio::test]
async fn test_telemetry_updates_and_rejects() {
    println!("\n=== Test: Telemetry Updates ===");
    let (_, app) = app_with(Arc::new(FixedAnalyst(AnalysisOutcome::Ok("x".into()))));

    let (status, d) = call_json(&app, "POST", "/api/telemetry", Some(json!({ "speed_kmh": 0 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(d["gear_label"], "N");
    assert_eq!(d["telemetry"]["rpm"], 2500.0);

    let (status, d) = call_json(&app, "POST", "/api/telemetry", Some(json!({ "rpm": 9000 }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(d["error"].as_str().unwrap_or_default().contains("rpm"));

    // rejected update leaves the previous snapshot in place
    let (_, d) = call_json(&app, "GET", "/api/dashboard", None).await;
    assert_eq!(d["telemetry"]["rpm"], 2500.0);
    assert_eq!(d["telemetry"]["speed_kmh"], 0.0);
    println!("✓ Updates apply wholesale, bad values are rejected");
}

#[tokio::test]
async fn test_analysis_success() {
    println!("\n=== Test: Analysis Success ===");
    let (_, app) = app_with(Arc::new(FixedAnalyst(AnalysisOutcome::Ok(
        "Fourth gear suits steady cruising.".into(),
    ))));

    let (status, d) = call_json(&app, "POST", "/api/analyze", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(d["analysis"], "Fourth gear suits steady cruising.");
    assert_eq!(d["analysis_state"], "SUCCESS");
    assert_eq!(d["analysis_note"], Value::Null);
    println!("✓ Model text stored");
}

#[tokio::test]
async fn test_analysis_fallbacks_resolve() {
    println!("\n=== Test: Analysis Fallbacks ===");
    let cases = [
        (UnavailableReason::Remote("503".into()), FALLBACK_TEXT),
        (UnavailableReason::EmptyResponse, UNAVAILABLE_TEXT),
        (UnavailableReason::MissingCredential, FALLBACK_TEXT),
    ];
    for (reason, text) in cases {
        let (_, app) = app_with(Arc::new(FixedAnalyst(AnalysisOutcome::Unavailable(reason))));
        let (status, d) = call_json(&app, "POST", "/api/analyze", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(d["analysis"], text);
        assert_eq!(d["analysis_state"], "ERROR");
        assert!(d["analysis_note"].is_string());
    }
    println!("✓ Failures degrade to readable text");
}

#[tokio::test]
async fn test_one_analysis_in_flight() {
    println!("\n=== Test: Single In-Flight Analysis ===");
    let (release, gate) = oneshot::channel();
    let (state, app) = app_with(Arc::new(GatedAnalyst { gate: Mutex::new(Some(gate)) }));

    let first = tokio::spawn({
        let app = app.clone();
        async move { call_json(&app, "POST", "/api/analyze", None).await }
    });

    for _ in 0..1000 {
        if state.shell.lock().predictor.state() == AnalysisRequestState::Loading {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(state.shell.lock().predictor.state(), AnalysisRequestState::Loading);

    let (status, d) = call_json(&app, "GET", "/api/dashboard", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(d["analyze_enabled"], false);

    let (status, d) = call_json(&app, "POST", "/api/analyze", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(d["error"].as_str().unwrap_or_default().contains("already in progress"));

    // sliders stay live while loading
    let (status, _) = call_json(&app, "POST", "/api/telemetry", Some(json!({ "rpm": 3000 }))).await;
    assert_eq!(status, StatusCode::OK);

    release.send(()).expect("gate open");
    let (status, d) = first.await.expect("join");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(d["analysis_state"], "SUCCESS");
    assert_eq!(d["analysis"], "Efficient cruising in fourth.");
    println!("✓ Second request refused while the first is pending");
}

#[tokio::test]
async fn test_navigation() {
    println!("\n=== Test: Navigation ===");
    let (state, app) = app_with(Arc::new(FixedAnalyst(AnalysisOutcome::Ok("x".into()))));

    let (status, html) = call(&app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("AI Gear-Shift Behavior Predictor"));

    let (status, d) = call_json(&app, "POST", "/api/nav", Some(json!({ "view": "predictor" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(d["view"], "predictor");
    assert_eq!(state.shell.lock().view, NavView::Predictor);

    let (_, html) = call(&app, "GET", "/", None).await;
    assert!(html.contains("Telemetry Input"));

    let (_, html) = call(&app, "GET", "/?view=readme", None).await;
    assert!(html.contains("Project Overview"));
    assert_eq!(state.shell.lock().view, NavView::Readme);
    println!("✓ View selector switches panels");
}

#[tokio::test]
async fn test_chart_and_health() {
    println!("\n=== Test: Chart + Health ===");
    let (_, app) = app_with(Arc::new(FixedAnalyst(AnalysisOutcome::Ok("x".into()))));

    let (status, svg) = call(&app, "GET", "/api/chart.svg", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(svg.starts_with("<svg"));

    let (status, body) = call(&app, "GET", "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_missing_api_key_end_to_end() {
    println!("\n=== Test: Missing API Key ===");
    let client = GeminiClient::new(GeminiConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        api_key: None,
        ..Default::default()
    });
    let (_, app) = app_with(Arc::new(client));

    let (status, d) = call_json(&app, "POST", "/api/analyze", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(d["analysis"], FALLBACK_TEXT);
    assert_eq!(d["analysis_note"], "missing API key");

    // prediction is unaffected
    let (_, d) = call_json(&app, "POST", "/api/telemetry", Some(json!({ "speed_kmh": 120, "rpm": 3000 }))).await;
    assert_eq!(d["gear"], 6);
    println!("✓ Config error only affects analysis");
}

#[tokio::test]
async fn test_panicked_analysis_releases_slot() {
    println!("\n=== Test: Panicked Analysis Releases Slot ===");
    let (state, app) = app_with(Arc::new(PanicOnceAnalyst { tripped: AtomicBool::new(false) }));

    let (status, d) = call_json(&app, "POST", "/api/analyze", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(d["error"].as_str().unwrap_or_default().contains("analysis task failed"));
    {
        let shell = state.shell.lock();
        assert_eq!(shell.predictor.state(), AnalysisRequestState::Error);
        assert!(shell.predictor.dashboard().analyze_enabled);
    }
    println!("✓ Failed task leaves the view in Error, not Loading");

    let (_, d) = call_json(&app, "GET", "/api/dashboard", None).await;
    assert_eq!(d["analysis"], FALLBACK_TEXT);
    assert_eq!(d["analysis_state"], "ERROR");

    let (status, d) = call_json(&app, "POST", "/api/analyze", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(d["analysis_state"], "SUCCESS");
    assert_eq!(d["analysis"], "Recovered after a failed request.");
    println!("✓ Next request is accepted and succeeds");
}
