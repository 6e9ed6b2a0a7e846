use futures::future::BoxFuture;
use gear_predictor::{Gear, TelemetrySnapshot};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::GeminiConfig;

pub const FALLBACK_TEXT: &str =
    "Unable to generate analysis at this time. Please check your API key.";
pub const UNAVAILABLE_TEXT: &str = "Analysis unavailable.";

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("API_KEY is not defined in the environment")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error ({status}): {message}")]
    Status {
        status: reqwest::StatusCode,
        message: String,
    },
    #[error("failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Why an analysis produced no model text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    MissingCredential,
    Remote(String),
    EmptyResponse,
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableReason::MissingCredential => f.write_str("missing API key"),
            UnavailableReason::Remote(reason) => write!(f, "remote call failed: {}", reason),
            UnavailableReason::EmptyResponse => f.write_str("empty response"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Ok(String),
    Unavailable(UnavailableReason),
}

impl AnalysisOutcome {
    /// What the panel shows. Never empty.
    pub fn display_text(&self) -> &str {
        match self {
            AnalysisOutcome::Ok(text) => text,
            AnalysisOutcome::Unavailable(UnavailableReason::EmptyResponse) => UNAVAILABLE_TEXT,
            AnalysisOutcome::Unavailable(_) => FALLBACK_TEXT,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, AnalysisOutcome::Ok(_))
    }
}

/// Commentary source for the predictor panel. Implementations must not fail
/// outward: every error is folded into `AnalysisOutcome::Unavailable`.
pub trait TelemetryAnalyst: Send + Sync {
    fn analyze(&self, snapshot: TelemetrySnapshot, gear: Gear) -> BoxFuture<'_, AnalysisOutcome>;
}

pub fn build_prompt(snapshot: &TelemetrySnapshot, gear: Gear) -> String {
    format!(
        "You are an expert automotive engineer and driving instructor.
Analyze the following telemetry snapshot from a vehicle:

- Speed: {speed} km/h
- RPM: {rpm}
- Throttle: {throttle}%
- Engine Load: {load}%
- Current Gear (Predicted): {gear}

Provide a concise 2-3 sentence analysis.
1. Is the gear selection appropriate for this speed and RPM?
2. Briefly describe the likely driving scenario (e.g., \"Aggressive highway merge\", \"Efficient cruising\", \"Struggling up an incline\").

Keep the tone professional but accessible.
",
        speed = snapshot.speed_kmh(),
        rpm = snapshot.rpm(),
        throttle = snapshot.throttle_pct(),
        load = snapshot.engine_load_pct(),
        gear = gear.index(),
    )
}

// ---------- Wire types (generateContent) ----------

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl GenerateResponse {
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

// ---------- Client ----------

pub struct GeminiClient {
    http: reqwest::Client,
    cfg: GeminiConfig,
}

impl GeminiClient {
    pub fn new(cfg: GeminiConfig) -> Self {
        Self { http: reqwest::Client::new(), cfg }
    }

    pub fn model(&self) -> &str {
        &self.cfg.model
    }

    fn api_key(&self) -> Result<&str, AnalysisError> {
        self.cfg.api_key.as_deref().ok_or(AnalysisError::MissingApiKey)
    }

    /// One generateContent round trip. `Ok(None)` means the service answered
    /// but produced no text.
    pub async fn generate(&self, prompt: &str) -> Result<Option<String>, AnalysisError> {
        let api_key = self.api_key()?;
        let url = format!("{}/models/{}:generateContent", self.cfg.base_url, self.cfg.model);
        let request = GenerateRequest {
            contents: vec![RequestContent { parts: vec![RequestPart { text: prompt }] }],
        };

        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error)
                .map(|d| d.message)
                .unwrap_or(body);
            return Err(AnalysisError::Status { status, message });
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)?;
        Ok(parsed.text())
    }
}

impl TelemetryAnalyst for GeminiClient {
    fn analyze(&self, snapshot: TelemetrySnapshot, gear: Gear) -> BoxFuture<'_, AnalysisOutcome> {
        Box::pin(async move {
            let prompt = build_prompt(&snapshot, gear);
            match self.generate(&prompt).await {
                Ok(Some(text)) => AnalysisOutcome::Ok(text),
                Ok(None) => {
                    tracing::warn!("analysis returned no text (model={})", self.cfg.model);
                    AnalysisOutcome::Unavailable(UnavailableReason::EmptyResponse)
                }
                Err(AnalysisError::MissingApiKey) => {
                    tracing::error!("analysis skipped: {}", AnalysisError::MissingApiKey);
                    AnalysisOutcome::Unavailable(UnavailableReason::MissingCredential)
                }
                Err(e) => {
                    tracing::error!("analysis error: {}", e);
                    AnalysisOutcome::Unavailable(UnavailableReason::Remote(e.to_string()))
                }
            }
        })
    }
}
