use gear_predictor::{
    efficiency_index, format_efficiency, gear_ratio, predict_gear, CurvePoint, Gear, RatioCurve,
    SnapshotError, TelemetrySnapshot, TelemetryUpdate,
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::analysis::{AnalysisOutcome, UnavailableReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavView {
    #[default]
    Readme,
    Predictor,
}

impl NavView {
    pub fn as_str(self) -> &'static str {
        match self {
            NavView::Readme => "readme",
            NavView::Predictor => "predictor",
        }
    }
}

impl fmt::Display for NavView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NavView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "readme" => Ok(NavView::Readme),
            "predictor" => Ok(NavView::Predictor),
            other => Err(format!("unknown view {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnalysisRequestState {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    #[error("an analysis request is already in progress")]
    AnalysisInFlight,
}

/// Everything the predictor panel renders, derived from one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub telemetry: TelemetrySnapshot,
    pub gear: Gear,
    pub gear_label: String,
    pub ratio: f64,
    pub efficiency_index: f64,
    pub efficiency_label: String,
    pub curve: Vec<CurvePoint>,
    pub analysis: Option<String>,
    pub analysis_state: AnalysisRequestState,
    pub analysis_note: Option<String>,
    pub analyze_enabled: bool,
}

/// Interactive panel state: the live snapshot, its gear, and the single
/// analysis slot.
#[derive(Debug, Clone)]
pub struct PredictorView {
    snapshot: TelemetrySnapshot,
    gear: Gear,
    analysis: Option<String>,
    failure: Option<UnavailableReason>,
    state: AnalysisRequestState,
    log_predictions: bool,
}

impl PredictorView {
    pub fn new(log_predictions: bool) -> Self {
        let snapshot = TelemetrySnapshot::default();
        Self {
            snapshot,
            gear: predict_gear(&snapshot),
            analysis: None,
            failure: None,
            state: AnalysisRequestState::Idle,
            log_predictions,
        }
    }

    pub fn snapshot(&self) -> &TelemetrySnapshot {
        &self.snapshot
    }

    pub fn gear(&self) -> Gear {
        self.gear
    }

    pub fn analysis(&self) -> Option<&str> {
        self.analysis.as_deref()
    }

    pub fn state(&self) -> AnalysisRequestState {
        self.state
    }

    pub fn set_snapshot(&mut self, snapshot: TelemetrySnapshot) {
        self.snapshot = snapshot;
        self.gear = predict_gear(&snapshot);

        if self.log_predictions {
            tracing::info!(
                "pred speed={} rpm={} throttle={} load={} ratio={:.4} gear={}",
                snapshot.speed_kmh(),
                snapshot.rpm(),
                snapshot.throttle_pct(),
                snapshot.engine_load_pct(),
                gear_ratio(&snapshot),
                self.gear
            );
        }
    }

    /// Applies a slider move. On error the current snapshot is kept.
    pub fn apply(&mut self, update: &TelemetryUpdate) -> Result<(), SnapshotError> {
        let next = self.snapshot.apply(update)?;
        self.set_snapshot(next);
        Ok(())
    }

    /// Enters `Loading` and hands back the reading to analyze.
    pub fn begin_analysis(&mut self) -> Result<(TelemetrySnapshot, Gear), ViewError> {
        if self.state == AnalysisRequestState::Loading {
            return Err(ViewError::AnalysisInFlight);
        }
        self.state = AnalysisRequestState::Loading;
        Ok((self.snapshot, self.gear))
    }

    /// Stores the result, replacing any previous one.
    pub fn finish_analysis(&mut self, outcome: AnalysisOutcome) {
        self.analysis = Some(outcome.display_text().to_string());
        match outcome {
            AnalysisOutcome::Ok(_) => {
                self.failure = None;
                self.state = AnalysisRequestState::Success;
            }
            AnalysisOutcome::Unavailable(reason) => {
                self.failure = Some(reason);
                self.state = AnalysisRequestState::Error;
            }
        }
    }

    pub fn dashboard(&self) -> Dashboard {
        let efficiency = efficiency_index(self.snapshot.rpm());
        let curve = RatioCurve::new(&self.snapshot);
        Dashboard {
            telemetry: self.snapshot,
            gear: self.gear,
            gear_label: self.gear.to_string(),
            ratio: curve.ratio(),
            efficiency_index: efficiency,
            efficiency_label: format_efficiency(efficiency),
            curve: curve.iter().collect(),
            analysis: self.analysis.clone(),
            analysis_state: self.state,
            analysis_note: self.failure.as_ref().map(|r| r.to_string()),
            analyze_enabled: self.state != AnalysisRequestState::Loading,
        }
    }
}

/// Top-level composition root: which panel is shown, plus the panel state.
#[derive(Debug, Clone)]
pub struct Shell {
    pub view: NavView,
    pub predictor: PredictorView,
}

impl Shell {
    pub fn new(log_predictions: bool) -> Self {
        Self {
            view: NavView::default(),
            predictor: PredictorView::new(log_predictions),
        }
    }
}
