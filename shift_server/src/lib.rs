//! Demo server for the gear-shift predictor: static readme, live predictor
//! panel, and optional AI commentary on the current reading.

pub mod analysis;
pub mod chart;
pub mod config;
pub mod pages;
pub mod routes;
pub mod view;

pub use analysis::{AnalysisOutcome, GeminiClient, TelemetryAnalyst, UnavailableReason};
pub use config::ServerConfig;
pub use routes::{router, AppState};
pub use view::{AnalysisRequestState, Dashboard, NavView, PredictorView, Shell};
