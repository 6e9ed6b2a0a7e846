//! Gear estimation from a telemetry snapshot, plus the derived values the
//! predictor panel draws next to it.

pub mod metrics;
pub mod model;
pub mod types;

pub use metrics::{
    efficiency_index, format_efficiency, gear_ratio, CurvePoint, RatioCurve, RatioCurveIter,
    CURVE_POINTS,
};
pub use model::predict_gear;
pub use types::{Gear, SnapshotError, TelemetrySnapshot, TelemetryUpdate};
