use serde::{Deserialize, Serialize};

use crate::types::TelemetrySnapshot;

pub const CURVE_RPM_START: u32 = 800;
pub const CURVE_RPM_END: u32 = 7000;
pub const CURVE_RPM_STEP: u32 = 200;
/// A curve point is "live" when it sits strictly closer than this to the snapshot rpm.
pub const CURVE_MARKER_WINDOW: f64 = 100.0;
pub const CURVE_POINTS: usize = ((CURVE_RPM_END - CURVE_RPM_START) / CURVE_RPM_STEP + 1) as usize;

/// Speed over rpm, with rpm floored at 1 so a stalled-but-moving reading stays finite.
pub fn gear_ratio(snapshot: &TelemetrySnapshot) -> f64 {
    snapshot.speed_kmh() / snapshot.rpm().max(1.0)
}

/// Display-only score peaking at 2500 rpm. Not a physical efficiency.
pub fn efficiency_index(rpm: f64) -> f64 {
    (100.0 - ((rpm - 2500.0) / 50.0).abs()).max(0.0)
}

/// One decimal, ties rounded up (99.25 shows as 99.3%).
pub fn format_efficiency(value: f64) -> String {
    format!("{:.1}%", (value * 10.0).round() / 10.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub rpm: u32,
    pub speed_kmh: u32,
    /// Snapshot speed, set only on the point nearest the live rpm.
    pub current: Option<f64>,
}

/// The rpm→speed line for the snapshot's ratio, held fixed across the sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioCurve {
    ratio: f64,
    rpm: f64,
    speed_kmh: f64,
}

impl RatioCurve {
    pub fn new(snapshot: &TelemetrySnapshot) -> Self {
        Self {
            ratio: gear_ratio(snapshot),
            rpm: snapshot.rpm(),
            speed_kmh: snapshot.speed_kmh(),
        }
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn iter(&self) -> RatioCurveIter {
        RatioCurveIter { curve: *self, next_rpm: CURVE_RPM_START }
    }

    fn point_at(&self, rpm: u32) -> CurvePoint {
        let r = f64::from(rpm);
        let current = ((r - self.rpm).abs() < CURVE_MARKER_WINDOW).then_some(self.speed_kmh);
        CurvePoint {
            rpm,
            speed_kmh: (r * self.ratio).round() as u32,
            current,
        }
    }
}

impl IntoIterator for RatioCurve {
    type Item = CurvePoint;
    type IntoIter = RatioCurveIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for &RatioCurve {
    type Item = CurvePoint;
    type IntoIter = RatioCurveIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct RatioCurveIter {
    curve: RatioCurve,
    next_rpm: u32,
}

impl Iterator for RatioCurveIter {
    type Item = CurvePoint;

    fn next(&mut self) -> Option<CurvePoint> {
        if self.next_rpm > CURVE_RPM_END {
            return None;
        }
        let point = self.curve.point_at(self.next_rpm);
        self.next_rpm += CURVE_RPM_STEP;
        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = if self.next_rpm > CURVE_RPM_END {
            0
        } else {
            ((CURVE_RPM_END - self.next_rpm) / CURVE_RPM_STEP + 1) as usize
        };
        (left, Some(left))
    }
}

impl ExactSizeIterator for RatioCurveIter {}
