use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

pub const SPEED_RANGE_KMH: RangeInclusive<f64> = 0.0..=240.0;
pub const RPM_RANGE: RangeInclusive<f64> = 0.0..=8000.0;
pub const PERCENT_RANGE: RangeInclusive<f64> = 0.0..=100.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SnapshotError {
    #[error("{field} must be a finite number, got {value}")]
    NotFinite { field: &'static str, value: f64 },
    #[error("{field}={value} outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

fn check(field: &'static str, value: f64, range: &RangeInclusive<f64>) -> Result<f64, SnapshotError> {
    if !value.is_finite() {
        return Err(SnapshotError::NotFinite { field, value });
    }
    if !range.contains(&value) {
        return Err(SnapshotError::OutOfRange {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        });
    }
    Ok(value)
}

/// One instant of simulated vehicle state.
///
/// Always complete and always inside the slider domains. Changing any field
/// builds a new snapshot; there is no in-place mutation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSnapshot")]
pub struct TelemetrySnapshot {
    speed_kmh: f64,
    rpm: f64,
    throttle_pct: f64,
    engine_load_pct: f64,
}

#[derive(Deserialize)]
struct RawSnapshot {
    speed_kmh: f64,
    rpm: f64,
    throttle_pct: f64,
    engine_load_pct: f64,
}

impl TryFrom<RawSnapshot> for TelemetrySnapshot {
    type Error = SnapshotError;

    fn try_from(raw: RawSnapshot) -> Result<Self, Self::Error> {
        Self::new(raw.speed_kmh, raw.rpm, raw.throttle_pct, raw.engine_load_pct)
    }
}

impl TelemetrySnapshot {
    pub fn new(
        speed_kmh: f64,
        rpm: f64,
        throttle_pct: f64,
        engine_load_pct: f64,
    ) -> Result<Self, SnapshotError> {
        Ok(Self {
            speed_kmh: check("speed_kmh", speed_kmh, &SPEED_RANGE_KMH)?,
            rpm: check("rpm", rpm, &RPM_RANGE)?,
            throttle_pct: check("throttle_pct", throttle_pct, &PERCENT_RANGE)?,
            engine_load_pct: check("engine_load_pct", engine_load_pct, &PERCENT_RANGE)?,
        })
    }

    pub fn speed_kmh(&self) -> f64 {
        self.speed_kmh
    }

    pub fn rpm(&self) -> f64 {
        self.rpm
    }

    pub fn throttle_pct(&self) -> f64 {
        self.throttle_pct
    }

    pub fn engine_load_pct(&self) -> f64 {
        self.engine_load_pct
    }

    /// Builds the snapshot that results from applying `update` on top of this one.
    /// `self` is untouched when the update is rejected.
    pub fn apply(&self, update: &TelemetryUpdate) -> Result<Self, SnapshotError> {
        Self::new(
            update.speed_kmh.unwrap_or(self.speed_kmh),
            update.rpm.unwrap_or(self.rpm),
            update.throttle_pct.unwrap_or(self.throttle_pct),
            update.engine_load_pct.unwrap_or(self.engine_load_pct),
        )
    }
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self {
            speed_kmh: 60.0,
            rpm: 2500.0,
            throttle_pct: 30.0,
            engine_load_pct: 40.0,
        }
    }
}

/// A slider move: any subset of the four fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_kmh: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throttle_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_load_pct: Option<f64>,
}

/// Predicted gear: 0 is neutral, 1..=6 forward gears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Gear(u8);

impl Gear {
    pub const NEUTRAL: Gear = Gear(0);
    pub const TOP: Gear = Gear(6);

    pub fn new(index: u8) -> Option<Self> {
        (index <= Self::TOP.0).then_some(Gear(index))
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn is_neutral(self) -> bool {
        self == Self::NEUTRAL
    }
}

impl TryFrom<u8> for Gear {
    type Error = String;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Gear::new(index).ok_or_else(|| format!("gear {} outside 0..=6", index))
    }
}

impl From<Gear> for u8 {
    fn from(gear: Gear) -> u8 {
        gear.0
    }
}

impl fmt::Display for Gear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_neutral() {
            f.write_str("N")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
