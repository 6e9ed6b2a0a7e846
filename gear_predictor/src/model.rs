use crate::metrics::gear_ratio;
use crate::types::{Gear, TelemetrySnapshot};

/// Upper (exclusive) speed/rpm bound for each forward gear below the top one.
pub const GEAR_BREAKPOINTS: [(f64, u8); 5] = [
    (0.008, 1),
    (0.014, 2),
    (0.020, 3),
    (0.026, 4),
    (0.034, 5),
];

/// Fixed-threshold stand-in for the offline classifier.
///
/// Zero speed is neutral regardless of rpm. Otherwise the speed/rpm ratio is
/// bucketed against `GEAR_BREAKPOINTS`; a ratio equal to a breakpoint lands in
/// the next gear up, and anything past the last one is top gear.
pub fn predict_gear(snapshot: &TelemetrySnapshot) -> Gear {
    if snapshot.speed_kmh() == 0.0 {
        return Gear::NEUTRAL;
    }

    let ratio = gear_ratio(snapshot);
    GEAR_BREAKPOINTS
        .iter()
        .find(|(upper, _)| ratio < *upper)
        .and_then(|(_, gear)| Gear::new(*gear))
        .unwrap_or(Gear::TOP)
}
