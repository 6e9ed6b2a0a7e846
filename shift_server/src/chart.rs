use gear_predictor::CurvePoint;
use std::fmt::Write;

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 280.0;
const MARGIN_L: f64 = 56.0;
const MARGIN_R: f64 = 24.0;
const MARGIN_T: f64 = 12.0;
const MARGIN_B: f64 = 36.0;

/// Line chart of the rpm→speed curve. Points carrying a `current` marker are
/// drawn as highlighted dots at the live speed.
pub fn render_curve_svg(curve: &[CurvePoint]) -> String {
    let (min_rpm, max_rpm) = match (curve.first(), curve.last()) {
        (Some(first), Some(last)) if last.rpm > first.rpm => (f64::from(first.rpm), f64::from(last.rpm)),
        _ => (0.0, 1.0),
    };
    let max_speed = curve
        .iter()
        .map(|p| f64::from(p.speed_kmh).max(p.current.unwrap_or(0.0)))
        .fold(1.0_f64, f64::max);

    let plot_w = WIDTH - MARGIN_L - MARGIN_R;
    let plot_h = HEIGHT - MARGIN_T - MARGIN_B;
    let x = |rpm: f64| MARGIN_L + (rpm - min_rpm) / (max_rpm - min_rpm) * plot_w;
    let y = |speed: f64| MARGIN_T + plot_h - speed / max_speed * plot_h;

    let mut svg = String::new();
    let _ = write!(
        svg,
        r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" class="curve-chart">"##,
        w = WIDTH,
        h = HEIGHT
    );

    // grid
    for i in 0..=4 {
        let gy = MARGIN_T + plot_h * f64::from(i) / 4.0;
        let label = max_speed * f64::from(4 - i) / 4.0;
        let _ = write!(
            svg,
            r##"<line x1="{x1:.1}" y1="{gy:.1}" x2="{x2:.1}" y2="{gy:.1}" stroke="#334155" stroke-dasharray="3 3"/><text x="{tx:.1}" y="{ty:.1}" fill="#94a3b8" font-size="11" text-anchor="end">{label:.0}</text>"##,
            x1 = MARGIN_L,
            x2 = WIDTH - MARGIN_R,
            tx = MARGIN_L - 6.0,
            ty = gy + 4.0,
        );
    }
    for rpm in (1000..=7000).step_by(1000) {
        let gx = x(f64::from(rpm));
        let _ = write!(
            svg,
            r##"<text x="{gx:.1}" y="{ty:.1}" fill="#94a3b8" font-size="11" text-anchor="middle">{rpm}</text>"##,
            ty = HEIGHT - MARGIN_B + 16.0,
        );
    }
    let _ = write!(
        svg,
        r##"<text x="{tx:.1}" y="{ty:.1}" fill="#94a3b8" font-size="11" text-anchor="end">RPM</text><text x="12" y="{my:.1}" fill="#94a3b8" font-size="11" transform="rotate(-90 12 {my:.1})" text-anchor="middle">Speed (km/h)</text>"##,
        tx = WIDTH - MARGIN_R,
        ty = HEIGHT - 4.0,
        my = MARGIN_T + plot_h / 2.0,
    );

    let points: Vec<String> = curve
        .iter()
        .map(|p| format!("{:.1},{:.1}", x(f64::from(p.rpm)), y(f64::from(p.speed_kmh))))
        .collect();
    let _ = write!(
        svg,
        r##"<polyline fill="none" stroke="#22d3ee" stroke-width="2" points="{}"/>"##,
        points.join(" ")
    );

    for p in curve {
        if let Some(speed) = p.current {
            let _ = write!(
                svg,
                r##"<circle class="live-point" cx="{:.1}" cy="{:.1}" r="6" fill="#fbbf24"/>"##,
                x(f64::from(p.rpm)),
                y(speed)
            );
        }
    }

    svg.push_str("</svg>");
    svg
}
