use crate::chart::render_curve_svg;
use crate::view::{AnalysisRequestState, Dashboard, NavView};

const STYLE: &str = r#"
body{margin:0;display:flex;min-height:100vh;background:#020617;color:#f1f5f9;font-family:system-ui,sans-serif}
aside{width:16rem;background:#0f172a;border-right:1px solid #1e293b;display:flex;flex-direction:column}
aside .brand{padding:1.5rem;font-weight:700;border-bottom:1px solid #1e293b}
aside .brand span{color:#22d3ee}
aside nav{flex:1;padding:1.5rem .75rem}
aside nav a{display:block;padding:.75rem;border-radius:.5rem;color:#94a3b8;text-decoration:none;margin-bottom:.5rem}
aside nav a.active{background:rgba(22,78,99,.3);color:#22d3ee;border:1px solid rgba(21,94,117,.5)}
aside footer{padding:1rem;border-top:1px solid #1e293b;font-size:.75rem;color:#64748b}
main{flex:1;padding:3rem;max-width:80rem}
.card{background:#0f172a;border:1px solid #1e293b;border-radius:.75rem;padding:1.5rem;margin-bottom:1.5rem}
.grid{display:grid;grid-template-columns:1fr 2fr;gap:1.5rem}
.stats{display:grid;grid-template-columns:1fr 1fr;gap:1.5rem}
.gear{font-size:6rem;font-weight:900;font-family:monospace}
.gear small{font-size:1.5rem;color:#64748b}
.muted{color:#94a3b8}
label{display:flex;justify-content:space-between;font-size:.875rem;color:#94a3b8}
input[type=range]{width:100%;margin-bottom:1rem}
button{width:100%;padding:.75rem;background:#0891b2;color:#fff;border:0;border-radius:.5rem;font-weight:600;cursor:pointer}
button:disabled{opacity:.5;cursor:not-allowed}
.hint{border:1px dashed #1e293b;text-align:center;color:#64748b}
.note{color:#f59e0b;font-size:.875rem;background:rgba(69,26,3,.2);border:1px solid rgba(120,53,15,.5);padding:.75rem;border-radius:.25rem}
pre{background:#0f172a;padding:1rem;border-radius:.5rem;color:#cbd5e1}
table{width:100%;text-align:left}
"#;

const README_BODY: &str = r#"
<h1>AI Gear-Shift Behavior Predictor</h1>
<p class="muted">A machine learning student project simulating automotive telemetry to predict gearbox states.</p>

<section class="card">
<h2>1. Project Overview</h2>
<p>This project implements a machine learning classification pipeline designed to predict the current gear of a vehicle based on real-time telemetry inputs such as speed, engine RPM, and pedal position. By analyzing the relationship between engine speed and wheel speed (along with driver intent signals), the model acts as a "virtual sensor" for gear state estimation.</p>
</section>

<section class="card">
<h2>2. Motivation</h2>
<ul>
<li><strong>Transmission Calibration:</strong> Helps engineers optimize shift points for fuel economy vs. performance.</li>
<li><strong>Simulation:</strong> Provides realistic behavior for traffic simulation agents in autonomous driving testing.</li>
<li><strong>Driver Analysis:</strong> Detects inefficient driving habits (e.g., holding a low gear at high RPM).</li>
<li><strong>Virtual Sensing:</strong> Estimates gear state when direct CAN bus access to the transmission controller is unavailable or noisy.</li>
</ul>
</section>

<section class="card">
<h2>3. Data</h2>
<p>The model is trained on a synthetic dataset generated to mimic realistic combustion engine physics. The dataset contains 10,000+ samples.</p>
<dl>
<dt><code>speed_kmh</code></dt><dd>Vehicle longitudinal speed in km/h.</dd>
<dt><code>rpm</code></dt><dd>Engine revolutions per minute.</dd>
<dt><code>throttle_pct</code></dt><dd>Driver accelerator pedal input (0-100%).</dd>
<dt><code>engine_load_pct</code></dt><dd>Calculated load on the engine based on intake pressure.</dd>
</dl>
<p class="note"><strong>Limitation:</strong> The dataset assumes a fixed final drive ratio and does not account for clutch slippage in manual transmission scenarios.</p>
</section>

<section class="card">
<h2>4. Model</h2>
<p>A <strong>Random Forest Classifier</strong> (Scikit-Learn) is the baseline model. It is robust to non-linear relationships, which suits the interaction between speed, RPM, and throttle.</p>
<ul>
<li><strong>Input Features:</strong> 6 dimensions (scaled).</li>
<li><strong>Target:</strong> Integer Class (0=Neutral, 1-6=Gears).</li>
<li><strong>Evaluation:</strong> 80/20 Train/Test split.</li>
</ul>
<p class="note">The Live Predictor panel does not load this model. It uses a fixed speed/RPM threshold heuristic for the demo.</p>
</section>

<section class="card">
<h2>5. Results</h2>
<pre>Accuracy: 98.2%

Classification Report:
Class    Precision  Recall  F1-Score
Gear 1   0.99       0.98    0.99
Gear 2   0.97       0.96    0.97
...      ...        ...     ...</pre>
<p class="muted"><em>"Good performance" here means &gt;95% accuracy, as gear ratios create mechanically distinct clusters in the Speed/RPM feature space.</em></p>
</section>

<section class="card">
<h2>6. How to Run</h2>
<pre># 1. Start the demo server
cargo run -p shift_server

# 2. Enable AI commentary (optional)
API_KEY=... cargo run -p shift_server

# 3. Open http://localhost:8080 and pick "Live Predictor"</pre>
</section>

<section class="card">
<h2>7. Future Work</h2>
<ul>
<li>Integrate real OBD-II data from a physical vehicle.</li>
<li>Add LSTM (Recurrent Neural Network) to capture temporal shifting patterns.</li>
<li>Include road incline (slope) as a feature to improve load prediction.</li>
<li>Deploy as a real-time web dashboard (Prototype complete!).</li>
</ul>
</section>

<section class="card" id="license">
<h2>8. License &amp; Disclaimer</h2>
<p class="muted">This project is for educational purposes only. The data is synthetic, and the model is not intended for safety-critical automotive control systems.</p>
<p class="muted"><small>MIT License &copy; 2024 AI Student Team</small></p>
</section>
"#;

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn nav_link(current: NavView, target: NavView, label: &str) -> String {
    let class = if current == target { "active" } else { "" };
    format!(r#"<a class="{class}" href="/?view={target}">{label}</a>"#)
}

/// Full page: sidebar navigation plus whichever panel is selected.
pub fn render_page(view: NavView, dashboard: &Dashboard) -> String {
    let body = match view {
        NavView::Readme => README_BODY.to_string(),
        NavView::Predictor => render_predictor(dashboard),
    };
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>AutoAI.Predict</title>
<style>{STYLE}</style>
</head>
<body>
<aside>
<div class="brand">AutoAI<span>.Predict</span></div>
<nav>{readme}{predictor}</nav>
<footer>v1.0.0 Student Build</footer>
</aside>
<main>{body}</main>
</body>
</html>"#,
        readme = nav_link(view, NavView::Readme, "Project Readme"),
        predictor = nav_link(view, NavView::Predictor, "Live Predictor"),
    )
}

fn slider(field: &str, label: &str, value: f64, max: u32) -> String {
    format!(
        r#"<label for="{field}">{label}<span id="{field}_value">{value}</span></label>
<input type="range" id="{field}" name="{field}" min="0" max="{max}" value="{value}" data-field="{field}">"#
    )
}

fn render_analysis(dashboard: &Dashboard) -> String {
    match (&dashboard.analysis, dashboard.analysis_state) {
        (Some(text), _) => format!(
            r#"<section class="card" id="analysis"><h3>Gemini AI Analysis</h3><p style="white-space:pre-line">{}</p></section>"#,
            escape_html(text)
        ),
        (None, AnalysisRequestState::Idle) => r#"<section class="card hint" id="analysis"><p>Adjust telemetry sliders and click "Analyze" to get AI insights.</p></section>"#.to_string(),
        (None, _) => r#"<section id="analysis"></section>"#.to_string(),
    }
}

pub fn render_predictor(dashboard: &Dashboard) -> String {
    let t = &dashboard.telemetry;
    let (button_label, disabled) = if dashboard.analyze_enabled {
        ("Analyze with Gemini AI", "")
    } else {
        ("Analyzing...", " disabled")
    };

    format!(
        r#"<h1>Live Telemetry &amp; Prediction</h1>
<p class="muted">Interactive demonstration of the gear-shift prediction logic. Adjust the sliders to simulate driving conditions.</p>
<div class="grid">
<section class="card">
<h2>Telemetry Input</h2>
{speed}
{rpm}
{throttle}
{load}
<button id="analyze"{disabled}>{button_label}</button>
</section>
<div>
<div class="stats">
<section class="card"><h3 class="muted">Predicted Gear</h3><div class="gear"><span id="gear">{gear}</span><small> / 6</small></div></section>
<section class="card"><h3 class="muted">Efficiency Index</h3><div id="efficiency" style="font-size:1.5rem;font-weight:700">{efficiency}</div></section>
</div>
<section class="card"><h3 class="muted">RPM vs Speed Relationship</h3><div id="chart">{chart}</div></section>
</div>
</div>
{analysis}
<script>{SCRIPT}</script>"#,
        speed = slider("speed_kmh", "Speed (km/h)", t.speed_kmh(), 240),
        rpm = slider("rpm", "RPM", t.rpm(), 8000),
        throttle = slider("throttle_pct", "Throttle (%)", t.throttle_pct(), 100),
        load = slider("engine_load_pct", "Engine Load (%)", t.engine_load_pct(), 100),
        gear = dashboard.gear_label,
        efficiency = dashboard.efficiency_label,
        chart = render_curve_svg(&dashboard.curve),
        analysis = render_analysis(dashboard),
    )
}

const SCRIPT: &str = r#"
(function () {
  const proto = location.protocol === "https:" ? "wss" : "ws";
  const ws = new WebSocket(proto + "://" + location.host + "/ws");
  const chart = document.getElementById("chart");

  function render(d) {
    if (d.error) { return; }
    document.getElementById("gear").textContent = d.gear_label;
    document.getElementById("efficiency").textContent = d.efficiency_label;
    for (const key of ["speed_kmh", "rpm", "throttle_pct", "engine_load_pct"]) {
      document.getElementById(key + "_value").textContent = d.telemetry[key];
    }
    fetch("/api/chart.svg").then(r => r.text()).then(svg => { chart.innerHTML = svg; });
  }

  ws.onmessage = ev => render(JSON.parse(ev.data));

  document.querySelectorAll("input[data-field]").forEach(input => {
    input.addEventListener("input", () => {
      const update = {};
      update[input.dataset.field] = parseInt(input.value, 10);
      ws.send(JSON.stringify(update));
    });
  });

  const button = document.getElementById("analyze");
  button.addEventListener("click", () => {
    button.disabled = true;
    button.textContent = "Analyzing...";
    fetch("/api/analyze", { method: "POST" })
      .then(r => r.json())
      .then(d => {
        const section = document.getElementById("analysis");
        if (d.analysis) {
          section.className = "card";
          section.innerHTML = "<h3>Gemini AI Analysis</h3><p style=\"white-space:pre-line\"></p>";
          section.querySelector("p").textContent = d.analysis;
        }
      })
      .finally(() => {
        button.disabled = false;
        button.textContent = "Analyze with Gemini AI";
      });
  });
})();
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::PredictorView;

    #[test]
    fn test_readme_page() {
        let html = render_page(NavView::Readme, &PredictorView::new(false).dashboard());
        assert!(html.contains("AI Gear-Shift Behavior Predictor"));
        assert!(html.contains(r#"<a class="active" href="/?view=readme">Project Readme</a>"#));
        assert!(!html.contains("Telemetry Input"));
        assert!(html.contains("7. Future Work"));
        assert!(html.contains("Integrate real OBD-II data from a physical vehicle."));
        assert!(html.contains("8. License &amp; Disclaimer"));
        assert!(html.contains("not intended for safety-critical automotive control systems"));
        assert!(html.contains("MIT License"));
    }

    #[test]
    fn test_predictor_page_idle() {
        let html = render_page(NavView::Predictor, &PredictorView::new(false).dashboard());
        assert!(html.contains("<h1>Live Telemetry &amp; Prediction</h1>"));
        assert!(html.contains("Adjust the sliders to simulate driving conditions."));
        assert!(html.contains(r#"<span id="gear">4</span>"#));
        assert!(html.contains("100.0%"));
        assert!(html.contains("Analyze with Gemini AI"));
        assert!(html.contains("to get AI insights"));
        assert!(html.contains("<svg"));
    }

    #[test]
    fn test_predictor_page_loading_disables_button() {
        let mut view = PredictorView::new(false);
        view.begin_analysis().unwrap();
        let html = render_predictor(&view.dashboard());
        assert!(html.contains(r#"<button id="analyze" disabled>Analyzing...</button>"#));
        assert!(!html.contains("to get AI insights"));
    }

    #[test]
    fn test_analysis_text_is_escaped() {
        let mut view = PredictorView::new(false);
        view.begin_analysis().unwrap();
        view.finish_analysis(crate::analysis::AnalysisOutcome::Ok("<b>4th</b> & fine".into()));
        let html = render_predictor(&view.dashboard());
        assert!(html.contains("&lt;b&gt;4th&lt;/b&gt; &amp; fine"));
    }
}
