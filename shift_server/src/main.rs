use std::sync::Arc;

use shift_server::{router, AppState, GeminiClient, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cfg = ServerConfig::from_env()?;
    if cfg.gemini.api_key.is_none() {
        tracing::warn!("API_KEY not set; analysis requests will return the fallback text");
    }
    let analyst = Arc::new(GeminiClient::new(cfg.gemini.clone()));
    tracing::info!(
        "model={} base_url={} log_predictions={}",
        analyst.model(),
        cfg.gemini.base_url,
        cfg.log_predictions
    );

    let app = router(AppState::new(analyst, cfg.log_predictions));

    tracing::info!("listening on {}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(cfg.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
