use serde::Deserialize;
use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GeminiConfig {
    pub base_url: String,
    pub model: String,
    /// Only ever taken from `API_KEY`, never from the file.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub log_predictions: bool,
    pub gemini: GeminiConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_predictions: false,
            gemini: GeminiConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// File (if one is found) first, then the process environment on top.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = match resolve_config_path(std::env::var("CONFIG_PATH").ok()) {
            Some(path) => {
                tracing::info!("loading config from {}", path.display());
                Self::load(&path)?
            }
            None => {
                tracing::info!("no config file found; using defaults");
                Self::default()
            }
        };
        cfg.apply_env(|var| std::env::var(var).ok())?;
        Ok(cfg)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("BIND_ADDR") {
            self.bind_addr = v
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { var: "BIND_ADDR", value: v })?;
        }
        if let Some(v) = lookup("PORT") {
            let port: u16 = v
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { var: "PORT", value: v })?;
            self.bind_addr.set_port(port);
        }
        if let Some(v) = lookup("GEMINI_MODEL") {
            self.gemini.model = v;
        }
        if let Some(v) = lookup("GEMINI_BASE_URL") {
            self.gemini.base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("LOG_PRED") {
            self.log_predictions = v == "1";
        }
        self.gemini.api_key = lookup("API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        Ok(())
    }
}

/// An explicit path wins even if missing (load reports it). Otherwise the
/// first existing candidate, or `None` to run on defaults.
fn resolve_config_path(explicit: Option<String>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(PathBuf::from(p));
    }

    let candidates = [
        PathBuf::from("config/server.json"),
        PathBuf::from("shift_server/config/server.json"),
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join("config/server.json")))
            .unwrap_or_else(|| PathBuf::from("config/server.json")),
    ];

    candidates.into_iter().find(|c| c.exists())
}
