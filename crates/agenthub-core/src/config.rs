//! Settings - serde structs for `agenthub.toml` plus environment overrides
//!
//! Resolution order: built-in defaults, then the TOML file (if any), then
//! environment variables (a `.env` file in the working directory is loaded
//! first). CLI flags are applied on top by the binary.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Models known to support function calling.
pub const FUNCTION_CALLING_MODELS: &[&str] = &[
    "grok-3-beta",
    "grok-3-mini-beta",
    "grok-4",
    "grok-4-fast-reasoning",
    "grok-4-fast-non-reasoning",
    "grok-4-1-fast",
    "grok-4-1-fast-reasoning",
    "grok-4-1-fast-non-reasoning",
    "grok-code-fast-1",
];

pub const DEFAULT_BASE_URL: &str = "https://api.x.ai/v1";
pub const DEFAULT_MODEL: &str = "grok-4-1-fast";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Bearer key for the model endpoint.
    pub api_key: Option<String>,
    pub model: String,
    /// OpenAI-compatible base URL (without `/chat/completions`).
    pub base_url: String,
    /// Gateway calls allowed per run before the safety cutoff.
    pub max_iterations: usize,
    /// Workspace used when a session is created without one.
    pub default_workspace: PathBuf,
    /// USD per million prompt tokens.
    pub input_price: f64,
    /// USD per million completion tokens.
    pub output_price: f64,
    pub google_api_key: Option<String>,
    pub google_search_engine_id: Option<String>,
    pub server: ServerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_iterations: 10,
            default_workspace: PathBuf::from("../workspaces/default-project"),
            input_price: 5.0,
            output_price: 15.0,
            google_api_key: None,
            google_search_engine_id: None,
            server: ServerSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
    pub bind: BindMode,
    /// Origins allowed by CORS. Empty means any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 8000,
            bind: BindMode::default(),
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
        }
    }
}

/// Bind mode for the server
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    Loopback,
    #[default]
    Lan,
}

impl BindMode {
    pub fn to_addr(&self) -> &str {
        match self {
            BindMode::Loopback => "127.0.0.1",
            BindMode::Lan => "0.0.0.0",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "loopback" | "localhost" | "127.0.0.1" => BindMode::Loopback,
            _ => BindMode::Lan,
        }
    }
}

impl Settings {
    /// Load settings: defaults, then `path` (when given and present), then env.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        // A missing .env is the normal case.
        let _ = dotenvy::dotenv();

        let mut settings = match path {
            Some(p) if p.exists() => Self::from_file(p)?,
            Some(p) => {
                debug!("Config file {} not found, using defaults", p.display());
                Self::default()
            }
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("XAI_API_KEY").or_else(|| lookup("GROK_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(model) = lookup("GROK_MODEL") {
            self.model = model;
        }
        if let Some(url) = lookup("GROK_BASE_URL") {
            self.base_url = url;
        }
        if let Some(ws) = lookup("AGENTHUB_WORKSPACE") {
            self.default_workspace = PathBuf::from(ws);
        }
        if let Some(v) = lookup("AGENTHUB_MAX_ITERATIONS") {
            match v.parse() {
                Ok(n) => self.max_iterations = n,
                Err(_) => warn!("Ignoring invalid AGENTHUB_MAX_ITERATIONS={}", v),
            }
        }
        if let Some(v) = lookup("AGENTHUB_INPUT_PRICE") {
            match v.parse() {
                Ok(p) => self.input_price = p,
                Err(_) => warn!("Ignoring invalid AGENTHUB_INPUT_PRICE={}", v),
            }
        }
        if let Some(v) = lookup("AGENTHUB_OUTPUT_PRICE") {
            match v.parse() {
                Ok(p) => self.output_price = p,
                Err(_) => warn!("Ignoring invalid AGENTHUB_OUTPUT_PRICE={}", v),
            }
        }
        if let Some(v) = lookup("AGENTHUB_PORT") {
            match v.parse() {
                Ok(p) => self.server.port = p,
                Err(_) => warn!("Ignoring invalid AGENTHUB_PORT={}", v),
            }
        }
        if let Some(key) = lookup("GOOGLE_API_KEY") {
            self.google_api_key = Some(key);
        }
        if let Some(id) = lookup("GOOGLE_SEARCH_ENGINE_ID") {
            self.google_search_engine_id = Some(id);
        }
    }

    /// Reject settings the agent loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(Error::Config("max_iterations must be at least 1".into()));
        }
        if self.input_price < 0.0 || self.output_price < 0.0 {
            return Err(Error::Config("token prices must be non-negative".into()));
        }
        Ok(())
    }

    pub fn supports_function_calling(&self) -> bool {
        FUNCTION_CALLING_MODELS.contains(&self.model.as_str())
    }

    /// Log a warning when the configured model may not support tool use.
    pub fn warn_on_unsupported_model(&self) {
        if !self.supports_function_calling() {
            warn!(
                model = %self.model,
                recommended = %FUNCTION_CALLING_MODELS[..3].join(", "),
                "Model may not support function calling; tool requests may be rejected"
            );
        }
    }
}
