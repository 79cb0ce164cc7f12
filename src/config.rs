//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `host.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - ServerConfig: bind address and CORS toggle.
//!     - AiConfig: chat-completion endpoint, model, credential source, timeout.
//!     - SensorsConfig: optional baseline profile used to fill absent fields.
//!     - FrontendConfig: where the pre-built web assets live.
//!     - LoggingConfig: log level and per-reading console output.
//!
//! ==============================================================================

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::SensorInput;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct HostConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub sensors: SensorsConfig,
    #[serde(default)]
    pub frontend: FrontendConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0:5000".to_string(), cors_permissive: true }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AiConfig {
    pub base_url: String,
    pub model: String,
    /// environment variable holding the credential
    pub api_key_env: String,
    /// inline credential, takes precedence over `api_key_env`
    pub api_key: Option<String>,
    pub request_timeout_seconds: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_key: None,
            request_timeout_seconds: 30,
        }
    }
}

impl AiConfig {
    /// Resolve the credential. Blank values count as missing.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds.max(1))
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SensorsConfig {
    /// baseline reading used for fields a device leaves out.
    /// absent = store nulls instead.
    #[serde(default)]
    pub fallback: Option<SensorInput>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FrontendConfig {
    pub dist_dir: PathBuf,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self { dist_dir: PathBuf::from("dist") }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_sensor_data: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_sensor_data: true }
    }
}

impl HostConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))
    }

    /// Load with default fallback
    pub fn load_or_default() -> Self {
        let paths = [
            PathBuf::from("config").join("host.toml"),
            PathBuf::from("..").join("config").join("host.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        println!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        println!("[CONFIG] Warning: Failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }

        println!("[CONFIG] Warning: No config file found - using defaults");
        Self::default()
    }

    /// Apply the `PORT` convention used by hosting platforms.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("PORT") {
            self.server.bind = with_port(&self.server.bind, port.trim());
        }
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("┌─────────────────────────────────────────┐");
        println!("│           HOST CONFIGURATION            │");
        println!("├─────────────────────────────────────────┤");
        println!("│ Bind: {}", self.server.bind);
        println!("│ AI Model: {}", self.ai.model);
        println!("│ AI Endpoint: {}", self.ai.base_url);
        println!("│ Fallback Profile: {}", if self.sensors.fallback.is_some() { "yes" } else { "no" });
        println!("│ Front-end: {}", self.frontend.dist_dir.display());
        println!("│ Log Level: {}", self.logging.level);
        println!("└─────────────────────────────────────────┘");
    }
}

fn with_port(bind: &str, port: &str) -> String {
    let host = bind.rsplit_once(':').map(|(h, _)| h).unwrap_or(bind);
    format!("{}:{}", host, port)
}
