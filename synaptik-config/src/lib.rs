//! Configuration management for Synaptik services

use serde::Deserialize;
use std::env;

/// Which connector a host application wants by default for each service kind
#[derive(Debug, Clone, Deserialize)]
pub struct DefaultServices {
    pub chat_completion: Option<String>,
    pub embedding_generation: Option<String>,
    pub text_to_image: Option<String>,
    pub text_to_audio: Option<String>,
}

/// Application configuration
///
/// Per-connector settings (API keys, endpoints, timeouts) live next to
/// each connector as `*Config::from_env()`; this struct only carries the
/// host-level knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub defaults: DefaultServices,
    pub log_level: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            defaults: DefaultServices {
                chat_completion: env::var("SYNAPTIK_DEFAULT_CHAT_SERVICE").ok(),
                embedding_generation: env::var("SYNAPTIK_DEFAULT_EMBEDDING_SERVICE").ok(),
                text_to_image: env::var("SYNAPTIK_DEFAULT_IMAGE_SERVICE").ok(),
                text_to_audio: env::var("SYNAPTIK_DEFAULT_AUDIO_SERVICE").ok(),
            },
            log_level: Some(log_level),
        })
    }

    /// Get log level, defaulting to "info"
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }
}
