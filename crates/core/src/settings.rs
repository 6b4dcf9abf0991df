//! Environment-driven defaults for a [`crate::service::ConversationService`].

use crate::config::ConversationConfig;
use tracing::Level;

/// A custom error type for settings loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Connection defaults and logging level loaded at startup.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceSettings {
    pub agent_id: Option<String>,
    pub signed_url: Option<String>,
    pub volume: Option<f32>,
    pub log_level: Level,
}

impl ServiceSettings {
    /// Loads and validates settings from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let settings = Self::load_env()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads settings from environment variables without requiring a
    /// connection target, so callers can fill one in before validating.
    pub fn load_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let agent_id = non_empty_var("PARLEY_AGENT_ID");
        let signed_url = non_empty_var("PARLEY_SIGNED_URL");

        let volume = non_empty_var("PARLEY_VOLUME")
            .map(|raw| parse_volume(&raw))
            .transpose()?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            agent_id,
            signed_url,
            volume,
            log_level,
        })
    }

    /// Checks that a connection target is present and well formed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent_id.is_none() && self.signed_url.is_none() {
            return Err(ConfigError::MissingVar(
                "PARLEY_AGENT_ID or PARLEY_SIGNED_URL must be set".to_string(),
            ));
        }
        if let Some(url) = &self.signed_url {
            if !(url.starts_with("wss://") || url.starts_with("ws://")) {
                return Err(ConfigError::InvalidValue(
                    "PARLEY_SIGNED_URL".to_string(),
                    "expected a ws:// or wss:// URL".to_string(),
                ));
            }
        }
        if let Some(volume) = self.volume {
            check_volume(volume)?;
        }
        Ok(())
    }

    /// The constructor-time configuration layer for the service.
    pub fn default_config(&self) -> ConversationConfig {
        let mut config = ConversationConfig::new();
        config.agent_id = self.agent_id.clone();
        config.signed_url = self.signed_url.clone();
        config
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_volume(raw: &str) -> Result<f32, ConfigError> {
    let volume = raw.trim().parse::<f32>().map_err(|e| {
        ConfigError::InvalidValue("PARLEY_VOLUME".to_string(), e.to_string())
    })?;
    check_volume(volume)?;
    Ok(volume)
}

fn check_volume(volume: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&volume) {
        return Err(ConfigError::InvalidValue(
            "PARLEY_VOLUME".to_string(),
            format!("{} is outside 0.0..=1.0", volume),
        ));
    }
    Ok(())
}
