use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::utils::get_env_with_prefix;
use crate::webhooks::config::WebhookConfig;

/// Main configuration for a floodgate instance
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub webhooks: WebhookConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum request body size in bytes (default: 10MB)
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_json")]
    pub json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            webhooks: WebhookConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_size: default_max_body_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: default_json(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json() -> bool {
    false
}

fn default_max_body_size() -> usize {
    10 * 1024 * 1024 // 10MB default
}

impl ServerConfig {
    pub fn addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// Builder for Config with environment variable support
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    /// Set the maximum request body size in bytes
    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.config.server.max_body_size = max_body_size;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    pub fn with_webhook_config(mut self, webhooks: WebhookConfig) -> Self {
        self.config.webhooks = webhooks;
        self
    }

    /// Load configuration from environment variables with FLOODGATE_ prefix
    pub fn from_env(mut self) -> Self {
        if let Some(host) = get_env_with_prefix("HOST") {
            self.config.server.host = host;
        }
        // Check FLOODGATE_PORT first, fall back to PORT (for Railway/Heroku
        // compatibility)
        if let Some(port) = get_env_with_prefix("PORT") {
            if let Ok(p) = port.parse() {
                self.config.server.port = p;
            }
        }
        if let Some(max_body_size) = get_env_with_prefix("MAX_BODY_SIZE") {
            if let Ok(size) = max_body_size.parse() {
                self.config.server.max_body_size = size;
            }
        }
        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(json) = get_env_with_prefix("LOG_JSON") {
            self.config.logging.json = json.parse().unwrap_or(false);
        }

        self.config.webhooks = WebhookConfig::from_env();

        self
    }

    /// Build the configuration, validating all settings
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration is invalid:
    /// - Invalid server address (host:port)
    /// - Invalid log level
    /// - Missing webhook secret while verification is enabled
    /// - Zero retry budget, dispatch timeout, or sweep interval
    pub fn build(self) -> crate::error::Result<Config> {
        self.config.server.addr().map_err(|e| {
            crate::error::FloodgateError::bad_request(format!(
                "Invalid server address {}:{} - {}",
                self.config.server.host, self.config.server.port, e
            ))
        })?;

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.config.logging.level.to_lowercase().as_str()) {
            return Err(crate::error::FloodgateError::bad_request(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.config.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        if self.config.server.port == 0 {
            return Err(crate::error::FloodgateError::bad_request(
                "Server port must be greater than 0",
            ));
        }

        if self.config.server.max_body_size == 0 {
            return Err(crate::error::FloodgateError::bad_request(
                "Maximum body size must be greater than 0",
            ));
        }

        let webhooks = &self.config.webhooks;

        if webhooks.verify_signatures && webhooks.secret.is_empty() {
            return Err(crate::error::FloodgateError::bad_request(
                "Webhook secret is required when signature verification is enabled",
            ));
        }

        if webhooks.max_attempts == 0 {
            return Err(crate::error::FloodgateError::bad_request(
                "Webhook max_attempts must be greater than 0",
            ));
        }

        if webhooks.dispatch_timeout_seconds == 0 {
            return Err(crate::error::FloodgateError::bad_request(
                "Webhook dispatch timeout must be greater than 0",
            ));
        }

        if webhooks.retry_sweep_enabled && webhooks.retry_sweep_interval_seconds == 0 {
            return Err(crate::error::FloodgateError::bad_request(
                "Retry sweep interval must be greater than 0 when the sweep is enabled",
            ));
        }

        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
