//! # Configuration Management
//!
//! This module handles loading and managing application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Special-case HOST / PORT environment variables (deployment platforms)
//! 2. Environment variables (APP_SERVER__HOST, APP_CONVERTER__AUDIO_QUALITY, etc.)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration that contains all settings.
///
/// ## Why separate config structs:
/// Breaking configuration into logical groups (server, converter)
/// makes it easier to understand and maintain as the application grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub converter: ConverterConfig,
}

/// Server-specific configuration settings.
///
/// ## Fields:
/// - `host`: IP address or hostname to bind the server to (e.g., "127.0.0.1", "0.0.0.0")
/// - `port`: TCP port number to listen on (1-65535)
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Settings for the external extraction/conversion tool.
///
/// ## Fields:
/// - `ytdlp_bin`: Name or path of the yt-dlp executable. Left as a bare name
///   it is resolved through PATH like any other command.
/// - `temp_dir`: Directory where conversion output lands before it is streamed
///   back to the client. Files here are transient.
/// - `audio_quality`: Target bitrate passed to the MP3 post-processing stage
///   (yt-dlp's `--audio-quality`, e.g. "192").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    pub ytdlp_bin: String,
    pub temp_dir: String,
    pub audio_quality: String,
}

/// Provides default configuration values.
///
/// ## Why defaults matter:
/// Default values ensure the application can start even if no configuration file exists.
/// They also serve as documentation of reasonable starting values.
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            converter: ConverterConfig {
                ytdlp_bin: "yt-dlp".to_string(),
                temp_dir: env::temp_dir().to_string_lossy().into_owned(),
                audio_quality: "192".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Handle special cases for HOST and PORT environment variables
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__HOST=127.0.0.1`: Override server host
    /// - `APP_CONVERTER__YTDLP_BIN=/usr/local/bin/yt-dlp`: Override tool path
    /// - `HOST=0.0.0.0` / `PORT=3000`: Special cases for deployment platforms
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // required(false) means "don't error if the file is missing"
            .add_source(config::File::with_name("config").required(false))
            // Example: APP_SERVER__HOST becomes server.host in the config.
            // The double-underscore separator keeps keys that themselves
            // contain underscores (ytdlp_bin, audio_quality) reachable.
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        // Deployment platforms commonly inject bare HOST/PORT variables that
        // don't follow the APP_ prefix convention
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0 (port 0 is reserved and can't be bound)
    /// - The converter binary name, temp directory and quality target are non-empty
    ///
    /// ## Why validate:
    /// Catching configuration errors early prevents runtime failures and
    /// provides clear error messages about what's wrong.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.converter.ytdlp_bin.trim().is_empty() {
            return Err(anyhow::anyhow!("Converter binary name cannot be empty"));
        }

        if self.converter.temp_dir.trim().is_empty() {
            return Err(anyhow::anyhow!("Converter temp directory cannot be empty"));
        }

        if self.converter.audio_quality.trim().is_empty() {
            return Err(anyhow::anyhow!("Converter audio quality cannot be empty"));
        }

        Ok(())
    }

    /// Update configuration from a JSON string (used for runtime config updates).
    ///
    /// ## Partial updates:
    /// This method allows updating only some fields, not the entire configuration.
    /// For example, you can send just `{"converter": {"audio_quality": "320"}}`
    /// to change only the quality target.
    pub fn update_from_json(&mut self, json_str: &str) -> Result<()> {
        let partial_config: serde_json::Value = serde_json::from_str(json_str)?;

        if let Some(server) = partial_config.get("server") {
            if let Some(host) = server.get("host").and_then(|v| v.as_str()) {
                self.server.host = host.to_string();
            }
            if let Some(port) = server.get("port").and_then(|v| v.as_u64()) {
                self.server.port = port as u16;
            }
        }

        if let Some(converter) = partial_config.get("converter") {
            if let Some(bin) = converter.get("ytdlp_bin").and_then(|v| v.as_str()) {
                self.converter.ytdlp_bin = bin.to_string();
            }
            if let Some(dir) = converter.get("temp_dir").and_then(|v| v.as_str()) {
                self.converter.temp_dir = dir.to_string();
            }
            if let Some(quality) = converter.get("audio_quality").and_then(|v| v.as_str()) {
                self.converter.audio_quality = quality.to_string();
            }
        }

        // Validate the updated configuration to ensure it's still valid
        self.validate()?;
        Ok(())
    }
}
