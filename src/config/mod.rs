//! Configuration module for the TTS manager
//!
//! Configuration is assembled from, in order of increasing priority:
//! 1. Default values
//! 2. `.env` file values (loaded in `main.rs`)
//! 3. Environment variables
//! 4. YAML file values (`--config FILE`)
//!
//! # Example
//! ```rust,no_run
//! use tts_manager::config::ServerConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_env()?;
//! println!("API on {}, audio on {}", config.address(), config.streaming_listen_address);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

mod env;
mod merge;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

use crate::core::streaming::StreamingHandlerConfig;
use crate::core::tts::ElevenLabsConfig;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_STREAMING_LISTEN_ADDRESS: &str = "0.0.0.0:9000";
pub const DEFAULT_IDENTIFY_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 20;
pub const DEFAULT_ELEVENLABS_KEEPALIVE_SECONDS: u64 = 10;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Identity of this process instance, stored on every speaking it creates
    pub pod_id: String,

    /// Address the PBX media listener binds to
    pub streaming_listen_address: String,
    /// Address handed to call-control for the PBX to dial
    pub streaming_advertise_address: String,
    pub identify_timeout_seconds: u64,
    pub frame_interval_ms: u64,

    pub elevenlabs_api_key: Option<String>,
    /// Overrides the ElevenLabs WebSocket endpoint (scheme and host)
    pub elevenlabs_base_url: Option<String>,
    pub elevenlabs_model_id: String,
    pub elevenlabs_keepalive_seconds: u64,

    /// Call-control service; without it media channels are not requested
    pub call_manager_url: Option<String>,
    /// Flow variables service; without it voice lookups skip flow variables
    pub flow_manager_url: Option<String>,
}

impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(key) = self.elevenlabs_api_key.as_mut() {
            key.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables and defaults.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = env::load_from_env()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file on top of the environment.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = YamlConfig::from_file(path)?;
        let config = merge::merge_config(env::load_from_env()?, yaml_config);
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the HTTP API address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn identify_timeout(&self) -> Duration {
        Duration::from_secs(self.identify_timeout_seconds)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn elevenlabs_config(&self) -> ElevenLabsConfig {
        let mut config =
            ElevenLabsConfig::new(self.elevenlabs_api_key.clone().unwrap_or_default());
        config.model_id = self.elevenlabs_model_id.clone();
        config.keepalive_interval = Duration::from_secs(self.elevenlabs_keepalive_seconds);
        if let Some(base_url) = &self.elevenlabs_base_url {
            config.base_url = base_url.clone();
        }
        config
    }

    pub fn streaming_handler_config(&self) -> StreamingHandlerConfig {
        StreamingHandlerConfig {
            advertise_address: self.streaming_advertise_address.clone(),
            pod_id: self.pod_id.clone(),
            identify_timeout: self.identify_timeout(),
            frame_interval: self.frame_interval(),
        }
    }
}
