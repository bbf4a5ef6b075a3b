use std::env;
use std::str::FromStr;

use uuid::Uuid;

use super::{
    DEFAULT_ELEVENLABS_KEEPALIVE_SECONDS, DEFAULT_FRAME_INTERVAL_MS, DEFAULT_HOST,
    DEFAULT_IDENTIFY_TIMEOUT_SECONDS, DEFAULT_PORT, DEFAULT_STREAMING_LISTEN_ADDRESS, ServerConfig,
};
use crate::core::tts::elevenlabs::DEFAULT_MODEL_ID;

/// Non-empty value of an environment variable.
fn env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    match env_var(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| format!("Invalid value for {key}: {e}")),
        None => Ok(default),
    }
}

/// Port part of a `host:port` address.
fn port_of(address: &str) -> Option<&str> {
    address.rsplit_once(':').map(|(_, port)| port)
}

/// Reads the configuration from environment variables, falling back to defaults.
pub(super) fn load_from_env() -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let streaming_listen_address = env_var("STREAMING_LISTEN_ADDRESS")
        .unwrap_or_else(|| DEFAULT_STREAMING_LISTEN_ADDRESS.to_string());

    let streaming_advertise_address = match env_var("STREAMING_ADVERTISE_ADDRESS") {
        Some(address) => address,
        None => match (env_var("POD_IP"), port_of(&streaming_listen_address)) {
            (Some(ip), Some(port)) => format!("{ip}:{port}"),
            _ => streaming_listen_address.clone(),
        },
    };

    let pod_id = env_var("POD_ID")
        .or_else(|| env_var("HOSTNAME"))
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    Ok(ServerConfig {
        host: env_var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: parse_env("PORT", DEFAULT_PORT)?,
        pod_id,
        streaming_listen_address,
        streaming_advertise_address,
        identify_timeout_seconds: parse_env(
            "STREAMING_IDENTIFY_TIMEOUT_SECS",
            DEFAULT_IDENTIFY_TIMEOUT_SECONDS,
        )?,
        frame_interval_ms: parse_env("STREAMING_FRAME_INTERVAL_MS", DEFAULT_FRAME_INTERVAL_MS)?,
        elevenlabs_api_key: env_var("ELEVENLABS_API_KEY"),
        elevenlabs_base_url: env_var("ELEVENLABS_BASE_URL"),
        elevenlabs_model_id: env_var("ELEVENLABS_MODEL_ID")
            .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
        elevenlabs_keepalive_seconds: parse_env(
            "ELEVENLABS_KEEPALIVE_SECS",
            DEFAULT_ELEVENLABS_KEEPALIVE_SECONDS,
        )?,
        call_manager_url: env_var("CALL_MANAGER_URL"),
        flow_manager_url: env_var("FLOW_MANAGER_URL"),
    })
}
