use std::net::SocketAddr;

use url::Url;

use super::ServerConfig;

pub(super) fn validate(config: &ServerConfig) -> Result<(), String> {
    config
        .streaming_listen_address
        .parse::<SocketAddr>()
        .map_err(|e| {
            format!(
                "Invalid streaming listen_address '{}': {e}",
                config.streaming_listen_address
            )
        })?;

    if config.streaming_advertise_address.rsplit_once(':').is_none() {
        return Err(format!(
            "Invalid streaming advertise_address '{}': expected host:port",
            config.streaming_advertise_address
        ));
    }

    if config.frame_interval_ms == 0 {
        return Err("streaming frame_interval_ms must be greater than zero".to_string());
    }
    if config.identify_timeout_seconds == 0 {
        return Err("streaming identify_timeout_seconds must be greater than zero".to_string());
    }
    if config.elevenlabs_keepalive_seconds == 0 {
        return Err("elevenlabs_keepalive_seconds must be greater than zero".to_string());
    }

    for (name, value) in [
        ("call_manager_url", &config.call_manager_url),
        ("flow_manager_url", &config.flow_manager_url),
        ("elevenlabs_base_url", &config.elevenlabs_base_url),
    ] {
        if let Some(url) = value {
            Url::parse(url).map_err(|e| format!("Invalid {name} '{url}': {e}"))?;
        }
    }

    Ok(())
}
