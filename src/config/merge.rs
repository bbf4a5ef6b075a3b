use super::ServerConfig;
use super::yaml::YamlConfig;

/// Applies YAML values on top of the environment-derived configuration.
pub(super) fn merge_config(mut config: ServerConfig, yaml: YamlConfig) -> ServerConfig {
    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if let Some(pod_id) = server.pod_id {
            config.pod_id = pod_id;
        }
    }

    if let Some(streaming) = yaml.streaming {
        if let Some(listen_address) = streaming.listen_address {
            config.streaming_listen_address = listen_address;
        }
        if let Some(advertise_address) = streaming.advertise_address {
            config.streaming_advertise_address = advertise_address;
        }
        if let Some(timeout) = streaming.identify_timeout_seconds {
            config.identify_timeout_seconds = timeout;
        }
        if let Some(interval) = streaming.frame_interval_ms {
            config.frame_interval_ms = interval;
        }
    }

    if let Some(providers) = yaml.providers {
        if providers.elevenlabs_api_key.is_some() {
            config.elevenlabs_api_key = providers.elevenlabs_api_key;
        }
        if providers.elevenlabs_base_url.is_some() {
            config.elevenlabs_base_url = providers.elevenlabs_base_url;
        }
        if let Some(model_id) = providers.elevenlabs_model_id {
            config.elevenlabs_model_id = model_id;
        }
        if let Some(keepalive) = providers.elevenlabs_keepalive_seconds {
            config.elevenlabs_keepalive_seconds = keepalive;
        }
    }

    if let Some(collaborators) = yaml.collaborators {
        if collaborators.call_manager_url.is_some() {
            config.call_manager_url = collaborators.call_manager_url;
        }
        if collaborators.flow_manager_url.is_some() {
            config.flow_manager_url = collaborators.flow_manager_url;
        }
    }

    config
}
