use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional; anything left out keeps its environment or default value.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3000
///   pod_id: "tts-manager-0"
///
/// streaming:
///   listen_address: "0.0.0.0:9000"
///   advertise_address: "10.0.0.12:9000"
///   identify_timeout_seconds: 10
///   frame_interval_ms: 20
///
/// providers:
///   elevenlabs_api_key: "your-elevenlabs-key"
///   elevenlabs_model_id: "eleven_multilingual_v2"
///   elevenlabs_keepalive_seconds: 10
///
/// collaborators:
///   call_manager_url: "http://call-manager:8080"
///   flow_manager_url: "http://flow-manager:8080"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub streaming: Option<StreamingYaml>,
    pub providers: Option<ProvidersYaml>,
    pub collaborators: Option<CollaboratorsYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub pod_id: Option<String>,
}

/// PBX media listener configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StreamingYaml {
    pub listen_address: Option<String>,
    pub advertise_address: Option<String>,
    pub identify_timeout_seconds: Option<u64>,
    pub frame_interval_ms: Option<u64>,
}

/// Vendor settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersYaml {
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_base_url: Option<String>,
    pub elevenlabs_model_id: Option<String>,
    pub elevenlabs_keepalive_seconds: Option<u64>,
}

/// Collaborator service endpoints from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CollaboratorsYaml {
    pub call_manager_url: Option<String>,
    pub flow_manager_url: Option<String>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is malformed.
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 8080
  pod_id: "pod-a"

streaming:
  listen_address: "0.0.0.0:9100"
  advertise_address: "10.0.0.5:9100"
  identify_timeout_seconds: 5
  frame_interval_ms: 20

providers:
  elevenlabs_api_key: "el-key"
  elevenlabs_model_id: "eleven_flash_v2_5"

collaborators:
  call_manager_url: "http://call-manager:8080"
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let server = config.server.as_ref().unwrap();
        assert_eq!(server.host, Some("127.0.0.1".to_string()));
        assert_eq!(server.port, Some(8080));
        assert_eq!(server.pod_id, Some("pod-a".to_string()));

        let streaming = config.streaming.as_ref().unwrap();
        assert_eq!(streaming.advertise_address, Some("10.0.0.5:9100".to_string()));
        assert_eq!(streaming.identify_timeout_seconds, Some(5));

        let providers = config.providers.as_ref().unwrap();
        assert_eq!(providers.elevenlabs_api_key, Some("el-key".to_string()));
        assert_eq!(
            providers.elevenlabs_model_id,
            Some("eleven_flash_v2_5".to_string())
        );
        assert!(providers.elevenlabs_keepalive_seconds.is_none());

        let collaborators = config.collaborators.as_ref().unwrap();
        assert!(collaborators.flow_manager_url.is_none());
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.server.is_none());
        assert!(config.streaming.is_none());
    }

    #[test]
    fn test_yaml_config_from_file_malformed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "server: [unclosed").unwrap();

        let err = YamlConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse YAML config"));
    }
}
