use std::fmt;
use std::time::Duration;

use url::Url;

use super::{
    DEFAULT_KEEPALIVE_INTERVAL, DEFAULT_MODEL_ID, DEFAULT_OUTPUT_FORMAT, ELEVENLABS_WS_URL,
    output_format_rate,
};
use crate::core::tts::base::{TTSError, TTSResult};

/// ElevenLabs connection settings.
#[derive(Clone)]
pub struct ElevenLabsConfig {
    pub api_key: String,
    /// Scheme and host of the WebSocket endpoint, without a trailing slash.
    pub base_url: String,
    pub model_id: String,
    /// One of the raw PCM formats (`pcm_16000`, `pcm_24000`, `pcm_48000`).
    pub output_format: String,
    pub keepalive_interval: Duration,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: ELEVENLABS_WS_URL.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
        }
    }
}

impl fmt::Debug for ElevenLabsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElevenLabsConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model_id", &self.model_id)
            .field("output_format", &self.output_format)
            .field("keepalive_interval", &self.keepalive_interval)
            .finish()
    }
}

impl ElevenLabsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// The voice id is pushed as a single path segment, so reserved characters in
    /// it are percent-encoded rather than altering the path or query.
    pub fn stream_url(&self, voice_id: &str) -> TTSResult<Url> {
        let mut url = Url::parse(self.base_url.trim_end_matches('/'))
            .map_err(|e| TTSError::InvalidConfiguration(format!("invalid ElevenLabs URL: {e}")))?;

        url.path_segments_mut()
            .map_err(|_| {
                TTSError::InvalidConfiguration(format!(
                    "ElevenLabs URL cannot have a path: {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(["v1", "text-to-speech", voice_id, "stream-input"]);

        url.query_pairs_mut()
            .append_pair("model_id", &self.model_id)
            .append_pair("output_format", &self.output_format);
        Ok(url)
    }

    pub fn input_sample_rate(&self) -> TTSResult<u32> {
        output_format_rate(&self.output_format).ok_or_else(|| {
            TTSError::InvalidConfiguration(format!(
                "unsupported ElevenLabs output format: {}",
                self.output_format
            ))
        })
    }
}
