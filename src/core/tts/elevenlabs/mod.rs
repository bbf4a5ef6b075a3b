//! ElevenLabs streaming adapter.
//!
//! One WebSocket per speaking session against the `stream-input` endpoint:
//!
//! ```text
//! wss://api.elevenlabs.io/v1/text-to-speech/{voice_id}/stream-input
//!     ?model_id=eleven_multilingual_v2&output_format=pcm_16000
//! xi-api-key: {api_key}
//! ```
//!
//! Text goes out as `{"text": ..., "flush": true}` messages, audio comes back as
//! base64 PCM16 at 16 kHz together with character alignment. Audio is
//! downsampled to 8 kHz, framed and paced towards the PBX. A single space is sent
//! every keep-alive interval so the vendor does not close an idle stream.

mod config;
mod messages;
mod provider;
mod voices;

use std::time::Duration;

pub use config::ElevenLabsConfig;
pub use messages::{Alignment, StreamResponse, TextMessage};
pub use provider::{ElevenLabsSession, ElevenLabsStreamer};
pub use voices::{base_language, is_valid_voice_id, select_voice, voice_for_language};

/// Default ElevenLabs WebSocket endpoint
pub const ELEVENLABS_WS_URL: &str = "wss://api.elevenlabs.io";

/// Rachel
pub const DEFAULT_VOICE_ID: &str = "EXAVITQu4vr4xnSDxMaL";

pub const DEFAULT_MODEL_ID: &str = "eleven_multilingual_v2";

/// Lowest raw PCM rate ElevenLabs produces.
pub const DEFAULT_OUTPUT_FORMAT: &str = "pcm_16000";

pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);

pub const VOICE_ID_LENGTH: usize = 20;

/// Flow variable that overrides the voice for a call.
pub const VOICE_ID_VARIABLE: &str = "tts.elevenlabs.voice_id";

/// Sample rate of a supported PCM output format.
pub fn output_format_rate(format: &str) -> Option<u32> {
    match format {
        "pcm_16000" => Some(16000),
        "pcm_24000" => Some(24000),
        "pcm_48000" => Some(48000),
        _ => None,
    }
}
