mod base;
pub mod elevenlabs;

use std::sync::Arc;

pub use base::{
    SessionContext, Streamer, StreamerRegistry, TTSError, TTSResult, VendorAdapter, VendorSession,
};
pub use elevenlabs::{ElevenLabsConfig, ElevenLabsSession, ElevenLabsStreamer};

use crate::core::collaborators::VariableStore;
use crate::core::metrics::StreamingMetrics;

/// Builds the vendor registry.
///
/// # Supported Vendors
///
/// - `elevenlabs` - ElevenLabs `stream-input` WebSocket API
///
/// `aws` and `gcp` are recognized vendor names without an adapter; sessions
/// requesting them fail with [`TTSError::UnsupportedVendor`].
///
/// # Example
///
/// ```rust,ignore
/// use tts_manager::core::tts::{ElevenLabsConfig, create_streamer_registry};
///
/// let registry = create_streamer_registry(
///     ElevenLabsConfig::new("your-api-key"),
///     variables,
///     metrics,
/// );
/// let streamer = registry.get(VendorName::ElevenLabs)?;
/// ```
pub fn create_streamer_registry(
    elevenlabs: ElevenLabsConfig,
    variables: Arc<dyn VariableStore>,
    metrics: Arc<StreamingMetrics>,
) -> StreamerRegistry {
    StreamerRegistry::new().register(Arc::new(ElevenLabsStreamer::new(
        elevenlabs, variables, metrics,
    )))
}
