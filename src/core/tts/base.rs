use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::core::audiosocket::{AudioSink, AudioSocketError};
use crate::core::collaborators::EventPublisher;
use crate::core::models::{Message, Streaming, VendorName};

/// Result type for vendor adapter operations
pub type TTSResult<T> = Result<T, TTSError>;

#[derive(Debug, Error)]
pub enum TTSError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Audio processing error: {0}")]
    AudioProcessing(#[from] AudioSocketError),

    #[error("Vendor not supported: {0}")]
    UnsupportedVendor(VendorName),

    #[error("Vendor session is closed")]
    SessionClosed,
}

/// Everything a vendor adapter needs to open a session.
pub struct SessionContext {
    pub streaming: Streaming,
    /// Paced audio path towards the PBX
    pub sink: Arc<AudioSink>,
    /// Session scope; adapters derive child tokens from it
    pub cancel: CancellationToken,
    pub events: Arc<dyn EventPublisher>,
}

/// Opens vendor sessions for one TTS vendor.
#[async_trait]
pub trait Streamer: Send + Sync {
    fn vendor(&self) -> VendorName;

    /// Selects the voice and connects to the vendor.
    async fn init(&self, ctx: SessionContext) -> TTSResult<Arc<dyn VendorSession>>;
}

/// One live synthesis session with a vendor.
#[async_trait]
pub trait VendorSession: Send + Sync {
    /// Pumps vendor audio to the sink until the session's cancellation fires.
    async fn run(&self) -> TTSResult<()>;

    /// Queues text for synthesis.
    async fn say_add(&self, text: &str) -> TTSResult<()>;

    /// Discards queued text and audio that has not been played yet.
    async fn say_flush(&self) -> TTSResult<()>;

    /// Terminates the session.
    fn say_stop(&self);

    /// Marks the end of input; the session ends itself once everything queued was played.
    async fn say_finish(&self) -> TTSResult<()>;

    /// Snapshot of the current synthesis progress.
    fn message(&self) -> Message;
}

/// Result of resolving a vendor name.
pub enum VendorAdapter {
    Supported(Arc<dyn Streamer>),
    Unsupported(VendorName),
}

/// Registered vendor adapters.
///
/// Vendors without a registered adapter resolve to [`VendorAdapter::Unsupported`],
/// which callers surface as [`TTSError::UnsupportedVendor`].
#[derive(Default)]
pub struct StreamerRegistry {
    streamers: HashMap<VendorName, Arc<dyn Streamer>>,
}

impl StreamerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, streamer: Arc<dyn Streamer>) -> Self {
        self.streamers.insert(streamer.vendor(), streamer);
        self
    }

    pub fn resolve(&self, vendor: VendorName) -> VendorAdapter {
        match self.streamers.get(&vendor) {
            Some(streamer) => VendorAdapter::Supported(streamer.clone()),
            None => VendorAdapter::Unsupported(vendor),
        }
    }

    pub fn get(&self, vendor: VendorName) -> TTSResult<Arc<dyn Streamer>> {
        match self.resolve(vendor) {
            VendorAdapter::Supported(streamer) => Ok(streamer),
            VendorAdapter::Unsupported(vendor) => Err(TTSError::UnsupportedVendor(vendor)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullStreamer;

    #[async_trait]
    impl Streamer for NullStreamer {
        fn vendor(&self) -> VendorName {
            VendorName::ElevenLabs
        }

        async fn init(&self, _ctx: SessionContext) -> TTSResult<Arc<dyn VendorSession>> {
            Err(TTSError::SessionClosed)
        }
    }

    #[test]
    fn test_registry_resolves_registered_vendor() {
        let registry = StreamerRegistry::new().register(Arc::new(NullStreamer));
        assert!(matches!(
            registry.resolve(VendorName::ElevenLabs),
            VendorAdapter::Supported(_)
        ));
        assert!(registry.get(VendorName::ElevenLabs).is_ok());
    }

    #[test]
    fn test_registry_unsupported_vendors() {
        let registry = StreamerRegistry::new().register(Arc::new(NullStreamer));
        for vendor in [VendorName::Aws, VendorName::Gcp] {
            assert!(matches!(
                registry.resolve(vendor),
                VendorAdapter::Unsupported(v) if v == vendor
            ));
            assert!(matches!(
                registry.get(vendor),
                Err(TTSError::UnsupportedVendor(_))
            ));
        }
    }
}
