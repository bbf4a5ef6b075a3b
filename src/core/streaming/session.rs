use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::core::audiosocket::AudioSink;
use crate::core::collaborators::EventPublisher;
use crate::core::models::Streaming;
use crate::core::tts::{SessionContext, StreamerRegistry, TTSResult, VendorSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Registered, waiting for the PBX to connect
    Pending,
    /// PBX connection identified and bound
    Connected,
    /// Vendor adapter running
    Streaming,
    Closed,
}

/// Runtime state of one streaming session.
pub struct StreamingSession {
    streaming: RwLock<Streaming>,
    state: Mutex<SessionState>,

    pub cancel: CancellationToken,
    pub sink: Arc<AudioSink>,

    /// Initialized at most once; the async lock serializes concurrent initializers.
    vendor: tokio::sync::Mutex<Option<Arc<dyn VendorSession>>>,
    external_media_id: Mutex<Option<Uuid>>,
}

impl StreamingSession {
    pub fn new(streaming: Streaming, cancel: CancellationToken, frame_interval: Duration) -> Self {
        Self {
            streaming: RwLock::new(streaming),
            state: Mutex::new(SessionState::Pending),
            sink: Arc::new(AudioSink::new(frame_interval, cancel.clone())),
            cancel,
            vendor: tokio::sync::Mutex::new(None),
            external_media_id: Mutex::new(None),
        }
    }

    pub fn id(&self) -> Uuid {
        self.streaming.read().id
    }

    pub fn streaming(&self) -> Streaming {
        self.streaming.read().clone()
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Records the media channel opened for this session.
    pub fn set_external_media(&self, external_media_id: Uuid, activeflow_id: Option<Uuid>) {
        *self.external_media_id.lock() = Some(external_media_id);
        if activeflow_id.is_some() {
            self.streaming.write().activeflow_id = activeflow_id;
        }
    }

    pub fn take_external_media(&self) -> Option<Uuid> {
        self.external_media_id.lock().take()
    }

    /// Binds a PBX connection. Fails when one is already bound or the session closed.
    pub fn bind_connection(&self) -> bool {
        let mut state = self.state.lock();
        if *state != SessionState::Pending {
            return false;
        }
        *state = SessionState::Connected;
        true
    }

    pub fn mark_streaming(&self) {
        let mut state = self.state.lock();
        if *state == SessionState::Connected {
            *state = SessionState::Streaming;
        }
    }

    /// Transitions to closed. Returns true only for the first caller.
    pub fn close(&self) -> bool {
        let mut state = self.state.lock();
        if *state == SessionState::Closed {
            return false;
        }
        *state = SessionState::Closed;
        true
    }

    pub fn is_closed(&self) -> bool {
        self.state() == SessionState::Closed
    }

    /// Returns the vendor session, initializing it on first use.
    pub async fn ensure_vendor(
        &self,
        registry: &StreamerRegistry,
        events: Arc<dyn EventPublisher>,
    ) -> TTSResult<Arc<dyn VendorSession>> {
        let mut vendor = self.vendor.lock().await;
        if let Some(existing) = vendor.as_ref() {
            return Ok(existing.clone());
        }

        let streaming = self.streaming();
        let streamer = registry.get(streaming.vendor)?;
        let created = streamer
            .init(SessionContext {
                streaming,
                sink: self.sink.clone(),
                cancel: self.cancel.clone(),
                events,
            })
            .await?;

        *vendor = Some(created.clone());
        Ok(created)
    }

    pub async fn vendor(&self) -> Option<Arc<dyn VendorSession>> {
        self.vendor.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Direction, Gender, ReferenceType, VendorName};

    fn session() -> StreamingSession {
        StreamingSession::new(
            Streaming {
                id: Uuid::new_v4(),
                customer_id: Uuid::new_v4(),
                reference_type: ReferenceType::Call,
                reference_id: Uuid::new_v4(),
                language: "en-US".to_string(),
                gender: Gender::Neutral,
                vendor: VendorName::Aws,
                voice_id: String::new(),
                direction: Direction::Out,
                activeflow_id: None,
                pod_id: "pod-a".to_string(),
            },
            CancellationToken::new(),
            Duration::from_millis(20),
        )
    }

    #[test]
    fn test_state_transitions() {
        let session = session();
        assert_eq!(session.state(), SessionState::Pending);

        assert!(session.bind_connection());
        assert!(!session.bind_connection());
        session.mark_streaming();
        assert_eq!(session.state(), SessionState::Streaming);

        assert!(session.close());
        assert!(!session.close());
        assert!(!session.bind_connection());
    }

    #[test]
    fn test_external_media_sets_activeflow() {
        let session = session();
        let media_id = Uuid::new_v4();
        let activeflow_id = Uuid::new_v4();

        session.set_external_media(media_id, Some(activeflow_id));
        assert_eq!(session.streaming().activeflow_id, Some(activeflow_id));
        assert_eq!(session.take_external_media(), Some(media_id));
        assert_eq!(session.take_external_media(), None);
    }

    #[tokio::test]
    async fn test_unsupported_vendor_fails_init() {
        let session = session();
        let registry = StreamerRegistry::new();
        let events: Arc<dyn EventPublisher> =
            Arc::new(crate::core::collaborators::BroadcastEventPublisher::default());

        assert!(session.ensure_vendor(&registry, events).await.is_err());
        assert!(session.vendor().await.is_none());
    }
}
