use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::session::StreamingSession;
use super::store::SessionStore;
use super::{StreamingControl, StreamingError, StreamingResult};
use crate::core::collaborators::{CallControl, Event, EventPublisher};
use crate::core::metrics::StreamingMetrics;
use crate::core::models::{
    Direction, Field, FieldValue, Fields, Gender, ReferenceType, Speaking, Status, Streaming,
    VendorName,
};
use crate::core::repository::{RepositoryError, SpeakingRepository};
use crate::core::tts::{StreamerRegistry, TTSError, VendorAdapter};

/// Transport settings derived from the server configuration.
#[derive(Debug, Clone)]
pub struct StreamingHandlerConfig {
    /// Address the PBX connects to, as handed to call-control
    pub advertise_address: String,
    /// Identity of this process instance
    pub pod_id: String,
    /// How long a new connection may take to send its identify frame
    pub identify_timeout: Duration,
    /// Interval between outbound audio frames
    pub frame_interval: Duration,
}

impl Default for StreamingHandlerConfig {
    fn default() -> Self {
        Self {
            advertise_address: "127.0.0.1:9000".to_string(),
            pod_id: "local".to_string(),
            identify_timeout: Duration::from_secs(10),
            frame_interval: Duration::from_millis(20),
        }
    }
}

/// Owns the runtime sessions of this process and the PBX listener.
pub struct StreamingHandler {
    pub(super) config: StreamingHandlerConfig,
    pub(super) store: SessionStore,
    pub(super) registry: StreamerRegistry,
    pub(super) repository: Arc<dyn SpeakingRepository>,
    pub(super) call_control: Arc<dyn CallControl>,
    pub(super) events: Arc<dyn EventPublisher>,
    pub(super) metrics: Arc<StreamingMetrics>,

    /// Parent of every session token; cancelled on shutdown
    shutdown: CancellationToken,
}

impl StreamingHandler {
    pub fn new(
        config: StreamingHandlerConfig,
        registry: StreamerRegistry,
        repository: Arc<dyn SpeakingRepository>,
        call_control: Arc<dyn CallControl>,
        events: Arc<dyn EventPublisher>,
        metrics: Arc<StreamingMetrics>,
    ) -> Self {
        Self {
            config,
            store: SessionStore::new(),
            registry,
            repository,
            call_control,
            events,
            metrics,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &StreamingHandlerConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<StreamingMetrics> {
        &self.metrics
    }

    pub fn session(&self, id: Uuid) -> Option<Arc<StreamingSession>> {
        self.store.get(id)
    }

    pub fn session_count(&self) -> usize {
        self.store.len()
    }

    /// Cancels every runtime session and stops the listener.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Accepts PBX connections until [`StreamingHandler::shutdown`] is called,
    /// then waits for the open connections to wind down.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> std::io::Result<()> {
        info!("Streaming listener on {}", listener.local_addr()?);

        let tracker = TaskTracker::new();
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "Accepted media connection");
                        let handler = self.clone();
                        tracker.spawn(async move { handler.handle_connection(stream, peer).await });
                    }
                    Err(e) => {
                        error!("Failed to accept media connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },
            }
        }

        tracker.close();
        tracker.wait().await;
        info!("Streaming listener stopped");
        Ok(())
    }

    fn new_session(&self, streaming: Streaming) -> Arc<StreamingSession> {
        Arc::new(StreamingSession::new(
            streaming,
            self.shutdown.child_token(),
            self.config.frame_interval,
        ))
    }

    /// Looks a session up in the runtime store, falling back to a repository
    /// record owned by this process that is still live.
    pub(super) async fn resolve(&self, id: Uuid) -> StreamingResult<Arc<StreamingSession>> {
        if let Some(session) = self.store.get(id) {
            return Ok(session);
        }

        let speaking = self.repository.get(id).await.map_err(|e| match e {
            RepositoryError::NotFound(_) => StreamingError::NotFound(id),
            other => other.into(),
        })?;
        if speaking.is_deleted()
            || speaking.status.is_terminal()
            || speaking.pod_id != self.config.pod_id
        {
            return Err(StreamingError::NotFound(id));
        }

        let session = self.new_session(streaming_from_record(&speaking)?);
        let resolved = self.store.get_or_insert(session.clone());
        if Arc::ptr_eq(&resolved, &session) {
            info!(streaming_id = %id, "Registered streaming session from repository record");
            self.metrics.record_session_started();
        }
        Ok(resolved)
    }

    fn session_or_not_found(&self, id: Uuid) -> StreamingResult<Arc<StreamingSession>> {
        self.store.get(id).ok_or(StreamingError::NotFound(id))
    }

    /// Releases a session. Only the first call for a session does any work.
    pub(super) async fn finalize(&self, session: &Arc<StreamingSession>) {
        if !session.close() {
            return;
        }
        session.cancel.cancel();

        let id = session.id();
        self.store.remove(session);

        if let Some(vendor) = session.vendor().await {
            vendor.say_stop();
        }

        if let Some(external_media_id) = session.take_external_media()
            && let Err(e) = self.call_control.stop_external_media(external_media_id).await
        {
            warn!(streaming_id = %id, "Failed to stop external media {}: {}", external_media_id, e);
        }

        let fields = Fields::from([(Field::Status, FieldValue::Status(Status::Stopped))]);
        if let Err(e) = self.repository.update(id, &fields).await {
            debug!(streaming_id = %id, "Could not mark speaking stopped: {}", e);
        }

        self.metrics.record_session_finished();
        self.events
            .publish(Event::StreamingFinished(session.streaming()));
        info!(streaming_id = %id, "Streaming session closed");
    }
}

fn streaming_from_record(speaking: &Speaking) -> StreamingResult<Streaming> {
    let vendor: VendorName = speaking
        .provider
        .parse()
        .map_err(|_| StreamingError::InvalidVendor(speaking.provider.clone()))?;

    Ok(Streaming {
        id: speaking.id,
        customer_id: speaking.customer_id,
        reference_type: speaking.reference_type,
        reference_id: speaking.reference_id,
        language: speaking.language.clone(),
        gender: Gender::Neutral,
        vendor,
        voice_id: speaking.voice_id.clone(),
        direction: speaking.direction,
        activeflow_id: None,
        pod_id: speaking.pod_id.clone(),
    })
}

#[async_trait]
impl StreamingControl for StreamingHandler {
    async fn start_with_id(
        &self,
        id: Uuid,
        customer_id: Uuid,
        reference_type: ReferenceType,
        reference_id: Uuid,
        language: &str,
        provider: &str,
        voice_id: &str,
        direction: Direction,
    ) -> StreamingResult<Streaming> {
        let vendor: VendorName = provider
            .parse()
            .map_err(|_| StreamingError::InvalidVendor(provider.to_string()))?;
        if let VendorAdapter::Unsupported(vendor) = self.registry.resolve(vendor) {
            return Err(TTSError::UnsupportedVendor(vendor).into());
        }

        let streaming = Streaming {
            id,
            customer_id,
            reference_type,
            reference_id,
            language: language.to_string(),
            gender: Gender::Neutral,
            vendor,
            voice_id: voice_id.to_string(),
            direction,
            activeflow_id: None,
            pod_id: self.config.pod_id.clone(),
        };

        // Registered before call-control is asked so an early PBX connection resolves.
        let session = self.new_session(streaming);
        if !self.store.insert(session.clone()) {
            return Err(StreamingError::AlreadyExists(id));
        }
        self.metrics.record_session_started();

        let media = match self
            .call_control
            .start_external_media(
                id,
                reference_type,
                reference_id,
                &self.config.advertise_address,
                direction,
            )
            .await
        {
            Ok(media) => media,
            Err(e) => {
                warn!(streaming_id = %id, "Failed to start external media: {}", e);
                session.close();
                session.cancel.cancel();
                self.store.remove(&session);
                self.metrics.record_session_finished();
                return Err(e.into());
            }
        };
        session.set_external_media(media.id, media.activeflow_id);

        let streaming = session.streaming();
        info!(
            streaming_id = %id,
            external_media_id = %media.id,
            "Started streaming session for {} {}",
            reference_type,
            reference_id
        );
        self.events
            .publish(Event::StreamingCreated(streaming.clone()));
        Ok(streaming)
    }

    async fn say_init(&self, id: Uuid) -> StreamingResult<()> {
        let session = self.resolve(id).await?;
        session
            .ensure_vendor(&self.registry, self.events.clone())
            .await?;
        Ok(())
    }

    async fn say_add(&self, id: Uuid, text: &str) -> StreamingResult<()> {
        let session = self.resolve(id).await?;
        let vendor = session
            .ensure_vendor(&self.registry, self.events.clone())
            .await?;
        vendor.say_add(text).await?;
        Ok(())
    }

    async fn say_flush(&self, id: Uuid) -> StreamingResult<()> {
        let session = self.session_or_not_found(id)?;
        if let Some(vendor) = session.vendor().await {
            vendor.say_flush().await?;
        }
        session.sink.discard();
        Ok(())
    }

    async fn say_finish(&self, id: Uuid) -> StreamingResult<()> {
        let session = self.resolve(id).await?;
        let vendor = session
            .ensure_vendor(&self.registry, self.events.clone())
            .await?;
        vendor.say_finish().await?;
        Ok(())
    }

    async fn stop(&self, id: Uuid) -> StreamingResult<Streaming> {
        let session = self.session_or_not_found(id)?;
        self.finalize(&session).await;
        Ok(session.streaming())
    }
}
