use std::sync::Arc;

use tracing::info;

use crate::config::ServerConfig;
use crate::core::collaborators::{
    BroadcastEventPublisher, CallControl, CollaboratorResult, EventPublisher, HttpCallControl,
    HttpVariableStore, NoopCallControl, NoopVariableStore, VariableStore,
};
use crate::core::metrics::StreamingMetrics;
use crate::core::repository::{MemorySpeakingRepository, SpeakingRepository};
use crate::core::speaking::SpeakingManager;
use crate::core::streaming::StreamingHandler;
use crate::core::tts::create_streamer_registry;

/// Shared application state
pub struct AppState {
    pub config: ServerConfig,
    pub speakings: SpeakingManager,
    pub streaming: Arc<StreamingHandler>,
    pub events: Arc<BroadcastEventPublisher>,
}

impl AppState {
    /// Wires the collaborators, the streaming transport and the speaking manager.
    ///
    /// Call-control and flow variables use their HTTP adapters when a URL is
    /// configured and no-op adapters otherwise.
    pub fn new(config: ServerConfig) -> CollaboratorResult<Arc<Self>> {
        let call_control: Arc<dyn CallControl> = match &config.call_manager_url {
            Some(url) => Arc::new(HttpCallControl::new(url.clone())?),
            None => {
                info!("CALL_MANAGER_URL not set, media channels will not be requested");
                Arc::new(NoopCallControl)
            }
        };
        let variables: Arc<dyn VariableStore> = match &config.flow_manager_url {
            Some(url) => Arc::new(HttpVariableStore::new(url.clone())?),
            None => Arc::new(NoopVariableStore),
        };

        let repository: Arc<dyn SpeakingRepository> = Arc::new(MemorySpeakingRepository::new());
        Ok(Self::with_collaborators(
            config,
            repository,
            call_control,
            variables,
        ))
    }

    pub fn with_collaborators(
        config: ServerConfig,
        repository: Arc<dyn SpeakingRepository>,
        call_control: Arc<dyn CallControl>,
        variables: Arc<dyn VariableStore>,
    ) -> Arc<Self> {
        let metrics = Arc::new(StreamingMetrics::new());
        let events = Arc::new(BroadcastEventPublisher::default());
        let publisher: Arc<dyn EventPublisher> = events.clone();

        let registry =
            create_streamer_registry(config.elevenlabs_config(), variables, metrics.clone());
        let streaming = Arc::new(StreamingHandler::new(
            config.streaming_handler_config(),
            registry,
            repository.clone(),
            call_control,
            publisher,
            metrics,
        ));
        let speakings = SpeakingManager::new(repository, streaming.clone(), config.pod_id.clone());

        Arc::new(Self {
            config,
            speakings,
            streaming,
            events,
        })
    }
}
