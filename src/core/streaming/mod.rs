//! Streaming transport.
//!
//! Terminates the PBX media connections, binds each one to a runtime streaming
//! session and drives the session's vendor adapter.
//!
//! A runtime session moves through `pending → connected → streaming → closed`:
//! it is registered when a session is started (or resolved from the repository),
//! becomes connected when the PBX identifies itself, streams while the vendor
//! adapter runs and is closed exactly once, whichever of hangup, explicit stop,
//! vendor failure or finish comes first.
//!
//! # Example
//! ```rust,ignore
//! use tts_manager::core::streaming::{StreamingControl, StreamingHandler};
//!
//! let handler = Arc::new(StreamingHandler::new(config, registry, repository, call_control, events, metrics));
//! tokio::spawn(handler.clone().serve(listener));
//!
//! let streaming = handler
//!     .start_with_id(id, customer_id, ReferenceType::Call, call_id, "en-US", "elevenlabs", "", Direction::Out)
//!     .await?;
//! handler.say_init(streaming.id).await?;
//! handler.say_add(streaming.id, "Hello").await?;
//! ```

mod connection;
mod handler;
mod session;
mod store;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::core::audiosocket::AudioSocketError;
use crate::core::collaborators::CollaboratorError;
use crate::core::models::{Direction, ReferenceType, Streaming};
use crate::core::repository::RepositoryError;
use crate::core::tts::TTSError;

pub use handler::{StreamingHandler, StreamingHandlerConfig};
pub use session::{SessionState, StreamingSession};
pub use store::SessionStore;

/// Result type for streaming transport operations
pub type StreamingResult<T> = Result<T, StreamingError>;

#[derive(Error, Debug)]
pub enum StreamingError {
    #[error("Streaming session not found: {0}")]
    NotFound(Uuid),

    #[error("Streaming session already exists: {0}")]
    AlreadyExists(Uuid),

    #[error("Invalid vendor: {0}")]
    InvalidVendor(String),

    #[error("Vendor error: {0}")]
    Vendor(#[from] TTSError),

    #[error("Call control error: {0}")]
    CallControl(#[from] CollaboratorError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] AudioSocketError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Transport operations used by the speaking manager.
#[async_trait]
pub trait StreamingControl: Send + Sync {
    /// Registers a runtime session with a caller-chosen id and asks call-control
    /// to point the PBX media channel at this process.
    #[allow(clippy::too_many_arguments)]
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
    ) -> StreamingResult<Streaming>;

    /// Initializes the vendor session if it is not initialized yet.
    async fn say_init(&self, id: Uuid) -> StreamingResult<()>;

    async fn say_add(&self, id: Uuid, text: &str) -> StreamingResult<()>;

    async fn say_flush(&self, id: Uuid) -> StreamingResult<()>;

    async fn say_finish(&self, id: Uuid) -> StreamingResult<()>;

    async fn stop(&self, id: Uuid) -> StreamingResult<Streaming>;
}
