pub mod audiosocket;
pub mod collaborators;
pub mod metrics;
pub mod models;
pub mod repository;
pub mod speaking;
pub mod streaming;
pub mod tts;

// Re-export commonly used types for convenience
pub use audiosocket::{AudioSink, AudioSocketError, Frame, FrameKind};

pub use collaborators::{CallControl, Event, EventPublisher, VariableStore};

pub use models::{Direction, Message, ReferenceType, Speaking, Status, Streaming, VendorName};

pub use repository::{MemorySpeakingRepository, RepositoryError, SpeakingRepository};

pub use speaking::{ErrorKind, SpeakingError, SpeakingManager, SpeakingResult};

pub use streaming::{StreamingControl, StreamingError, StreamingHandler, StreamingResult};

pub use tts::{StreamerRegistry, TTSError, TTSResult, create_streamer_registry};
