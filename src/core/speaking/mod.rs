//! Speaking session lifecycle.
//!
//! [`SpeakingManager`] owns the durable speaking records and drives the
//! streaming transport through [`StreamingControl`](crate::core::streaming::StreamingControl).
//! At most one non-terminal speaking exists per `(customer, reference type,
//! reference id)`; concurrent creates for the same tuple are settled by
//! persisting first and re-checking afterwards, with the earliest created
//! record winning.
//!
//! # Example
//! ```rust,ignore
//! use tts_manager::core::speaking::SpeakingManager;
//!
//! let manager = SpeakingManager::new(repository, streaming, "pod-a");
//! let speaking = manager
//!     .create(customer_id, ReferenceType::Call, call_id, "en-US", "", "", Direction::Out)
//!     .await?;
//! manager.say(speaking.id, "Thank you for calling.").await?;
//! manager.finish(speaking.id).await?;
//! ```

mod manager;


use thiserror::Error;
use uuid::Uuid;

use crate::core::models::Status;
use crate::core::repository::RepositoryError;
use crate::core::streaming::StreamingError;
use crate::core::tts::TTSError;

pub use manager::{DEFAULT_PAGE_SIZE, MAX_TEXT_LENGTH, SpeakingManager};

pub type SpeakingResult<T> = Result<T, SpeakingError>;

/// Error categories reported to API callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Conflict,
    NotFound,
    InvalidInput,
    Protocol,
    Vendor,
    Persistence,
    Internal,
}

#[derive(Error, Debug)]
pub enum SpeakingError {
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Speaking not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Speaking {id} is {status}")]
    InvalidState { id: Uuid, status: Status },

    #[error(transparent)]
    Streaming(#[from] StreamingError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl SpeakingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Conflict(_) | Self::InvalidState { .. } => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Streaming(e) => match e {
                StreamingError::NotFound(_) => ErrorKind::NotFound,
                StreamingError::AlreadyExists(_) => ErrorKind::Conflict,
                StreamingError::InvalidVendor(_)
                | StreamingError::Vendor(TTSError::UnsupportedVendor(_)) => ErrorKind::InvalidInput,
                StreamingError::Vendor(_) => ErrorKind::Vendor,
                StreamingError::CallControl(_) | StreamingError::Protocol(_) => ErrorKind::Protocol,
                StreamingError::Repository(e) => repository_kind(e),
            },
            Self::Repository(e) => repository_kind(e),
        }
    }
}

fn repository_kind(e: &RepositoryError) -> ErrorKind {
    match e {
        RepositoryError::NotFound(_) => ErrorKind::NotFound,
        RepositoryError::AlreadyExists(_) => ErrorKind::Conflict,
        RepositoryError::InvalidPageToken(_) => ErrorKind::InvalidInput,
        RepositoryError::Backend(_) => ErrorKind::Persistence,
    }
}
