//! Interfaces to the services this manager depends on but does not own.
//!
//! - [`CallControl`] opens and closes the PBX media channel that connects back to
//!   the streaming listener.
//! - [`VariableStore`] exposes per-call flow variables (used for voice overrides).
//! - [`EventPublisher`] announces session lifecycle events.
//!
//! Each interface has an HTTP (or broadcast) implementation for production and a
//! no-op implementation used when the collaborator is not configured.

pub mod call_control;
pub mod events;
pub mod variables;

use thiserror::Error;

pub use call_control::{CallControl, ExternalMedia, HttpCallControl, NoopCallControl};
pub use events::{BroadcastEventPublisher, Event, EventPublisher};
pub use variables::{HttpVariableStore, NoopVariableStore, VariableStore};

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unexpected response status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// Turns a non-success response into [`CollaboratorError::Status`].
pub(crate) async fn check_status(response: reqwest::Response) -> CollaboratorResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(CollaboratorError::Status {
        status: status.as_u16(),
        body,
    })
}
