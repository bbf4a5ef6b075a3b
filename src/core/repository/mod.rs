//! Persistence interface for speaking records.

mod memory;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::core::models::{Fields, Speaking};

pub use memory::{MemorySpeakingRepository, page_token};

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Speaking not found: {0}")]
    NotFound(Uuid),

    #[error("Speaking already exists: {0}")]
    AlreadyExists(Uuid),

    #[error("Invalid page token: {0}")]
    InvalidPageToken(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Durable store of speaking records.
///
/// `gets` pages by creation timestamp: the page token is an RFC 3339 timestamp
/// and only records created strictly before it are returned, newest first. An
/// empty token starts from the newest record. The repository assigns
/// `tm_create` on create and `tm_update` on every change; `delete` is a soft
/// delete that sets `tm_delete` and leaves the status alone.
#[async_trait]
pub trait SpeakingRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> RepositoryResult<Speaking>;

    async fn gets(
        &self,
        page_token: &str,
        page_size: u64,
        filters: &Fields,
    ) -> RepositoryResult<Vec<Speaking>>;

    async fn create(&self, speaking: &Speaking) -> RepositoryResult<()>;

    async fn update(&self, id: Uuid, fields: &Fields) -> RepositoryResult<()>;

    async fn delete(&self, id: Uuid) -> RepositoryResult<()>;
}
