use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{SpeakingError, SpeakingResult};
use crate::core::models::{
    DEFAULT_PROVIDER, Direction, Field, FieldValue, Fields, ReferenceType, Speaking, Status,
};
use crate::core::repository::{RepositoryError, SpeakingRepository};
use crate::core::streaming::{StreamingControl, StreamingError};

/// Longest text accepted by a single say, in characters.
pub const MAX_TEXT_LENGTH: usize = 5000;

pub const DEFAULT_PAGE_SIZE: u64 = 100;

pub struct SpeakingManager {
    repository: Arc<dyn SpeakingRepository>,
    streaming: Arc<dyn StreamingControl>,
    pod_id: String,
}

impl SpeakingManager {
    pub fn new(
        repository: Arc<dyn SpeakingRepository>,
        streaming: Arc<dyn StreamingControl>,
        pod_id: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            streaming,
            pod_id: pod_id.into(),
        }
    }

    pub fn pod_id(&self) -> &str {
        &self.pod_id
    }

    /// Creates a speaking and starts its transport session.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        customer_id: Uuid,
        reference_type: ReferenceType,
        reference_id: Uuid,
        language: &str,
        provider: &str,
        voice_id: &str,
        direction: Direction,
    ) -> SpeakingResult<Speaking> {
        if !self
            .live_records(customer_id, reference_type, reference_id)
            .await?
            .is_empty()
        {
            return Err(SpeakingError::Conflict(format!(
                "speaking already exists for {reference_type} {reference_id}"
            )));
        }

        let provider = if provider.is_empty() {
            DEFAULT_PROVIDER
        } else {
            provider
        };

        let id = Uuid::new_v4();
        let record = Speaking {
            id,
            customer_id,
            reference_type,
            reference_id,
            language: language.to_string(),
            provider: provider.to_string(),
            voice_id: voice_id.to_string(),
            direction,
            status: Status::Initiating,
            pod_id: self.pod_id.clone(),
            tm_create: None,
            tm_update: None,
            tm_delete: None,
        };
        self.repository.create(&record).await?;
        let created = self.repository.get(id).await?;

        // Another create for the same tuple may have passed the pre-check too.
        let competitors = self
            .live_records(customer_id, reference_type, reference_id)
            .await?;
        if let Some(winner) = competitors
            .iter()
            .find(|other| other.id != id && precedes(other, &created))
        {
            warn!(
                speaking_id = %id,
                winner_id = %winner.id,
                "Lost concurrent create for {} {}",
                reference_type,
                reference_id
            );
            self.mark_stopped(id).await;
            return Err(SpeakingError::Conflict(format!(
                "concurrent session for {reference_type} {reference_id}"
            )));
        }

        if let Err(e) = self
            .streaming
            .start_with_id(
                id,
                customer_id,
                reference_type,
                reference_id,
                language,
                provider,
                voice_id,
                direction,
            )
            .await
        {
            error!(speaking_id = %id, "Failed to start streaming: {}", e);
            self.mark_stopped(id).await;
            return Err(e.into());
        }

        self.set_status(id, Status::Active).await?;
        let speaking = self.repository.get(id).await?;
        info!(speaking_id = %id, provider = %provider, "Created speaking");
        Ok(speaking)
    }

    pub async fn get(&self, id: Uuid) -> SpeakingResult<Speaking> {
        self.repository.get(id).await.map_err(|e| match e {
            RepositoryError::NotFound(id) => SpeakingError::NotFound(id),
            other => other.into(),
        })
    }

    pub async fn gets(
        &self,
        page_token: &str,
        page_size: u64,
        filters: &Fields,
    ) -> SpeakingResult<Vec<Speaking>> {
        let page_size = if page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size
        };
        Ok(self.repository.gets(page_token, page_size, filters).await?)
    }

    /// Queues text for synthesis on an active speaking.
    pub async fn say(&self, id: Uuid, text: &str) -> SpeakingResult<Speaking> {
        if text.is_empty() {
            return Err(SpeakingError::InvalidInput("text is empty".to_string()));
        }
        let length = text.chars().count();
        if length > MAX_TEXT_LENGTH {
            return Err(SpeakingError::InvalidInput(format!(
                "text is {length} characters, the limit is {MAX_TEXT_LENGTH}"
            )));
        }

        self.active(id).await?;
        self.streaming.say_init(id).await?;
        self.streaming.say_add(id, text).await?;
        debug!(speaking_id = %id, "Queued {} characters", length);
        self.get(id).await
    }

    /// Drops queued text and audio; the speaking stays active.
    pub async fn flush(&self, id: Uuid) -> SpeakingResult<Speaking> {
        self.active(id).await?;
        self.streaming.say_flush(id).await?;
        self.get(id).await
    }

    /// Lets the speaking end by itself once every queued message has played.
    pub async fn finish(&self, id: Uuid) -> SpeakingResult<Speaking> {
        self.active(id).await?;
        self.streaming.say_finish(id).await?;
        self.get(id).await
    }

    pub async fn stop(&self, id: Uuid) -> SpeakingResult<Speaking> {
        let speaking = self.get(id).await?;
        if speaking.status == Status::Stopped {
            return Ok(speaking);
        }

        match self.streaming.stop(id).await {
            Ok(_) => {}
            Err(StreamingError::NotFound(_)) => {
                debug!(speaking_id = %id, "No streaming session to stop");
            }
            Err(e) => warn!(speaking_id = %id, "Failed to stop streaming: {}", e),
        }

        self.set_status(id, Status::Stopped).await?;
        info!(speaking_id = %id, "Stopped speaking");
        self.get(id).await
    }

    /// Soft-deletes the record. A live transport session is left running;
    /// callers stop the speaking first.
    pub async fn delete(&self, id: Uuid) -> SpeakingResult<Speaking> {
        self.get(id).await?;
        self.repository.delete(id).await?;
        info!(speaking_id = %id, "Deleted speaking");
        self.get(id).await
    }

    /// Non-terminal, non-deleted records for the reference tuple.
    async fn live_records(
        &self,
        customer_id: Uuid,
        reference_type: ReferenceType,
        reference_id: Uuid,
    ) -> SpeakingResult<Vec<Speaking>> {
        let filters = Fields::from([
            (Field::CustomerId, FieldValue::Uuid(customer_id)),
            (Field::ReferenceType, FieldValue::ReferenceType(reference_type)),
            (Field::ReferenceId, FieldValue::Uuid(reference_id)),
            (Field::Deleted, FieldValue::Bool(false)),
        ]);

        let records = self
            .repository
            .gets("", DEFAULT_PAGE_SIZE, &filters)
            .await?;
        Ok(records
            .into_iter()
            .filter(|speaking| !speaking.status.is_terminal())
            .collect())
    }

    async fn active(&self, id: Uuid) -> SpeakingResult<Speaking> {
        let speaking = self.get(id).await?;
        if speaking.status != Status::Active {
            return Err(SpeakingError::InvalidState {
                id,
                status: speaking.status,
            });
        }
        Ok(speaking)
    }

    async fn set_status(&self, id: Uuid, status: Status) -> SpeakingResult<()> {
        let fields = Fields::from([(Field::Status, FieldValue::Status(status))]);
        self.repository.update(id, &fields).await?;
        Ok(())
    }

    async fn mark_stopped(&self, id: Uuid) {
        if let Err(e) = self.set_status(id, Status::Stopped).await {
            warn!(speaking_id = %id, "Failed to mark speaking stopped: {}", e);
        }
    }
}

/// Creation order decides; the smaller id breaks ties.
fn precedes(a: &Speaking, b: &Speaking) -> bool {
    (a.tm_create, a.id) < (b.tm_create, b.id)
}
