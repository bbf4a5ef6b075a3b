use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use super::{RepositoryError, RepositoryResult, SpeakingRepository};
use crate::core::models::{Fields, Speaking};

/// Formats a creation timestamp as a page token.
pub fn page_token(tm: &DateTime<Utc>) -> String {
    tm.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// An empty token places no upper bound on the page.
fn parse_page_token(token: &str) -> RepositoryResult<Option<DateTime<Utc>>> {
    if token.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(token)
        .map(|tm| Some(tm.with_timezone(&Utc)))
        .map_err(|_| RepositoryError::InvalidPageToken(token.to_string()))
}

/// Process-local repository.
///
/// Creation timestamps are microsecond precision and strictly increasing, so
/// creation order is a total order over every record this repository holds.
#[derive(Default)]
pub struct MemorySpeakingRepository {
    records: DashMap<Uuid, Speaking>,
    last_create_micros: Mutex<i64>,
}

impl MemorySpeakingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_create_time(last: &mut i64) -> RepositoryResult<DateTime<Utc>> {
        let now = Utc::now().timestamp_micros();
        let micros = if now <= *last { *last + 1 } else { now };
        *last = micros;

        DateTime::<Utc>::from_timestamp_micros(micros)
            .ok_or_else(|| RepositoryError::Backend(format!("timestamp out of range: {micros}")))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl SpeakingRepository for MemorySpeakingRepository {
    async fn get(&self, id: Uuid) -> RepositoryResult<Speaking> {
        self.records
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn gets(
        &self,
        page_token: &str,
        page_size: u64,
        filters: &Fields,
    ) -> RepositoryResult<Vec<Speaking>> {
        let before = parse_page_token(page_token)?;

        let mut items: Vec<Speaking> = self
            .records
            .iter()
            .filter(|entry| {
                let speaking = entry.value();
                let in_page = match (speaking.tm_create, before) {
                    (Some(tm), Some(before)) => tm < before,
                    (Some(_), None) => true,
                    (None, _) => false,
                };
                in_page && speaking.matches(filters)
            })
            .map(|entry| entry.value().clone())
            .collect();

        items.sort_by(|a, b| b.tm_create.cmp(&a.tm_create));
        items.truncate(page_size as usize);
        Ok(items)
    }

    async fn create(&self, speaking: &Speaking) -> RepositoryResult<()> {
        // Held until the record is visible, so creation order matches visibility order.
        let mut last = self.last_create_micros.lock();

        match self.records.entry(speaking.id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(RepositoryError::AlreadyExists(speaking.id)),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let mut record = speaking.clone();
                record.tm_create = Some(Self::next_create_time(&mut last)?);
                record.tm_update = None;
                record.tm_delete = None;
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn update(&self, id: Uuid, fields: &Fields) -> RepositoryResult<()> {
        let mut entry = self.records.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;
        entry.apply(fields);
        entry.tm_update = Some(Utc::now());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        let mut entry = self.records.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;
        let now = Utc::now();
        entry.tm_update = Some(now);
        entry.tm_delete = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Direction, Field, FieldValue, ReferenceType, Status};

    fn speaking(customer_id: Uuid, reference_id: Uuid) -> Speaking {
        Speaking {
            id: Uuid::new_v4(),
            customer_id,
            reference_type: ReferenceType::Call,
            reference_id,
            language: "en-US".to_string(),
            provider: "elevenlabs".to_string(),
            voice_id: String::new(),
            direction: Direction::Out,
            status: Status::Initiating,
            pod_id: "pod-a".to_string(),
            tm_create: None,
            tm_update: None,
            tm_delete: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = MemorySpeakingRepository::new();
        let record = speaking(Uuid::new_v4(), Uuid::new_v4());

        repo.create(&record).await.unwrap();
        let stored = repo.get(record.id).await.unwrap();
        assert!(stored.tm_create.is_some());
        assert_eq!(stored.status, Status::Initiating);

        assert!(matches!(
            repo.create(&record).await,
            Err(RepositoryError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let repo = MemorySpeakingRepository::new();
        assert!(matches!(
            repo.get(Uuid::new_v4()).await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_creation_times_strictly_increase() {
        let repo = MemorySpeakingRepository::new();
        let mut ids = Vec::new();
        for _ in 0..50 {
            let record = speaking(Uuid::new_v4(), Uuid::new_v4());
            repo.create(&record).await.unwrap();
            ids.push(record.id);
        }

        let mut previous = None;
        for id in ids {
            let tm = repo.get(id).await.unwrap().tm_create;
            assert!(tm > previous);
            previous = tm;
        }
    }

    #[tokio::test]
    async fn test_gets_filters_and_pages() {
        let repo = MemorySpeakingRepository::new();
        let customer_id = Uuid::new_v4();
        for _ in 0..5 {
            repo.create(&speaking(customer_id, Uuid::new_v4())).await.unwrap();
        }
        repo.create(&speaking(Uuid::new_v4(), Uuid::new_v4())).await.unwrap();

        let filters = Fields::from([
            (Field::CustomerId, FieldValue::Uuid(customer_id)),
            (Field::Deleted, FieldValue::Bool(false)),
        ]);

        let first = repo.gets("", 3, &filters).await.unwrap();
        assert_eq!(first.len(), 3);
        assert!(first[0].tm_create > first[1].tm_create);

        let token = page_token(first[2].tm_create.as_ref().unwrap());
        let second = repo.gets(&token, 3, &filters).await.unwrap();
        assert_eq!(second.len(), 2);
        assert!(second.iter().all(|s| s.tm_create < first[2].tm_create));
    }

    #[tokio::test]
    async fn test_gets_invalid_token() {
        let repo = MemorySpeakingRepository::new();
        assert!(matches!(
            repo.gets("yesterday", 10, &Fields::new()).await,
            Err(RepositoryError::InvalidPageToken(_))
        ));
    }

    #[tokio::test]
    async fn test_update_and_soft_delete() {
        let repo = MemorySpeakingRepository::new();
        let record = speaking(Uuid::new_v4(), Uuid::new_v4());
        repo.create(&record).await.unwrap();

        repo.update(
            record.id,
            &Fields::from([(Field::Status, FieldValue::Status(Status::Active))]),
        )
        .await
        .unwrap();
        let stored = repo.get(record.id).await.unwrap();
        assert_eq!(stored.status, Status::Active);
        assert!(stored.tm_update.is_some());

        repo.delete(record.id).await.unwrap();
        let stored = repo.get(record.id).await.unwrap();
        assert!(stored.is_deleted());
        assert_eq!(stored.status, Status::Active);

        let visible = repo
            .gets("", 10, &Fields::from([(Field::Deleted, FieldValue::Bool(false))]))
            .await
            .unwrap();
        assert!(visible.is_empty());
    }
}
