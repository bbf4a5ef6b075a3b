//! Speaking lifecycle endpoints under `/v1/speakings`.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::core::models::{Direction, Field, FieldValue, Fields, ReferenceType, Speaking, Status};
use crate::core::repository::page_token;
use crate::core::speaking::DEFAULT_PAGE_SIZE;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Largest page a single list request may ask for
const MAX_PAGE_SIZE: u64 = 1000;

#[derive(Debug, Deserialize)]
pub struct CreateSpeakingRequest {
    pub customer_id: Uuid,
    pub reference_type: ReferenceType,
    pub reference_id: Uuid,
    #[serde(default)]
    pub language: String,
    /// Vendor name; empty selects the default vendor
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub voice_id: String,
    #[serde(default)]
    pub direction: Direction,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListSpeakingsQuery {
    pub page_token: Option<String>,
    pub page_size: Option<u64>,
    pub customer_id: Option<Uuid>,
    pub reference_type: Option<ReferenceType>,
    pub reference_id: Option<Uuid>,
    pub status: Option<Status>,
    pub deleted: Option<bool>,
}

impl ListSpeakingsQuery {
    fn filters(&self) -> Fields {
        let mut filters = Fields::new();
        if let Some(customer_id) = self.customer_id {
            filters.insert(Field::CustomerId, FieldValue::Uuid(customer_id));
        }
        if let Some(reference_type) = self.reference_type {
            filters.insert(Field::ReferenceType, FieldValue::ReferenceType(reference_type));
        }
        if let Some(reference_id) = self.reference_id {
            filters.insert(Field::ReferenceId, FieldValue::Uuid(reference_id));
        }
        if let Some(status) = self.status {
            filters.insert(Field::Status, FieldValue::Status(status));
        }
        filters.insert(Field::Deleted, FieldValue::Bool(self.deleted.unwrap_or(false)));
        filters
    }
}

#[derive(Debug, Serialize)]
pub struct ListSpeakingsResponse {
    pub result: Vec<Speaking>,
    /// Token for the next page; absent on the last page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SayRequest {
    pub text: String,
}

pub async fn create_speaking(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateSpeakingRequest>,
) -> AppResult<impl IntoResponse> {
    let speaking = state
        .speakings
        .create(
            request.customer_id,
            request.reference_type,
            request.reference_id,
            &request.language,
            &request.provider,
            &request.voice_id,
            request.direction,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(speaking)))
}

pub async fn list_speakings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListSpeakingsQuery>,
) -> AppResult<Json<ListSpeakingsResponse>> {
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(AppError::BadRequest(format!(
            "page_size must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }

    let token = query.page_token.clone().unwrap_or_default();
    let result = state
        .speakings
        .gets(&token, page_size, &query.filters())
        .await?;
    debug!("Listed {} speakings", result.len());

    let next_page_token = if result.len() as u64 == page_size {
        result
            .last()
            .and_then(|speaking| speaking.tm_create.as_ref())
            .map(page_token)
    } else {
        None
    };

    Ok(Json(ListSpeakingsResponse {
        result,
        next_page_token,
    }))
}

pub async fn get_speaking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Speaking>> {
    Ok(Json(state.speakings.get(id).await?))
}

pub async fn delete_speaking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Speaking>> {
    Ok(Json(state.speakings.delete(id).await?))
}

pub async fn say(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<SayRequest>,
) -> AppResult<Json<Speaking>> {
    Ok(Json(state.speakings.say(id, &request.text).await?))
}

pub async fn flush(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Speaking>> {
    Ok(Json(state.speakings.flush(id).await?))
}

pub async fn finish(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Speaking>> {
    Ok(Json(state.speakings.finish(id).await?))
}

pub async fn stop(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Speaking>> {
    Ok(Json(state.speakings.stop(id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_filters_default_to_live_records() {
        let filters = ListSpeakingsQuery::default().filters();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters.get(&Field::Deleted), Some(&FieldValue::Bool(false)));
    }

    #[test]
    fn test_list_query_filters() {
        let customer_id = Uuid::new_v4();
        let query = ListSpeakingsQuery {
            customer_id: Some(customer_id),
            status: Some(Status::Active),
            deleted: Some(true),
            ..Default::default()
        };

        let filters = query.filters();
        assert_eq!(
            filters.get(&Field::CustomerId),
            Some(&FieldValue::Uuid(customer_id))
        );
        assert_eq!(
            filters.get(&Field::Status),
            Some(&FieldValue::Status(Status::Active))
        );
        assert_eq!(filters.get(&Field::Deleted), Some(&FieldValue::Bool(true)));
    }

    #[test]
    fn test_create_request_defaults() {
        let request: CreateSpeakingRequest = serde_json::from_value(serde_json::json!({
            "customer_id": Uuid::new_v4(),
            "reference_type": "call",
            "reference_id": Uuid::new_v4(),
        }))
        .unwrap();

        assert_eq!(request.direction, Direction::Out);
        assert!(request.provider.is_empty());
    }
}
