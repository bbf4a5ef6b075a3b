use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::{CollaboratorResult, check_status};
use crate::core::models::{Direction, ReferenceType};

/// Handle of an external media channel opened by call-control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalMedia {
    pub id: Uuid,
    /// Flow execution of the referenced call, when call-control knows it.
    #[serde(default)]
    pub activeflow_id: Option<Uuid>,
}

#[async_trait]
pub trait CallControl: Send + Sync {
    /// Asks the PBX to open a media channel for `reference_id` that connects to
    /// `listen_address` and identifies itself with `streaming_id`.
    async fn start_external_media(
        &self,
        streaming_id: Uuid,
        reference_type: ReferenceType,
        reference_id: Uuid,
        listen_address: &str,
        direction: Direction,
    ) -> CollaboratorResult<ExternalMedia>;

    async fn stop_external_media(&self, external_media_id: Uuid) -> CollaboratorResult<()>;
}

#[derive(Debug, Serialize)]
struct StartExternalMediaRequest<'a> {
    id: Uuid,
    reference_type: ReferenceType,
    reference_id: Uuid,
    external_host: &'a str,
    encapsulation: &'static str,
    transport: &'static str,
    connection_type: &'static str,
    format: &'static str,
    direction: Direction,
}

/// Call-control client over its REST API.
pub struct HttpCallControl {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCallControl {
    pub fn new(base_url: impl Into<String>) -> CollaboratorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CallControl for HttpCallControl {
    async fn start_external_media(
        &self,
        streaming_id: Uuid,
        reference_type: ReferenceType,
        reference_id: Uuid,
        listen_address: &str,
        direction: Direction,
    ) -> CollaboratorResult<ExternalMedia> {
        let request = StartExternalMediaRequest {
            id: streaming_id,
            reference_type,
            reference_id,
            external_host: listen_address,
            encapsulation: "audiosocket",
            transport: "tcp",
            connection_type: "client",
            format: "slin",
            direction,
        };

        debug!(
            streaming_id = %streaming_id,
            reference_id = %reference_id,
            "Starting external media towards {}", listen_address
        );

        let response = self
            .client
            .post(format!("{}/v1/external-medias", self.base_url))
            .json(&request)
            .send()
            .await?;
        let media: ExternalMedia = check_status(response).await?.json().await?;

        info!(
            streaming_id = %streaming_id,
            external_media_id = %media.id,
            "External media started"
        );
        Ok(media)
    }

    async fn stop_external_media(&self, external_media_id: Uuid) -> CollaboratorResult<()> {
        let response = self
            .client
            .delete(format!(
                "{}/v1/external-medias/{}",
                self.base_url, external_media_id
            ))
            .send()
            .await?;
        check_status(response).await?;

        info!(external_media_id = %external_media_id, "External media stopped");
        Ok(())
    }
}

/// Used when no call-control endpoint is configured; the PBX is expected to be
/// pointed at the listener out of band.
#[derive(Debug, Default)]
pub struct NoopCallControl;

#[async_trait]
impl CallControl for NoopCallControl {
    async fn start_external_media(
        &self,
        streaming_id: Uuid,
        _reference_type: ReferenceType,
        reference_id: Uuid,
        listen_address: &str,
        _direction: Direction,
    ) -> CollaboratorResult<ExternalMedia> {
        debug!(
            streaming_id = %streaming_id,
            reference_id = %reference_id,
            "No call-control configured; expecting PBX connection on {}", listen_address
        );
        Ok(ExternalMedia {
            id: streaming_id,
            activeflow_id: None,
        })
    }

    async fn stop_external_media(&self, _external_media_id: Uuid) -> CollaboratorResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::collaborators::CollaboratorError;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_start_external_media() {
        let server = MockServer::start().await;
        let streaming_id = Uuid::new_v4();
        let media_id = Uuid::new_v4();
        let activeflow_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path("/v1/external-medias"))
            .and(body_partial_json(serde_json::json!({
                "id": streaming_id,
                "reference_type": "call",
                "external_host": "10.0.0.1:9000",
                "encapsulation": "audiosocket",
                "direction": "out",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": media_id,
                "activeflow_id": activeflow_id,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let call_control = HttpCallControl::new(server.uri()).unwrap();
        let media = call_control
            .start_external_media(
                streaming_id,
                ReferenceType::Call,
                Uuid::new_v4(),
                "10.0.0.1:9000",
                Direction::Out,
            )
            .await
            .unwrap();

        assert_eq!(media.id, media_id);
        assert_eq!(media.activeflow_id, Some(activeflow_id));
    }

    #[tokio::test]
    async fn test_start_external_media_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/external-medias"))
            .respond_with(ResponseTemplate::new(404).set_body_string("call not found"))
            .mount(&server)
            .await;

        let call_control = HttpCallControl::new(server.uri()).unwrap();
        let err = call_control
            .start_external_media(
                Uuid::new_v4(),
                ReferenceType::Call,
                Uuid::new_v4(),
                "10.0.0.1:9000",
                Direction::Both,
            )
            .await
            .unwrap_err();

        match err {
            CollaboratorError::Status { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "call not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stop_external_media() {
        let server = MockServer::start().await;
        let media_id = Uuid::new_v4();

        Mock::given(method("DELETE"))
            .and(path(format!("/v1/external-medias/{media_id}")))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let call_control = HttpCallControl::new(server.uri()).unwrap();
        call_control.stop_external_media(media_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_noop_uses_streaming_id() {
        let streaming_id = Uuid::new_v4();
        let media = NoopCallControl
            .start_external_media(
                streaming_id,
                ReferenceType::Confbridge,
                Uuid::new_v4(),
                "127.0.0.1:9000",
                Direction::In,
            )
            .await
            .unwrap();
        assert_eq!(media.id, streaming_id);
        assert!(media.activeflow_id.is_none());
    }
}
