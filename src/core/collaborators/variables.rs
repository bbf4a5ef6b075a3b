use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use super::{CollaboratorResult, check_status};

#[async_trait]
pub trait VariableStore: Send + Sync {
    /// Returns the variables of a flow execution.
    async fn get_variables(&self, activeflow_id: Uuid) -> CollaboratorResult<HashMap<String, String>>;
}

#[derive(Debug, Deserialize)]
struct VariablesResponse {
    #[serde(default)]
    variables: HashMap<String, String>,
}

pub struct HttpVariableStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpVariableStore {
    pub fn new(base_url: impl Into<String>) -> CollaboratorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl VariableStore for HttpVariableStore {
    async fn get_variables(&self, activeflow_id: Uuid) -> CollaboratorResult<HashMap<String, String>> {
        let response = self
            .client
            .get(format!("{}/v1/variables/{}", self.base_url, activeflow_id))
            .send()
            .await?;
        let body: VariablesResponse = check_status(response).await?.json().await?;
        Ok(body.variables)
    }
}

#[derive(Debug, Default)]
pub struct NoopVariableStore;

#[async_trait]
impl VariableStore for NoopVariableStore {
    async fn get_variables(&self, _activeflow_id: Uuid) -> CollaboratorResult<HashMap<String, String>> {
        Ok(HashMap::new())
    }
}
