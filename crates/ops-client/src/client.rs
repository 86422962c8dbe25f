//! Operations service HTTP client.

use crate::error::OpsError;
use crate::types::*;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Client for the service that carries out storage, IAM and volume work.
///
/// Every operation is a single `POST {base_url}/v1/operations/{name}` with a
/// JSON body. Long jobs hold the request open, so the timeout is generous.
#[derive(Clone)]
pub struct OpsClient {
    client: Client,
    base_url: String,
    api_token: Option<SecretString>,
}

impl OpsClient {
    pub fn new(
        base_url: impl Into<String>,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, OpsError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.map(SecretString::new),
        })
    }

    /// Run `operation` with `body` and decode its JSON result.
    #[instrument(skip(self, body))]
    pub async fn invoke<B, T>(&self, operation: &str, body: &B) -> Result<T, OpsError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self
            .client
            .post(format!("{}/v1/operations/{}", self.base_url, operation))
            .json(body);
        if let Some(token) = &self.api_token {
            request = request.header("Authorization", format!("Bearer {}", token.expose_secret()));
        }

        let response = request.send().await?;
        self.handle_response(operation, response).await
    }

    pub async fn transfer(&self, request: &TransferRequest) -> Result<OperationMessage, OpsError> {
        self.invoke("storage.transfer", request).await
    }

    pub async fn create_bucket(&self, request: &BucketRequest) -> Result<OperationMessage, OpsError> {
        self.invoke("bucket.create", request).await
    }

    pub async fn list_service_accounts(&self, project: &str) -> Result<Vec<ServiceAccount>, OpsError> {
        let request = ProjectRequest {
            project: project.to_string(),
        };
        let list: ServiceAccountList = self.invoke("sa.list", &request).await?;
        Ok(list.accounts)
    }

    pub async fn create_service_account(
        &self,
        request: &ServiceAccountRequest,
    ) -> Result<ServiceAccount, OpsError> {
        self.invoke("sa.create", request).await
    }

    pub async fn rename_service_account(
        &self,
        request: &ServiceAccountRequest,
    ) -> Result<RenamedAccount, OpsError> {
        self.invoke("sa.rename", request).await
    }

    pub async fn set_service_account_enabled(
        &self,
        request: &ServiceAccountRequest,
        enabled: bool,
    ) -> Result<OperationMessage, OpsError> {
        let operation = if enabled { "sa.enable" } else { "sa.disable" };
        self.invoke(operation, request).await
    }

    pub async fn delete_service_account(
        &self,
        request: &ServiceAccountRequest,
    ) -> Result<OperationMessage, OpsError> {
        self.invoke("sa.delete", request).await
    }

    pub async fn list_keys(&self, request: &KeyRequest) -> Result<Vec<ServiceAccountKey>, OpsError> {
        let list: KeyList = self.invoke("sa.keys.list", request).await?;
        Ok(list.keys)
    }

    pub async fn create_key(&self, request: &KeyRequest) -> Result<CreatedKey, OpsError> {
        self.invoke("sa.keys.create", request).await
    }

    pub async fn delete_key(&self, request: &KeyRequest) -> Result<OperationMessage, OpsError> {
        self.invoke("sa.keys.delete", request).await
    }

    pub async fn preview_volume(&self, request: &VolumeRequest) -> Result<Preview, OpsError> {
        self.invoke("volume.preview", request).await
    }

    /// Resolve a viewer link into its image source and annotated boxes.
    pub async fn parse_state(&self, request: &StateRequest) -> Result<ParsedState, OpsError> {
        self.invoke("volume.parse_state", request).await
    }

    pub async fn create_cutout(&self, request: &CutoutRequest) -> Result<OperationMessage, OpsError> {
        self.invoke("volume.cutout", request).await
    }

    pub async fn create_bboxes(&self, request: &StateRequest) -> Result<OperationMessage, OpsError> {
        self.invoke("volume.bboxes", request).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        operation: &str,
        response: reqwest::Response,
    ) -> Result<T, OpsError> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            debug!("Response body: {}", truncate(&body, 200));
            return serde_json::from_str(&body).map_err(OpsError::from);
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".into());
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                warn!("Operations service rejected credentials");
                Err(OpsError::Unauthorized)
            }
            StatusCode::NOT_FOUND => Err(OpsError::NotFound(message)),
            _ => Err(OpsError::Api {
                operation: operation.to_string(),
                status: status.as_u16(),
                message,
            }),
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
