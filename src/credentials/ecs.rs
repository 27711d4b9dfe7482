//! ECS/Fargate container credentials provider: reads
//! `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI` (relative to the task metadata
//! endpoint) or `AWS_CONTAINER_CREDENTIALS_FULL_URI` (absolute, optionally
//! bearing `AWS_CONTAINER_AUTHORIZATION_TOKEN`).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::body::Body;
use crate::http::{Headers, HttpRequest, Method};
use crate::transport::HttpTransport;

use super::{Credential, CredentialsError, CredentialsProvider, ExpiringCredential};

const TASK_METADATA_ENDPOINT: &str = "http://169.254.170.2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Deserialize)]
struct EcsCredentialsResponse {
    #[serde(rename = "AccessKeyId")]
    access_key_id: String,
    #[serde(rename = "SecretAccessKey")]
    secret_access_key: String,
    #[serde(rename = "Token")]
    token: Option<String>,
    #[serde(rename = "Expiration")]
    expiration: DateTime<Utc>,
}

pub struct EcsContainerProvider {
    transport: Arc<dyn HttpTransport>,
    url: String,
    auth_token: Option<String>,
}

impl EcsContainerProvider {
    /// `None` if neither environment variable is set; the chain moves on
    /// to the next provider.
    pub fn from_env(transport: Arc<dyn HttpTransport>) -> Option<Self> {
        if let Ok(full_uri) = std::env::var("AWS_CONTAINER_CREDENTIALS_FULL_URI") {
            let auth_token = std::env::var("AWS_CONTAINER_AUTHORIZATION_TOKEN").ok();
            return Some(Self {
                transport,
                url: full_uri,
                auth_token,
            });
        }
        let relative_uri = std::env::var("AWS_CONTAINER_CREDENTIALS_RELATIVE_URI").ok()?;
        Some(Self {
            transport,
            url: format!("{TASK_METADATA_ENDPOINT}{relative_uri}"),
            auth_token: None,
        })
    }
}

#[async_trait]
impl CredentialsProvider for EcsContainerProvider {
    async fn fetch(&self) -> Result<ExpiringCredential, CredentialsError> {
        let mut headers = Headers::new();
        if let Some(token) = &self.auth_token {
            headers.insert("authorization", token.clone());
        }
        let request = HttpRequest {
            url: self.url.clone(),
            method: Method::Get,
            headers,
            body: Body::empty(),
        };
        let response = self
            .transport
            .send(request, REQUEST_TIMEOUT)
            .await
            .map_err(|e| CredentialsError::Transport(e.to_string()))?;
        if !response.is_success() {
            return Err(CredentialsError::Other(format!(
                "ECS container credentials endpoint returned status {}",
                response.status
            )));
        }

        let body = match response.body {
            Body::Bytes(bytes) => bytes,
            Body::Streaming(_) => return Err(CredentialsError::Other("ECS endpoint returned a streaming body".to_string())),
        };
        let parsed: EcsCredentialsResponse =
            serde_json::from_slice(&body).map_err(|e| CredentialsError::Other(e.to_string()))?;

        tracing::debug!("resolved credentials from ECS container metadata");
        Ok(ExpiringCredential::new(
            Credential::new(parsed.access_key_id, parsed.secret_access_key, parsed.token),
            parsed.expiration.into(),
        ))
    }
}
