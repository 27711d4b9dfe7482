//! EC2 Instance Metadata Service provider: IMDSv2 token
//! first, falling back to an unauthenticated IMDSv1 request if the token
//! endpoint is unreachable (older AMIs, IMDSv2 disabled).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::body::Body;
use crate::http::{Headers, HttpRequest, Method};
use crate::transport::HttpTransport;

use super::{Credential, CredentialsError, CredentialsProvider, ExpiringCredential};

const DEFAULT_ENDPOINT: &str = "http://169.254.169.254";
const TOKEN_TTL_SECONDS: &str = "21600";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Deserialize)]
struct ImdsCredentialsResponse {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "AccessKeyId")]
    access_key_id: Option<String>,
    #[serde(rename = "SecretAccessKey")]
    secret_access_key: Option<String>,
    #[serde(rename = "Token")]
    token: Option<String>,
    #[serde(rename = "Expiration")]
    expiration: Option<DateTime<Utc>>,
}

/// Instance profile credential provider.
pub struct InstanceMetadataProvider {
    transport: Arc<dyn HttpTransport>,
    endpoint: String,
}

impl InstanceMetadataProvider {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(transport: Arc<dyn HttpTransport>, endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
        }
    }

    async fn fetch_token(&self) -> Option<String> {
        let mut headers = Headers::new();
        headers.insert("x-aws-ec2-metadata-token-ttl-seconds", TOKEN_TTL_SECONDS);
        let request = HttpRequest {
            url: format!("{}/latest/api/token", self.endpoint),
            method: Method::Put,
            headers,
            body: Body::empty(),
        };
        let response = self.transport.send(request, REQUEST_TIMEOUT).await.ok()?;
        if !response.is_success() {
            return None;
        }
        match response.body {
            Body::Bytes(bytes) => String::from_utf8(bytes.to_vec()).ok(),
            Body::Streaming(_) => None,
        }
    }

    async fn get(&self, path: &str, token: Option<&str>) -> Result<String, CredentialsError> {
        let mut headers = Headers::new();
        if let Some(token) = token {
            headers.insert("x-aws-ec2-metadata-token", token);
        }
        let request = HttpRequest {
            url: format!("{}{path}", self.endpoint),
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
            return Err(CredentialsError::NoProvider);
        }
        match response.body {
            Body::Bytes(bytes) => String::from_utf8(bytes.to_vec()).map_err(|e| CredentialsError::Other(e.to_string())),
            Body::Streaming(_) => Err(CredentialsError::Other("IMDS returned a streaming body".to_string())),
        }
    }
}

#[async_trait]
impl CredentialsProvider for InstanceMetadataProvider {
    async fn fetch(&self) -> Result<ExpiringCredential, CredentialsError> {
        let token = self.fetch_token().await;
        if token.is_none() {
            tracing::debug!("IMDSv2 token request failed, falling back to IMDSv1");
        }

        let role_name = self
            .get("/latest/meta-data/iam/security-credentials/", token.as_deref())
            .await?;
        let role_name = role_name.trim();
        if role_name.is_empty() {
            return Err(CredentialsError::NoProvider);
        }

        let body = self
            .get(
                &format!("/latest/meta-data/iam/security-credentials/{role_name}"),
                token.as_deref(),
            )
            .await?;
        let parsed: ImdsCredentialsResponse =
            serde_json::from_str(&body).map_err(|e| CredentialsError::Other(e.to_string()))?;

        if parsed.code != "Success" {
            return Err(CredentialsError::Other(format!("IMDS returned code {:?}", parsed.code)));
        }

        let access_key_id = parsed.access_key_id.ok_or(CredentialsError::MissingAccessKeyId)?;
        let secret_access_key = parsed.secret_access_key.ok_or(CredentialsError::MissingSecretAccessKey)?;
        let expiration = parsed
            .expiration
            .ok_or_else(|| CredentialsError::Other("missing Expiration".to_string()))?;

        tracing::debug!(role = %role_name, "resolved credentials from instance metadata service");
        Ok(ExpiringCredential::new(
            Credential::new(access_key_id, secret_access_key, parsed.token),
            expiration.into(),
        ))
    }
}
