//! Environment/config-driven web identity federation (EKS IRSA and
//! similar): reads a token file fresh on every fetch (the token rotates
//! underneath the process) and delegates the actual STS call to
//! [`super::sts::StsAssumeRoleWithWebIdentityProvider`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::transport::HttpTransport;

use super::sts::StsAssumeRoleWithWebIdentityProvider;
use super::{CredentialsError, CredentialsProvider, ExpiringCredential};

pub struct WebIdentityProvider {
    transport: Arc<dyn HttpTransport>,
    region: String,
    role_arn: String,
    role_session_name: String,
    token_file_path: String,
}

impl WebIdentityProvider {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        region: impl Into<String>,
        role_arn: impl Into<String>,
        role_session_name: impl Into<String>,
        token_file_path: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            region: region.into(),
            role_arn: role_arn.into(),
            role_session_name: role_session_name.into(),
            token_file_path: token_file_path.into(),
        }
    }

    /// Build from the standard `AWS_WEB_IDENTITY_TOKEN_FILE` / `AWS_ROLE_ARN`
    /// / `AWS_ROLE_SESSION_NAME` environment variables, or `None` if they're
    /// not set (the chain then tries the next provider).
    pub fn from_env(transport: Arc<dyn HttpTransport>, region: impl Into<String>) -> Option<Self> {
        let token_file_path = std::env::var("AWS_WEB_IDENTITY_TOKEN_FILE").ok()?;
        let role_arn = std::env::var("AWS_ROLE_ARN").ok()?;
        let role_session_name =
            std::env::var("AWS_ROLE_SESSION_NAME").unwrap_or_else(|_| "aws-client-core".to_string());
        Some(Self::new(transport, region, role_arn, role_session_name, token_file_path))
    }
}

#[async_trait]
impl CredentialsProvider for WebIdentityProvider {
    async fn fetch(&self) -> Result<ExpiringCredential, CredentialsError> {
        let token = tokio::fs::read_to_string(&self.token_file_path)
            .await
            .map_err(|e| CredentialsError::TokenIdFileFailedToLoad(e.to_string()))?;
        let token = token.trim().to_string();

        let provider = StsAssumeRoleWithWebIdentityProvider::new(
            self.transport.clone(),
            &self.region,
            &self.role_arn,
            &self.role_session_name,
            token,
        );
        provider.fetch().await
    }
}
