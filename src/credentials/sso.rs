//! AWS SSO (IAM Identity Center) provider: reads the cached
//! SSO-OIDC token the CLI's `aws sso login` wrote, refreshes it through
//! SSO-OIDC if it's stale and a refresh token is cached, then exchanges it
//! for short-lived role credentials via the SSO portal API.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sha1::{Digest, Sha1};

use crate::body::Body;
use crate::http::{Headers, HttpRequest, Method};
use crate::transport::HttpTransport;

use super::{Credential, CredentialsError, CredentialsProvider, ExpiringCredential, SSO_REFRESH_LEAD_TIME};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Deserialize)]
struct CachedToken {
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(rename = "expiresAt")]
    expires_at: DateTime<Utc>,
    #[serde(rename = "refreshToken")]
    refresh_token: Option<String>,
    #[serde(rename = "clientId")]
    client_id: Option<String>,
    #[serde(rename = "clientSecret")]
    client_secret: Option<String>,
}

#[derive(Deserialize)]
struct OidcTokenResponse {
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(rename = "expiresIn")]
    expires_in: i64,
    #[serde(rename = "refreshToken")]
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct RoleCredentialsResponse {
    #[serde(rename = "roleCredentials")]
    role_credentials: RoleCredentials,
}

#[derive(Deserialize)]
struct RoleCredentials {
    #[serde(rename = "accessKeyId")]
    access_key_id: String,
    #[serde(rename = "secretAccessKey")]
    secret_access_key: String,
    #[serde(rename = "sessionToken")]
    session_token: String,
    expiration: i64,
}

fn cache_file_for(start_url: &str) -> String {
    let digest = Sha1::digest(start_url.as_bytes());
    format!("{}.json", hex::encode(digest))
}

fn default_cache_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".aws").join("sso").join("cache"))
}

pub struct SsoProvider {
    transport: Arc<dyn HttpTransport>,
    sso_start_url: String,
    sso_region: String,
    account_id: String,
    role_name: String,
    cache_dir: Option<PathBuf>,
}

impl SsoProvider {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        sso_start_url: impl Into<String>,
        sso_region: impl Into<String>,
        account_id: impl Into<String>,
        role_name: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            sso_start_url: sso_start_url.into(),
            sso_region: sso_region.into(),
            account_id: account_id.into(),
            role_name: role_name.into(),
            cache_dir: default_cache_dir(),
        }
    }

    async fn read_cached_token(&self) -> Result<CachedToken, CredentialsError> {
        let cache_dir = self
            .cache_dir
            .clone()
            .ok_or_else(|| CredentialsError::SsoConfigMissing("no home directory to locate the SSO token cache".to_string()))?;
        let path = cache_dir.join(cache_file_for(&self.sso_start_url));
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|_| CredentialsError::SsoSessionNotFound(self.sso_start_url.clone()))?;
        serde_json::from_str(&content).map_err(|e| CredentialsError::Other(e.to_string()))
    }

    async fn refresh_token(&self, cached: &CachedToken) -> Result<CachedToken, CredentialsError> {
        let (Some(client_id), Some(client_secret), Some(refresh_token)) =
            (&cached.client_id, &cached.client_secret, &cached.refresh_token)
        else {
            return Err(CredentialsError::ClientRegistrationExpired);
        };

        let payload = serde_json::json!({
            "clientId": client_id,
            "clientSecret": client_secret,
            "refreshToken": refresh_token,
            "grantType": "refresh_token",
        });
        let mut headers = Headers::new();
        headers.insert("content-type", "application/json");
        let request = HttpRequest {
            url: format!("https://oidc.{}.amazonaws.com/token", self.sso_region),
            method: Method::Post,
            headers,
            body: Body::from(payload.to_string()),
        };
        let response = self
            .transport
            .send(request, REQUEST_TIMEOUT)
            .await
            .map_err(|e| CredentialsError::Transport(e.to_string()))?;
        if !response.is_success() {
            return Err(CredentialsError::ClientRegistrationExpired);
        }
        let body = match response.body {
            Body::Bytes(bytes) => bytes,
            Body::Streaming(_) => return Err(CredentialsError::Other("SSO-OIDC returned a streaming body".to_string())),
        };
        let refreshed: OidcTokenResponse =
            serde_json::from_slice(&body).map_err(|e| CredentialsError::Other(e.to_string()))?;

        Ok(CachedToken {
            access_token: refreshed.access_token,
            expires_at: Utc::now() + chrono::Duration::seconds(refreshed.expires_in),
            refresh_token: refreshed.refresh_token.or_else(|| cached.refresh_token.clone()),
            client_id: cached.client_id.clone(),
            client_secret: cached.client_secret.clone(),
        })
    }

    async fn get_role_credentials(&self, access_token: &str) -> Result<ExpiringCredential, CredentialsError> {
        let mut headers = Headers::new();
        headers.insert("x-amz-sso_bearer_token", access_token);
        let url = format!(
            "https://portal.sso.{}.amazonaws.com/federation/credentials?role_name={}&account_id={}",
            self.sso_region, self.role_name, self.account_id
        );
        let request = HttpRequest {
            url,
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
                "SSO GetRoleCredentials returned status {}",
                response.status
            )));
        }
        let body = match response.body {
            Body::Bytes(bytes) => bytes,
            Body::Streaming(_) => return Err(CredentialsError::Other("SSO portal returned a streaming body".to_string())),
        };
        let parsed: RoleCredentialsResponse =
            serde_json::from_slice(&body).map_err(|e| CredentialsError::Other(e.to_string()))?;
        let credentials = parsed.role_credentials;
        let expiration = DateTime::<Utc>::from_timestamp_millis(credentials.expiration)
            .ok_or_else(|| CredentialsError::Other("invalid SSO expiration timestamp".to_string()))?;

        Ok(ExpiringCredential::new(
            Credential::new(credentials.access_key_id, credentials.secret_access_key, Some(credentials.session_token)),
            expiration.into(),
        ))
    }
}

#[async_trait]
impl CredentialsProvider for SsoProvider {
    async fn fetch(&self) -> Result<ExpiringCredential, CredentialsError> {
        let mut token = self.read_cached_token().await?;
        let refresh_lead = chrono::Duration::from_std(SSO_REFRESH_LEAD_TIME).expect("lead time fits in chrono::Duration");
        if token.expires_at <= Utc::now() + refresh_lead {
            tracing::debug!(start_url = %self.sso_start_url, "SSO token near expiry, refreshing");
            token = self.refresh_token(&token).await?;
        }
        self.get_role_credentials(&token.access_token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_file_name_is_sha1_of_start_url() {
        let name = cache_file_for("https://example.awsapps.com/start");
        assert!(name.ends_with(".json"));
        assert_eq!(name.len(), 40 + ".json".len());
    }
}
