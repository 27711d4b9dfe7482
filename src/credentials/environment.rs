//! Environment-variable credential provider.

use async_trait::async_trait;

use super::{non_expiring, Credential, CredentialsError, CredentialsProvider, ExpiringCredential};

const ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
const SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
const SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";

/// Reads `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` / `AWS_SESSION_TOKEN`.
/// `NoProvider` if either of the first two is unset, matching the chain's
/// "try the next provider" contract.
pub struct EnvironmentProvider;

impl EnvironmentProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EnvironmentProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialsProvider for EnvironmentProvider {
    async fn fetch(&self) -> Result<ExpiringCredential, CredentialsError> {
        let access_key_id = std::env::var(ACCESS_KEY_ID).map_err(|_| CredentialsError::NoProvider)?;
        let secret_access_key = std::env::var(SECRET_ACCESS_KEY).map_err(|_| CredentialsError::NoProvider)?;
        let session_token = std::env::var(SESSION_TOKEN).ok();
        tracing::debug!(access_key_id = %access_key_id, "resolved credentials from environment");
        Ok(non_expiring(Credential::new(access_key_id, secret_access_key, session_token)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[tokio::test]
    async fn missing_variables_yield_no_provider() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var(ACCESS_KEY_ID);
        std::env::remove_var(SECRET_ACCESS_KEY);
        let err = EnvironmentProvider::new().fetch().await.unwrap_err();
        assert!(matches!(err, CredentialsError::NoProvider));
    }

    #[tokio::test]
    async fn reads_credential_from_variables() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var(ACCESS_KEY_ID, "AKIDENV");
        std::env::set_var(SECRET_ACCESS_KEY, "secretenv");
        std::env::remove_var(SESSION_TOKEN);
        let fetched = EnvironmentProvider::new().fetch().await.unwrap();
        assert_eq!(fetched.credential.access_key_id, "AKIDENV");
        std::env::remove_var(ACCESS_KEY_ID);
        std::env::remove_var(SECRET_ACCESS_KEY);
    }
}
