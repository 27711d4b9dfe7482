//! The trivial provider: a credential supplied directly by the caller.

use async_trait::async_trait;

use super::{non_expiring, Credential, CredentialsError, CredentialsProvider, ExpiringCredential};

/// Wraps a fixed `Credential`. Always succeeds; never expires.
pub struct StaticProvider {
    credential: Credential,
}

impl StaticProvider {
    pub fn new(credential: Credential) -> Self {
        Self { credential }
    }
}

#[async_trait]
impl CredentialsProvider for StaticProvider {
    async fn fetch(&self) -> Result<ExpiringCredential, CredentialsError> {
        Ok(non_expiring(self.credential.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_returns_the_wrapped_credential() {
        let provider = StaticProvider::new(Credential::new("AKID", "secret", None));
        let fetched = provider.fetch().await.unwrap();
        assert_eq!(fetched.credential.access_key_id, "AKID");
    }
}
