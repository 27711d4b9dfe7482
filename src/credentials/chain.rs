//! Ordered provider chain: try each provider in turn, keep the first
//! success.

use std::sync::Arc;

use async_trait::async_trait;

use crate::transport::HttpTransport;

use super::{
    ConfigFileProvider, EcsContainerProvider, EnvironmentProvider, ExpiringCredential, InstanceMetadataProvider,
};
use super::{CredentialsError, CredentialsProvider};

/// Tries each wrapped provider in order, returning the first success.
/// `NoProvider` from a provider means "try the next one"; any other error
/// is still recorded but doesn't stop the walk. Only if every provider
/// fails is an error returned, and it's the last provider's.
pub struct CredentialsChain {
    providers: Vec<Arc<dyn CredentialsProvider>>,
}

impl CredentialsChain {
    pub fn new(providers: Vec<Arc<dyn CredentialsProvider>>) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl CredentialsProvider for CredentialsChain {
    async fn fetch(&self) -> Result<ExpiringCredential, CredentialsError> {
        let mut last_error = CredentialsError::NoProvider;
        for provider in &self.providers {
            match provider.fetch().await {
                Ok(credential) => return Ok(credential),
                Err(e) => last_error = e,
            }
        }
        Err(last_error)
    }

    async fn shutdown(&self) {
        for provider in &self.providers {
            provider.shutdown().await;
        }
    }
}

/// The standard resolution order: environment, web identity
/// federation, profile files, ECS container credentials, then the instance
/// metadata service.
pub fn default_provider_chain(transport: Arc<dyn HttpTransport>, region: impl Into<String>) -> CredentialsChain {
    let region = region.into();
    let mut providers: Vec<Arc<dyn CredentialsProvider>> = vec![Arc::new(EnvironmentProvider::new())];

    if let Some(web_identity) = super::web_identity::WebIdentityProvider::from_env(transport.clone(), &region) {
        providers.push(Arc::new(web_identity));
    }

    providers.push(Arc::new(ConfigFileProvider::new()));

    if let Some(ecs) = EcsContainerProvider::from_env(transport.clone()) {
        providers.push(Arc::new(ecs));
    }

    providers.push(Arc::new(InstanceMetadataProvider::new(transport)));

    CredentialsChain::new(providers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Credential;
    use std::sync::Mutex as StdMutex;

    struct FailingProvider;

    #[async_trait]
    impl CredentialsProvider for FailingProvider {
        async fn fetch(&self) -> Result<ExpiringCredential, CredentialsError> {
            Err(CredentialsError::NoProvider)
        }
    }

    struct RecordingProvider {
        calls: StdMutex<usize>,
    }

    #[async_trait]
    impl CredentialsProvider for RecordingProvider {
        async fn fetch(&self) -> Result<ExpiringCredential, CredentialsError> {
            *self.calls.lock().unwrap() += 1;
            Ok(super::super::non_expiring(Credential::new("AKID", "secret", None)))
        }
    }

    #[tokio::test]
    async fn falls_through_to_the_next_provider() {
        let recording = Arc::new(RecordingProvider { calls: StdMutex::new(0) });
        let chain = CredentialsChain::new(vec![Arc::new(FailingProvider), recording.clone()]);
        let fetched = chain.fetch().await.unwrap();
        assert_eq!(fetched.credential.access_key_id, "AKID");
        assert_eq!(*recording.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn every_provider_failing_surfaces_the_last_error() {
        let chain = CredentialsChain::new(vec![Arc::new(FailingProvider), Arc::new(FailingProvider)]);
        let err = chain.fetch().await.unwrap_err();
        assert!(matches!(err, CredentialsError::NoProvider));
    }
}
