//! Credential data model and provider contract.

mod cache;
mod chain;
mod ecs;
mod environment;
mod imds;
mod profile;
mod sso;
mod static_provider;
mod sts;
mod web_identity;

pub use cache::RotatingCredentialsCache;
pub use chain::{default_provider_chain, CredentialsChain};
pub use ecs::EcsContainerProvider;
pub use environment::EnvironmentProvider;
pub use imds::InstanceMetadataProvider;
pub use profile::{ConfigFileError, ConfigFileProvider};
pub use sso::SsoProvider;
pub use static_provider::StaticProvider;
pub use sts::{StsAssumeRoleProvider, StsAssumeRoleWithWebIdentityProvider};

use std::fmt;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use thiserror::Error;
use zeroize::Zeroize;

/// Errors from credential resolution.
#[derive(Debug, Error, Clone)]
pub enum CredentialsError {
    /// This provider has nothing to offer; the chain should try the next
    /// one.
    #[error("no credentials available from this provider")]
    NoProvider,

    #[error("failed to load web identity token file: {0}")]
    TokenIdFileFailedToLoad(String),

    #[error("profile {0:?} not found")]
    MissingProfile(String),

    #[error("missing access key id")]
    MissingAccessKeyId,

    #[error("missing secret access key")]
    MissingSecretAccessKey,

    #[error("invalid credentials file: {0}")]
    InvalidCredentialFile(String),

    #[error("invalid INI file: {0}")]
    InvalidIniFile(String),

    #[error("sso session {0:?} not found")]
    SsoSessionNotFound(String),

    #[error("sso configuration missing: {0}")]
    SsoConfigMissing(String),

    #[error("client registration expired")]
    ClientRegistrationExpired,

    #[error("credential operation not supported: {0}")]
    NotSupported(String),

    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    Other(String),
}

/// An immutable access-key/secret-key/session-token triple.
///
/// The secret key zeroizes on drop.
#[derive(Clone)]
pub struct Credential {
    pub access_key_id: String,
    secret_access_key: SecretString,
    pub session_token: Option<String>,
}

#[derive(Clone)]
struct SecretString(String);

impl Drop for SecretString {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Credential {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString(secret_access_key.into()),
            session_token,
        }
    }

    /// An empty credential: the signer short-circuits and emits the request
    /// unsigned for this.
    pub fn empty() -> Self {
        Self::new("", "", None)
    }

    pub fn is_empty(&self) -> bool {
        self.access_key_id.is_empty()
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key.0
    }
}

/// A `Credential` with an absolute expiration.
#[derive(Debug, Clone)]
pub struct ExpiringCredential {
    pub credential: Credential,
    pub expiration: SystemTime,
}

impl ExpiringCredential {
    pub fn new(credential: Credential, expiration: SystemTime) -> Self {
        Self { credential, expiration }
    }

    /// Whether this credential is within `lead_time` of expiring (or has
    /// already expired), relative to `now`.
    pub fn expires_within(&self, now: SystemTime, lead_time: Duration) -> bool {
        match self.expiration.duration_since(now) {
            Ok(remaining) => remaining <= lead_time,
            Err(_) => true, // already in the past
        }
    }
}

/// Default rotation lead time: treat a credential as expired if it expires
/// within 5 minutes.
pub const DEFAULT_ROTATION_LEAD_TIME: Duration = Duration::from_secs(5 * 60);

/// SSO refresh-eligible lead time: 15 minutes.
pub const SSO_REFRESH_LEAD_TIME: Duration = Duration::from_secs(15 * 60);

/// Uniform "fetch a credential" contract every provider variant implements.
///
/// Providers log through `tracing` directly rather than threading a
/// logger handle through call sites.
#[async_trait]
pub trait CredentialsProvider: Send + Sync {
    async fn fetch(&self) -> Result<ExpiringCredential, CredentialsError>;

    async fn shutdown(&self) {}
}

/// A provider whose credentials never expire (static, environment): wraps
/// it with a far-future expiration so it composes uniformly with
/// `CredentialsProvider`.
pub(crate) fn non_expiring(credential: Credential) -> ExpiringCredential {
    ExpiringCredential::new(credential, SystemTime::now() + Duration::from_secs(365 * 24 * 3600))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_credential_is_empty() {
        assert!(Credential::empty().is_empty());
        assert!(!Credential::new("AKID", "secret", None).is_empty());
    }

    #[test]
    fn expires_within_detects_lead_time() {
        let now = SystemTime::now();
        let cred = ExpiringCredential::new(Credential::empty(), now + Duration::from_secs(60));
        assert!(cred.expires_within(now, Duration::from_secs(120)));
        assert!(!cred.expires_within(now, Duration::from_secs(10)));
    }

    #[test]
    fn expires_within_true_when_already_past() {
        let now = SystemTime::now();
        let cred = ExpiringCredential::new(Credential::empty(), now - Duration::from_secs(1));
        assert!(cred.expires_within(now, Duration::from_secs(0)));
    }
}
