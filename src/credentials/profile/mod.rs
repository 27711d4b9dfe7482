//! `~/.aws/config` / `~/.aws/credentials` profile provider.

mod ini;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use super::{non_expiring, Credential, CredentialsError, CredentialsProvider, ExpiringCredential};

#[derive(Debug, Error, Clone)]
pub enum ConfigFileError {
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse profile file: {0}")]
    Parse(String),
}

fn default_credentials_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("AWS_SHARED_CREDENTIALS_FILE") {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".aws").join("credentials"))
}

fn default_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("AWS_CONFIG_FILE") {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".aws").join("config"))
}

fn active_profile() -> String {
    std::env::var("AWS_PROFILE").unwrap_or_else(|_| "default".to_string())
}

async fn read_optional(path: &Option<PathBuf>) -> Result<String, CredentialsError> {
    let Some(path) = path else { return Ok(String::new()) };
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(CredentialsError::InvalidCredentialFile(format!("{}: {e}", path.display()))),
    }
}

/// Reads a named profile (`AWS_PROFILE`, default `"default"`) from the
/// credentials file, falling back to the config file for values the
/// credentials file doesn't carry (some setups only populate `config`).
pub struct ConfigFileProvider {
    profile: String,
    credentials_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
}

impl ConfigFileProvider {
    pub fn new() -> Self {
        Self {
            profile: active_profile(),
            credentials_path: default_credentials_path(),
            config_path: default_config_path(),
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }
}

impl Default for ConfigFileProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialsProvider for ConfigFileProvider {
    async fn fetch(&self) -> Result<ExpiringCredential, CredentialsError> {
        let credentials_text = read_optional(&self.credentials_path).await?;
        let config_text = read_optional(&self.config_path).await?;

        let credentials_doc =
            ini::parse(&credentials_text).map_err(|e| CredentialsError::InvalidIniFile(e.to_string()))?;
        let config_doc = ini::parse(&config_text).map_err(|e| CredentialsError::InvalidIniFile(e.to_string()))?;

        let from_credentials = credentials_doc.get(&self.profile);
        let from_config = config_doc.get(&ini::config_section_name(&self.profile));

        let lookup = |key: &str| -> Option<String> {
            from_credentials
                .and_then(|section| section.get(key))
                .or_else(|| from_config.and_then(|section| section.get(key)))
                .cloned()
        };

        if from_credentials.is_none() && from_config.is_none() {
            return Err(CredentialsError::MissingProfile(self.profile.clone()));
        }

        let access_key_id = lookup("aws_access_key_id").ok_or(CredentialsError::MissingAccessKeyId)?;
        let secret_access_key = lookup("aws_secret_access_key").ok_or(CredentialsError::MissingSecretAccessKey)?;
        let session_token = lookup("aws_session_token");

        tracing::debug!(profile = %self.profile, "resolved credentials from profile file");
        Ok(non_expiring(Credential::new(access_key_id, secret_access_key, session_token)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn reads_credential_from_credentials_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[default]\naws_access_key_id = AKID\naws_secret_access_key = secret\n").unwrap();

        let provider = ConfigFileProvider {
            profile: "default".to_string(),
            credentials_path: Some(file.path().to_path_buf()),
            config_path: None,
        };
        let fetched = provider.fetch().await.unwrap();
        assert_eq!(fetched.credential.access_key_id, "AKID");
    }

    #[tokio::test]
    async fn missing_profile_is_reported() {
        let provider = ConfigFileProvider {
            profile: "does-not-exist".to_string(),
            credentials_path: None,
            config_path: None,
        };
        let err = provider.fetch().await.unwrap_err();
        assert!(matches!(err, CredentialsError::MissingProfile(_)));
    }
}
