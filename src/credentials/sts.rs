//! STS `AssumeRole` and `AssumeRoleWithWebIdentity` providers. Requests go
//! through the same `Signer`/`HttpTransport` machinery every other request
//! in the crate uses; STS is just another signed `Query`-protocol service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::body::Body;
use crate::http::{Headers, HttpRequest, Method};
use crate::signer::{BodyDescriptor, Signer};
use crate::transport::HttpTransport;

use super::{Credential, CredentialsError, CredentialsProvider, ExpiringCredential};

const STS_API_VERSION: &str = "2011-06-15";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

struct RawStsCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
    expiration: String,
}

fn sts_endpoint(region: &str) -> String {
    format!("https://sts.{region}.amazonaws.com/")
}

fn form_body(params: &[(&str, &str)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

async fn post_sts_request(
    transport: &dyn HttpTransport,
    signer: Option<&Signer>,
    region: &str,
    body: String,
) -> Result<String, CredentialsError> {
    let url = sts_endpoint(region);
    let mut headers = Headers::new();
    headers.insert("content-type", "application/x-www-form-urlencoded");

    if let Some(signer) = signer {
        headers = signer
            .sign_headers(&url, "POST", &headers, BodyDescriptor::StringPayload(&body), false, Utc::now())
            .map_err(|e| CredentialsError::Other(e.to_string()))?;
    }

    let request = HttpRequest {
        url,
        method: Method::Post,
        headers,
        body: Body::from(body),
    };

    let response = transport
        .send(request, REQUEST_TIMEOUT)
        .await
        .map_err(|e| CredentialsError::Transport(e.to_string()))?;

    if !response.is_success() {
        return Err(CredentialsError::Other(format!("STS request failed with status {}", response.status)));
    }

    match response.body {
        Body::Bytes(bytes) => String::from_utf8(bytes.to_vec()).map_err(|e| CredentialsError::Other(e.to_string())),
        Body::Streaming(_) => Err(CredentialsError::Other("STS returned a streaming body".to_string())),
    }
}

fn extract_credentials_xml(body: &str) -> Result<RawStsCredentials, CredentialsError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut current_tag = String::new();
    let mut access_key_id = None;
    let mut secret_access_key = None;
    let mut session_token = None;
    let mut expiration = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                current_tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| CredentialsError::Other(e.to_string()))?.into_owned();
                match current_tag.as_str() {
                    "AccessKeyId" => access_key_id = Some(text),
                    "SecretAccessKey" => secret_access_key = Some(text),
                    "SessionToken" => session_token = Some(text),
                    "Expiration" => expiration = Some(text),
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(CredentialsError::Other(e.to_string())),
        }
        buf.clear();
    }

    Ok(RawStsCredentials {
        access_key_id: access_key_id.ok_or_else(|| CredentialsError::Other("missing AccessKeyId".to_string()))?,
        secret_access_key: secret_access_key
            .ok_or_else(|| CredentialsError::Other("missing SecretAccessKey".to_string()))?,
        session_token,
        expiration: expiration.ok_or_else(|| CredentialsError::Other("missing Expiration".to_string()))?,
    })
}

fn raw_into_expiring(raw: RawStsCredentials) -> Result<ExpiringCredential, CredentialsError> {
    let expiration: DateTime<Utc> = raw
        .expiration
        .parse()
        .map_err(|e| CredentialsError::Other(format!("invalid Expiration timestamp: {e}")))?;
    Ok(ExpiringCredential::new(
        Credential::new(raw.access_key_id, raw.secret_access_key, raw.session_token),
        expiration.into(),
    ))
}

/// `sts:AssumeRole`, signed with a source provider's own credentials.
pub struct StsAssumeRoleProvider {
    transport: Arc<dyn HttpTransport>,
    source: Arc<dyn CredentialsProvider>,
    region: String,
    role_arn: String,
    role_session_name: String,
    external_id: Option<String>,
}

impl StsAssumeRoleProvider {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        source: Arc<dyn CredentialsProvider>,
        region: impl Into<String>,
        role_arn: impl Into<String>,
        role_session_name: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            source,
            region: region.into(),
            role_arn: role_arn.into(),
            role_session_name: role_session_name.into(),
            external_id: None,
        }
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }
}

#[async_trait]
impl CredentialsProvider for StsAssumeRoleProvider {
    async fn fetch(&self) -> Result<ExpiringCredential, CredentialsError> {
        let source_credential = self.source.fetch().await?.credential;
        let signer = Signer::new_v4(source_credential, &self.region, "sts");

        let mut params = vec![
            ("Action", "AssumeRole"),
            ("Version", STS_API_VERSION),
            ("RoleArn", self.role_arn.as_str()),
            ("RoleSessionName", self.role_session_name.as_str()),
        ];
        if let Some(external_id) = &self.external_id {
            params.push(("ExternalId", external_id.as_str()));
        }
        let body = form_body(&params);

        tracing::debug!(role_arn = %self.role_arn, "assuming role via STS");
        let response_body = post_sts_request(self.transport.as_ref(), Some(&signer), &self.region, body).await?;
        raw_into_expiring(extract_credentials_xml(&response_body)?)
    }
}

/// `sts:AssumeRoleWithWebIdentity`, unsigned (the web identity token is the
/// proof of identity, not a SigV4 signature).
pub struct StsAssumeRoleWithWebIdentityProvider {
    transport: Arc<dyn HttpTransport>,
    region: String,
    role_arn: String,
    role_session_name: String,
    web_identity_token: String,
}

impl StsAssumeRoleWithWebIdentityProvider {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        region: impl Into<String>,
        role_arn: impl Into<String>,
        role_session_name: impl Into<String>,
        web_identity_token: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            region: region.into(),
            role_arn: role_arn.into(),
            role_session_name: role_session_name.into(),
            web_identity_token: web_identity_token.into(),
        }
    }
}

#[async_trait]
impl CredentialsProvider for StsAssumeRoleWithWebIdentityProvider {
    async fn fetch(&self) -> Result<ExpiringCredential, CredentialsError> {
        let body = form_body(&[
            ("Action", "AssumeRoleWithWebIdentity"),
            ("Version", STS_API_VERSION),
            ("RoleArn", &self.role_arn),
            ("RoleSessionName", &self.role_session_name),
            ("WebIdentityToken", &self.web_identity_token),
        ]);

        tracing::debug!(role_arn = %self.role_arn, "assuming role via web identity federation");
        let response_body = post_sts_request(self.transport.as_ref(), None, &self.region, body).await?;
        raw_into_expiring(extract_credentials_xml(&response_body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_credentials_from_assume_role_response() {
        let xml = r#"<AssumeRoleResponse>
            <AssumeRoleResult>
                <Credentials>
                    <AccessKeyId>AKIDTEST</AccessKeyId>
                    <SecretAccessKey>secret</SecretAccessKey>
                    <SessionToken>token</SessionToken>
                    <Expiration>2030-01-01T00:00:00Z</Expiration>
                </Credentials>
            </AssumeRoleResult>
        </AssumeRoleResponse>"#;
        let raw = extract_credentials_xml(xml).unwrap();
        assert_eq!(raw.access_key_id, "AKIDTEST");
        assert_eq!(raw.session_token.as_deref(), Some("token"));
    }

    #[test]
    fn missing_field_is_an_error() {
        let xml = "<AssumeRoleResponse><AssumeRoleResult><Credentials></Credentials></AssumeRoleResult></AssumeRoleResponse>";
        assert!(extract_credentials_xml(xml).is_err());
    }
}
