//! Immutable per-service configuration.
//!
//! `serde`-backed, `Default` for every optional field, entirely in-memory:
//! a service client builds one of these once and shares it for its
//! lifetime.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The wire protocol a service uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Protocol {
    AwsJson,
    RestJson,
    RestXml,
    Query,
    Ec2Query,
}

impl Protocol {
    pub fn default_content_type(&self) -> Option<&'static str> {
        match self {
            Protocol::AwsJson => Some("application/x-amz-json-1.1"),
            Protocol::RestJson => Some("application/json"),
            Protocol::RestXml => Some("application/xml"),
            Protocol::Query | Protocol::Ec2Query => {
                Some("application/x-www-form-urlencoded; charset=utf-8")
            }
        }
    }

    pub fn is_xml_family(&self) -> bool {
        matches!(self, Protocol::RestXml | Protocol::Query | Protocol::Ec2Query)
    }
}

/// Feature flags that alter encoding behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Compute `content-md5` when a shape opts into md5 and no other
    /// checksum algorithm was selected.
    #[serde(default)]
    pub calculate_md5: bool,
    /// Disable the `aws-chunked` streaming-signature transport for S3
    /// uploads even when eligible.
    #[serde(default)]
    pub s3_disable_chunked_uploads: bool,
}

/// Immutable per-service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub endpoint: String,
    pub region: String,
    /// The signing name used in the SigV4 scope (often, but not always,
    /// equal to the service's API name; e.g. S3 signs as `s3`).
    pub signing_name: String,
    pub api_version: String,
    pub protocol: Protocol,
    pub amz_target_prefix: Option<String>,
    pub xml_namespace: Option<String>,
    pub features: FeatureFlags,
    /// Maps a service error `code` to its service-specific error type name
    ///.
    pub error_code_map: HashMap<String, String>,
}

impl ServiceConfig {
    pub fn builder(protocol: Protocol) -> ServiceConfigBuilder {
        ServiceConfigBuilder::new(protocol)
    }
}

/// Builder for `ServiceConfig`: explicit construction over ad-hoc struct
/// literals scattered through call sites.
pub struct ServiceConfigBuilder {
    endpoint: Option<String>,
    region: Option<String>,
    signing_name: Option<String>,
    api_version: String,
    protocol: Protocol,
    amz_target_prefix: Option<String>,
    xml_namespace: Option<String>,
    features: FeatureFlags,
    error_code_map: HashMap<String, String>,
}

impl ServiceConfigBuilder {
    pub fn new(protocol: Protocol) -> Self {
        Self {
            endpoint: None,
            region: None,
            signing_name: None,
            api_version: String::new(),
            protocol,
            amz_target_prefix: None,
            xml_namespace: None,
            features: FeatureFlags::default(),
            error_code_map: HashMap::new(),
        }
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn signing_name(mut self, name: impl Into<String>) -> Self {
        self.signing_name = Some(name.into());
        self
    }

    pub fn api_version(mut self, v: impl Into<String>) -> Self {
        self.api_version = v.into();
        self
    }

    pub fn amz_target_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.amz_target_prefix = Some(prefix.into());
        self
    }

    pub fn xml_namespace(mut self, ns: impl Into<String>) -> Self {
        self.xml_namespace = Some(ns.into());
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    pub fn error_code_map(mut self, map: HashMap<String, String>) -> Self {
        self.error_code_map = map;
        self
    }

    pub fn build(self) -> ServiceConfig {
        ServiceConfig {
            endpoint: self.endpoint.unwrap_or_default(),
            region: self.region.unwrap_or_else(|| "us-east-1".to_string()),
            signing_name: self.signing_name.unwrap_or_default(),
            api_version: self.api_version,
            protocol: self.protocol,
            amz_target_prefix: self.amz_target_prefix,
            xml_namespace: self.xml_namespace,
            features: self.features,
            error_code_map: self.error_code_map,
        }
    }
}
