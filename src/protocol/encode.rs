//! Request construction: turn a typed shape into an unsigned `HttpRequest`.
//! Signing is a separate step (`signer::Signer`); this only
//! builds the URL, headers, and body.

use crate::body::Body;
use crate::config::{Protocol, ServiceConfig};
use crate::http::{Headers, HttpRequest, Method};
use crate::shape::{EncodableShape, ValidationError};
use crate::signer::canonical::uri_encode;

use super::checksum::ChecksumAlgorithm;
use super::json::encode_json_body;
use super::query::build_query_body;

fn substitute_path_params(template: &str, params: &[(String, String)]) -> String {
    let mut path = template.to_string();
    for (name, value) in params {
        let placeholder = format!("{{{name}}}");
        path = path.replace(&placeholder, &uri_encode(value, false));
    }
    path
}

fn append_query_params(url: String, params: &[(String, String)]) -> String {
    if params.is_empty() {
        return url;
    }
    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", uri_encode(k, true), uri_encode(v, true)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{url}?{query}")
}

/// Builds requests for one service, given its `ServiceConfig`.
pub struct RequestEncoder<'a> {
    config: &'a ServiceConfig,
}

impl<'a> RequestEncoder<'a> {
    pub fn new(config: &'a ServiceConfig) -> Self {
        Self { config }
    }

    /// Encode one operation call into an `HttpRequest`.
    ///
    /// `payload` overrides the shape-derived body when
    /// `shape.options().raw_payload` is set (streaming uploads whose
    /// content isn't part of the shape's own fields, e.g. S3 `PutObject`).
    pub fn encode(
        &self,
        shape: &dyn EncodableShape,
        operation_name: &str,
        http_method: Method,
        uri_pattern: &str,
        payload: Option<Body>,
    ) -> Result<HttpRequest, ValidationError> {
        shape.validate()?;
        let options = shape.options();

        let path = substitute_path_params(uri_pattern, &shape.path_params());
        let mut headers = Headers::new();

        let body = if options.raw_payload {
            payload.unwrap_or_else(Body::empty)
        } else {
            match self.config.protocol {
                Protocol::AwsJson | Protocol::RestJson => Body::from(encode_json_body(shape)),
                Protocol::RestXml => {
                    let xml = shape
                        .to_xml()
                        .to_xml_string()
                        .map_err(|e| ValidationError(e.to_string()))?;
                    Body::from(xml)
                }
                Protocol::Query | Protocol::Ec2Query => {
                    Body::from(build_query_body(shape, operation_name, &self.config.api_version))
                }
            }
        };

        if !options.raw_payload {
            if let Some(content_type) = self.config.protocol.default_content_type() {
                headers.insert("content-type", content_type);
            }
        }

        if self.config.protocol == Protocol::AwsJson {
            if let Some(prefix) = &self.config.amz_target_prefix {
                headers.insert("x-amz-target", format!("{prefix}.{operation_name}"));
            }
        }

        if options.checksum_required {
            if let Some(bytes) = body.as_bytes() {
                let algorithm = ChecksumAlgorithm::Sha256;
                headers.insert(algorithm.header_name(), algorithm.compute(bytes));
            }
        }
        if options.md5_checksum_header || self.config.features.calculate_md5 {
            if let Some(bytes) = body.as_bytes() {
                headers.insert(ChecksumAlgorithm::Md5.header_name(), ChecksumAlgorithm::Md5.compute(bytes));
            }
        }

        let url = format!("{}{}", self.config.endpoint.trim_end_matches('/'), path);
        let url = append_query_params(url, &shape.query_params());

        Ok(HttpRequest {
            url,
            method: http_method,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfigBuilder;
    use crate::shape::ShapeOptions;

    struct CreateBucket {
        name: String,
    }

    impl EncodableShape for CreateBucket {
        fn xml_root_node_name(&self) -> &str {
            "CreateBucketConfiguration"
        }

        fn path_params(&self) -> Vec<(String, String)> {
            vec![("bucket".to_string(), self.name.clone())]
        }

        fn to_json(&self) -> serde_json::Value {
            serde_json::json!({ "Bucket": self.name })
        }

        fn options(&self) -> ShapeOptions {
            ShapeOptions::default()
        }
    }

    fn json_config() -> ServiceConfig {
        ServiceConfigBuilder::new(Protocol::RestJson)
            .endpoint("https://example.amazonaws.com")
            .region("us-east-1")
            .signing_name("example")
            .build()
    }

    #[test]
    fn substitutes_path_params() {
        let config = json_config();
        let encoder = RequestEncoder::new(&config);
        let shape = CreateBucket { name: "my bucket".to_string() };
        let request = encoder
            .encode(&shape, "CreateBucket", Method::Put, "/{bucket}", None)
            .unwrap();
        assert_eq!(request.url, "https://example.amazonaws.com/my%20bucket");
    }

    #[test]
    fn json_protocol_sets_content_type_and_body() {
        let config = json_config();
        let encoder = RequestEncoder::new(&config);
        let shape = CreateBucket { name: "b".to_string() };
        let request = encoder.encode(&shape, "CreateBucket", Method::Put, "/{bucket}", None).unwrap();
        assert_eq!(request.headers.get("content-type"), Some("application/json"));
        assert!(matches!(request.body, Body::Bytes(_)));
    }

    #[test]
    fn raw_payload_uses_the_supplied_body_unmodified() {
        let config = json_config();
        let encoder = RequestEncoder::new(&config);
        struct RawShape;
        impl EncodableShape for RawShape {
            fn xml_root_node_name(&self) -> &str {
                "Object"
            }
            fn options(&self) -> ShapeOptions {
                ShapeOptions {
                    raw_payload: true,
                    ..ShapeOptions::default()
                }
            }
        }
        let request = encoder
            .encode(&RawShape, "PutObject", Method::Put, "/obj", Some(Body::from(b"payload".to_vec())))
            .unwrap();
        assert_eq!(request.body.as_bytes().unwrap().as_ref(), b"payload");
        assert!(!request.headers.contains("content-type"));
    }
}
