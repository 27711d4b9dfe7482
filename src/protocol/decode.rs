//! Response decoding: JSON/XML body parsing into a typed shape, plus
//! protocol-aware error extraction from a non-2xx response.

use std::collections::HashMap;

use thiserror::Error;

use crate::config::{Protocol, ServiceConfig};
use crate::error::{SdkError, ServiceError, ServiceErrorKind, TransportError};
use crate::http::{Headers, HttpResponse};
use crate::shape::DecodableShape;

use super::json::parse_json_body;
use super::xml::XmlElement;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("JSON decode error: {0}")]
    Json(String),

    #[error("XML decode error: {0}")]
    Xml(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Decodes an `HttpResponse` for one operation, given the protocol and
/// error-code mapping declared in `ServiceConfig`.
pub struct ResponseDecoder<'a> {
    config: &'a ServiceConfig,
}

impl<'a> ResponseDecoder<'a> {
    pub fn new(config: &'a ServiceConfig) -> Self {
        Self { config }
    }

    /// Decode a successful response into `T`, or a `ServiceError` for a
    /// non-2xx status.
    pub async fn decode<T: DecodableShape>(&self, response: HttpResponse) -> Result<T, SdkError> {
        if !response.is_success() {
            return Err(SdkError::Service(self.extract_error(response).await?));
        }

        let body = response.body.collect().await?;
        match self.config.protocol {
            Protocol::AwsJson | Protocol::RestJson => {
                let value = parse_json_body(&body)?;
                T::from_json(value).map_err(SdkError::from)
            }
            Protocol::RestXml | Protocol::Query | Protocol::Ec2Query => {
                let element = if body.is_empty() {
                    XmlElement::new(T::xml_root_node_name())
                } else {
                    XmlElement::parse(&body)?
                };
                T::from_xml(&element).map_err(SdkError::from)
            }
        }
    }

    async fn extract_error(&self, response: HttpResponse) -> Result<ServiceError, SdkError> {
        let status = response.status;
        let headers = response.headers;
        let body = response.body.collect().await?;

        let (code, message, additional_fields) = match self.config.protocol {
            Protocol::AwsJson | Protocol::RestJson => extract_json_error(&body, &headers),
            Protocol::RestXml | Protocol::Query | Protocol::Ec2Query => extract_xml_error(&body)?,
        };

        let extended_type = self.config.error_code_map.get(&code).cloned();

        Ok(ServiceError {
            kind: ServiceErrorKind::from_status(status),
            code,
            message,
            status,
            additional_fields,
            extended_type,
        })
    }
}

fn extract_json_error(body: &[u8], headers: &Headers) -> (String, String, HashMap<String, String>) {
    let value: serde_json::Value = serde_json::from_slice(body).unwrap_or_else(|_| serde_json::json!({}));

    let code = headers
        .get("x-amzn-errortype")
        .map(|s| s.to_string())
        .or_else(|| value.get("__type").and_then(|v| v.as_str()).map(|s| s.to_string()))
        .or_else(|| value.get("code").and_then(|v| v.as_str()).map(|s| s.to_string()))
        .unwrap_or_else(|| "Unknown".to_string());
    // Strip a shape-id namespace prefix ("com.amazonaws.foo#ThrottlingException").
    let code = code.rsplit('#').next().unwrap_or(&code).to_string();

    let message = value
        .get("message")
        .or_else(|| value.get("Message"))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let mut additional_fields = HashMap::new();
    if let Some(object) = value.as_object() {
        for (key, field_value) in object {
            if matches!(key.as_str(), "message" | "Message" | "__type" | "code") {
                continue;
            }
            if let Some(s) = field_value.as_str() {
                additional_fields.insert(key.clone(), s.to_string());
            }
        }
    }

    (code, message, additional_fields)
}

fn extract_xml_error(body: &[u8]) -> Result<(String, String, HashMap<String, String>), DecodeError> {
    if body.is_empty() {
        return Ok(("Unknown".to_string(), String::new(), HashMap::new()));
    }

    let root = XmlElement::parse(body)?;
    let error_element = if root.name == "Error" { &root } else { root.child("Error").unwrap_or(&root) };

    let code = error_element
        .child("Code")
        .map(|c| c.text().to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    let message = error_element.child("Message").map(|c| c.text().to_string()).unwrap_or_default();

    let mut additional_fields = HashMap::new();
    for child in &error_element.children {
        if child.name != "Code" && child.name != "Message" {
            additional_fields.insert(child.name.clone(), child.text().to_string());
        }
    }

    Ok((code, message, additional_fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_json_error_code_and_message() {
        let body = br#"{"__type":"com.amazonaws.example#ValidationException","message":"bad input"}"#;
        let (code, message, _) = extract_json_error(body, &Headers::new());
        assert_eq!(code, "ValidationException");
        assert_eq!(message, "bad input");
    }

    #[test]
    fn header_error_type_takes_precedence_over_body() {
        let mut headers = Headers::new();
        headers.insert("x-amzn-errortype", "ThrottlingException");
        let body = br#"{"message":"slow down"}"#;
        let (code, _, _) = extract_json_error(body, &headers);
        assert_eq!(code, "ThrottlingException");
    }

    #[test]
    fn extracts_xml_error_from_nested_error_element() {
        let body = b"<ErrorResponse><Error><Code>NoSuchBucket</Code><Message>nope</Message></Error></ErrorResponse>";
        let (code, message, _) = extract_xml_error(body).unwrap();
        assert_eq!(code, "NoSuchBucket");
        assert_eq!(message, "nope");
    }

    #[test]
    fn empty_body_yields_unknown_error() {
        let (code, message, fields) = extract_xml_error(b"").unwrap();
        assert_eq!(code, "Unknown");
        assert!(message.is_empty());
        assert!(fields.is_empty());
    }
}
