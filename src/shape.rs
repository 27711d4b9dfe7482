//! The encodable/decodable shape contract.
//!
//! Per-service shape bindings are code-generated and explicitly out of
//! scope; this core only needs the polymorphic seam between a concrete
//! generated type and the protocol encoder/decoder, so it is modeled as a
//! trait rather than a concrete type.

use thiserror::Error;

/// Per-shape options consulted by the request encoder.
#[derive(Debug, Clone, Default)]
pub struct ShapeOptions {
    pub checksum_required: bool,
    pub checksum_header: bool,
    pub md5_checksum_header: bool,
    pub allow_streaming: bool,
    pub allow_chunked_streaming: bool,
    pub raw_payload: bool,
}

#[derive(Debug, Error)]
#[error("shape validation failed: {0}")]
pub struct ValidationError(pub String);

/// A typed operation input the encoder can turn into a request body.
pub trait EncodableShape {
    fn options(&self) -> ShapeOptions {
        ShapeOptions::default()
    }

    fn xml_root_node_name(&self) -> &str;

    fn xml_namespace(&self) -> Option<&str> {
        None
    }

    /// Total validation hook. Implementations that
    /// have nothing to validate simply return `Ok(())`.
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Path parameters to substitute into the operation's path template.
    fn path_params(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Query parameters to append to the request URL.
    fn query_params(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Serialize to the protocol-appropriate wire representation. The
    /// concrete bytes depend on the encoder's chosen protocol; shapes
    /// provide a `serde_json::Value` for JSON protocols and an XML element
    /// tree for XML protocols via the two methods below.
    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({})
    }

    fn to_query_pairs(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// The XML element tree for `RestXml` bodies. Default is an empty
    /// element named `xml_root_node_name()`, for operations with no body.
    fn to_xml(&self) -> crate::protocol::xml::XmlElement {
        crate::protocol::xml::XmlElement::new(self.xml_root_node_name())
    }
}

/// A typed operation output the decoder can populate from a response.
pub trait DecodableShape: Sized {
    fn xml_root_node_name() -> &'static str;

    fn from_json(value: serde_json::Value) -> Result<Self, crate::protocol::DecodeError>;

    fn from_xml(element: &crate::protocol::xml::XmlElement) -> Result<Self, crate::protocol::DecodeError>;
}
