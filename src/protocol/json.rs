//! JSON body encode/decode for the `AwsJson` and `RestJson` protocols.

use crate::shape::EncodableShape;

use super::DecodeError;

pub fn encode_json_body(shape: &dyn EncodableShape) -> Vec<u8> {
    serde_json::to_vec(&shape.to_json()).expect("serde_json::Value always serializes")
}

pub fn parse_json_body(bytes: &[u8]) -> Result<serde_json::Value, DecodeError> {
    if bytes.is_empty() {
        return Ok(serde_json::json!({}));
    }
    serde_json::from_slice(bytes).map_err(|e| DecodeError::Json(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_decodes_as_empty_object() {
        assert_eq!(parse_json_body(b"").unwrap(), serde_json::json!({}));
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(parse_json_body(b"{not json").is_err());
    }
}
