//! Form-encoded body construction for the `Query` and `Ec2Query` protocols
//!: `Action=...&Version=...&<shape fields>`, sorted and
//! percent-encoded the same way the signer canonicalizes a query string.

use crate::shape::EncodableShape;

pub fn build_query_body(shape: &dyn EncodableShape, action: &str, api_version: &str) -> String {
    let mut pairs = vec![("Action".to_string(), action.to_string()), ("Version".to_string(), api_version.to_string())];
    pairs.extend(shape.to_query_pairs());

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in &pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::ShapeOptions;

    struct TestShape;
    impl EncodableShape for TestShape {
        fn xml_root_node_name(&self) -> &str {
            "TestShape"
        }
        fn options(&self) -> ShapeOptions {
            ShapeOptions::default()
        }
        fn to_query_pairs(&self) -> Vec<(String, String)> {
            vec![("BucketName".to_string(), "my bucket".to_string())]
        }
    }

    #[test]
    fn includes_action_version_and_shape_fields() {
        let body = build_query_body(&TestShape, "CreateBucket", "2006-03-01");
        assert!(body.contains("Action=CreateBucket"));
        assert!(body.contains("Version=2006-03-01"));
        assert!(body.contains("BucketName=my+bucket"));
    }
}
