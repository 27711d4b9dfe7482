//! Orchestrates one request end-to-end: credential fetch, signing, encode,
//! transport send, decode. No retry or backoff lives here;
//! every error from an inner subsystem surfaces to the caller unmodified.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;

use crate::body::Body;
use crate::config::ServiceConfig;
use crate::credentials::RotatingCredentialsCache;
use crate::error::SdkError;
use crate::http::Method;
use crate::protocol::{RequestEncoder, ResponseDecoder};
use crate::shape::{DecodableShape, EncodableShape};
use crate::signer::{BodyDescriptor, ChunkedSigningData, Signer};
use crate::streaming::ChunkStream;
use crate::transport::HttpTransport;

/// Which signing algorithm a dispatcher uses for every call it makes.
/// A service binds to one or the other at construction; it
/// never switches per-call.
pub enum SigningMode {
    V4,
    V4a(Vec<String>),
}

/// Ties together the credential cache, signer, protocol encode/decode, and
/// an injected transport for one service. Built once per service client and
/// shared for its lifetime, holding one `ServiceConfig` and one transport.
pub struct Dispatcher {
    config: ServiceConfig,
    credentials: RotatingCredentialsCache,
    transport: Arc<dyn HttpTransport>,
    signing_mode: SigningMode,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        config: ServiceConfig,
        credentials: RotatingCredentialsCache,
        transport: Arc<dyn HttpTransport>,
        signing_mode: SigningMode,
        timeout: Duration,
    ) -> Self {
        Self {
            config,
            credentials,
            transport,
            signing_mode,
            timeout,
        }
    }

    fn build_signer(&self, credential: crate::credentials::Credential) -> Signer {
        match &self.signing_mode {
            SigningMode::V4 => Signer::new_v4(credential, self.config.region.clone(), self.config.signing_name.clone()),
            SigningMode::V4a(region_set) => {
                Signer::new_v4a(credential, region_set.clone(), self.config.signing_name.clone())
            }
        }
    }

    /// Execute one operation call.
    pub async fn call<S, T>(
        &self,
        shape: &S,
        operation_name: &str,
        http_method: Method,
        uri_pattern: &str,
        payload: Option<Body>,
    ) -> Result<T, SdkError>
    where
        S: EncodableShape,
        T: DecodableShape,
    {
        let expiring = self.credentials.fetch().await?;
        let signer = self.build_signer(expiring.credential.clone());

        let options = shape.options();
        let encoder = RequestEncoder::new(&self.config);
        let mut request = encoder.encode(shape, operation_name, http_method, uri_pattern, payload)?;

        let use_chunked_signing = self.config.signing_name == "s3"
            && options.allow_chunked_streaming
            && request.body.is_streaming()
            && request.body.length().is_some()
            && !self.config.features.s3_disable_chunked_uploads;

        let date = Utc::now();

        if use_chunked_signing {
            let body_length = request.body.length().expect("checked by use_chunked_signing above");
            request.headers.insert("x-amz-decoded-content-length", body_length.to_string());
            request.headers.insert("content-encoding", "aws-chunked");
            request
                .headers
                .insert("content-length", ChunkedSigningData::encoded_content_length(body_length).to_string());

            let (signed_headers, signing_data) =
                signer.start_signing_chunks(&request.url, http_method.as_str(), &request.headers, date)?;
            request.headers = signed_headers;

            let source = request.body.into_stream();
            request.body = Body::streaming(ChunkStream::new(source, signing_data).boxed(), None);
        } else {
            let body_descriptor = match request.body.as_bytes() {
                Some(bytes) if bytes.is_empty() => BodyDescriptor::Empty,
                Some(bytes) => BodyDescriptor::Bytes(bytes),
                None => BodyDescriptor::UnsignedPayload,
            };
            let signed_headers =
                signer.sign_headers(&request.url, http_method.as_str(), &request.headers, body_descriptor, false, date)?;
            request.headers = signed_headers;
        }

        let response = self.transport.send(request, self.timeout).await?;
        let decoder = ResponseDecoder::new(&self.config);
        decoder.decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Protocol, ServiceConfigBuilder};
    use crate::credentials::{Credential, StaticProvider};
    use crate::http::{HttpRequest, HttpResponse, Headers};
    use crate::protocol::xml::XmlElement;
    use crate::protocol::DecodeError;
    use crate::shape::{DecodableShape, ShapeOptions, ValidationError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Ping;
    impl EncodableShape for Ping {
        fn xml_root_node_name(&self) -> &str {
            "Ping"
        }
        fn options(&self) -> ShapeOptions {
            ShapeOptions::default()
        }
    }

    struct Pong;
    impl DecodableShape for Pong {
        fn xml_root_node_name() -> &'static str {
            "Pong"
        }
        fn from_json(_value: serde_json::Value) -> Result<Self, DecodeError> {
            Ok(Pong)
        }
        fn from_xml(_element: &XmlElement) -> Result<Self, DecodeError> {
            Ok(Pong)
        }
    }

    struct RecordingTransport {
        last_request: Mutex<Option<(String, Option<String>)>>,
    }

    #[async_trait]
    impl HttpTransport for RecordingTransport {
        async fn send(&self, request: HttpRequest, _timeout: Duration) -> Result<HttpResponse, crate::error::TransportError> {
            *self.last_request.lock().unwrap() =
                Some((request.url.clone(), request.headers.get("authorization").map(|s| s.to_string())));
            Ok(HttpResponse {
                status: 200,
                headers: Headers::new(),
                body: Body::empty(),
            })
        }
    }

    fn test_dispatcher(transport: Arc<RecordingTransport>) -> Dispatcher {
        let config = ServiceConfigBuilder::new(Protocol::RestJson)
            .endpoint("https://example.amazonaws.com")
            .region("us-east-1")
            .signing_name("example")
            .build();
        let provider = Arc::new(StaticProvider::new(Credential::new("AKID", "secret", None)));
        let credentials = RotatingCredentialsCache::new(provider);
        Dispatcher::new(config, credentials, transport, SigningMode::V4, Duration::from_secs(30))
    }

    #[tokio::test]
    async fn successful_call_signs_and_decodes() {
        let transport = Arc::new(RecordingTransport { last_request: Mutex::new(None) });
        let dispatcher = test_dispatcher(transport.clone());

        let result: Pong = dispatcher.call(&Ping, "Ping", Method::Post, "/", None).await.unwrap();
        let _ = result;

        let recorded = transport.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(recorded.0, "https://example.amazonaws.com/");
        assert!(recorded.1.unwrap().starts_with("AWS4-HMAC-SHA256 Credential=AKID/"));
    }

    struct FailingTransport;
    #[async_trait]
    impl HttpTransport for FailingTransport {
        async fn send(&self, _request: HttpRequest, _timeout: Duration) -> Result<HttpResponse, crate::error::TransportError> {
            Err(crate::error::TransportError::new("connection refused"))
        }
    }

    #[tokio::test]
    async fn transport_errors_propagate_unmodified() {
        let config = ServiceConfigBuilder::new(Protocol::RestJson)
            .endpoint("https://example.amazonaws.com")
            .region("us-east-1")
            .signing_name("example")
            .build();
        let provider = Arc::new(StaticProvider::new(Credential::new("AKID", "secret", None)));
        let credentials = RotatingCredentialsCache::new(provider);
        let dispatcher = Dispatcher::new(
            config,
            credentials,
            Arc::new(FailingTransport),
            SigningMode::V4,
            Duration::from_secs(30),
        );

        let err = dispatcher.call::<_, Pong>(&Ping, "Ping", Method::Post, "/", None).await;
        assert!(matches!(err, Err(SdkError::Transport(_))));
    }

    struct ValidationFailingShape;
    impl EncodableShape for ValidationFailingShape {
        fn xml_root_node_name(&self) -> &str {
            "Bad"
        }
        fn validate(&self) -> Result<(), ValidationError> {
            Err(ValidationError("always invalid".to_string()))
        }
    }

    #[tokio::test]
    async fn validation_failure_never_reaches_the_transport() {
        let transport = Arc::new(RecordingTransport { last_request: Mutex::new(None) });
        let dispatcher = test_dispatcher(transport.clone());

        let err = dispatcher
            .call::<_, Pong>(&ValidationFailingShape, "Bad", Method::Post, "/", None)
            .await;
        assert!(err.is_err());
        assert!(transport.last_request.lock().unwrap().is_none());
    }
}
