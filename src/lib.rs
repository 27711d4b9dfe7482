//! A transport-agnostic AWS SigV4/SigV4a signing, credential-resolution, and
//! request/response core.
//!
//! This crate is the signing and protocol plumbing an AWS-style SDK service
//! client sits on top of: it never opens a socket itself (`transport.rs`)
//! and never generates per-service shape bindings (`shape.rs`); both are
//! the caller's responsibility. What it owns is everything in between:
//! credential resolution and rotation, SigV4/SigV4a signing (including the
//! `aws-chunked` streaming transport), and protocol-polymorphic request
//! encoding and response decoding across AwsJson, RestJson, RestXml, Query,
//! and Ec2Query.

pub mod body;
pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod protocol;
pub mod shape;
pub mod signer;
pub mod streaming;
pub mod transport;

pub use body::Body;
pub use config::{FeatureFlags, Protocol, ServiceConfig, ServiceConfigBuilder};
pub use credentials::{Credential, CredentialsProvider, ExpiringCredential};
pub use dispatch::{Dispatcher, SigningMode};
pub use error::{SdkError, ServiceError, ServiceErrorKind, TransportError};
pub use http::{Headers, HttpRequest, HttpResponse, Method};
pub use shape::{DecodableShape, EncodableShape, ShapeOptions, ValidationError};
pub use signer::{Algorithm, Signer, SigningError};
pub use transport::HttpTransport;
