//! The HTTP transport contract.
//!
//! The core never opens a socket itself. Transport, pooling, TLS, and
//! timeouts are a caller-supplied collaborator, the same boundary
//! `aws-sdk-s3` draws around its own HTTP client: it configures one,
//! it doesn't write one.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

/// Implemented by the caller's HTTP client. The core's dispatch
/// orchestrator (`dispatch.rs`) is the only thing that calls this.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(
        &self,
        request: HttpRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError>;

    async fn shutdown(&self) {}
}
