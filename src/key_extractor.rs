//! Client key derivation for rate limiting.

use axum::extract::{ConnectInfo, Request};
use axum::http::HeaderName;
use std::net::SocketAddr;

/// Key used when a request carries no usable client identity.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Derives the partition key a request is charged against.
///
/// Order: the trusted forwarded-client header (only when one is configured),
/// then the connection's remote IP, then [`UNKNOWN_CLIENT`]. The header value
/// is taken as-is with no IP validation, so only configure a header that a
/// proxy in front of the service overwrites.
#[derive(Debug, Clone, Default)]
pub struct ClientKeyExtractor {
    trusted_header: Option<HeaderName>,
}

impl ClientKeyExtractor {
    pub fn new(trusted_header: Option<HeaderName>) -> Self {
        Self { trusted_header }
    }

    pub fn trusted_header(&self) -> Option<&HeaderName> {
        self.trusted_header.as_ref()
    }

    pub fn extract(&self, request: &Request) -> String {
        if let Some(key) = self.from_trusted_header(request) {
            return key;
        }

        if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
            return addr.ip().to_string();
        }

        UNKNOWN_CLIENT.to_string()
    }

    fn from_trusted_header(&self, request: &Request) -> Option<String> {
        let name = self.trusted_header.as_ref()?;
        let value = request.headers().get(name)?.to_str().ok()?.trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }
}
