//! Inbound request helpers: request IDs and the decoded path.
//!
//! Every inbound request gets an `x-request-id` (kept if the client sent one),
//! which is forwarded upstream and echoed on the response.

use std::borrow::Cow;

use axum::http::{HeaderName, Request};
use percent_encoding::percent_decode_str;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::error::ProxyError;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// The request ID set by the layer, or "unknown".
pub fn request_id<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Percent-decode a request path for route matching.
///
/// `/%61dmin` and `/admin` reach the same route.
pub fn decoded_path(path: &str) -> Result<Cow<'_, str>, ProxyError> {
    percent_decode_str(path)
        .decode_utf8()
        .map_err(|_| ProxyError::InvalidPath {
            path: path.to_string(),
        })
}
