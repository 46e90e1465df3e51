//! Relay of a dispatched request to its chosen target.
//!
//! # Responsibilities
//! - Point the request at the target's scheme and authority
//! - Apply the route's path rewrite, keeping the query untouched
//! - Stream the upstream response back without buffering
//!
//! # Design Decisions
//! - No retries: a failed relay is a 502, health checks steer later traffic
//! - No deadline beyond the caller's connection; dropping the handler
//!   future abandons the upstream call

use std::net::IpAddr;

use axum::{
    body::Body,
    http::{header, HeaderValue, Request, Response, Uri, Version},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use url::Url;

use crate::config::schema::Route;
use crate::error::ProxyError;
use crate::http::request::decoded_path;
use crate::security::headers::{append_forwarded_for, strip_hop_by_hop};

/// HTTP client shared by the forwarder and the health monitor.
pub type UpstreamClient = Client<HttpConnector, Body>;

pub fn upstream_client() -> UpstreamClient {
    Client::builder(TokioExecutor::new()).build(HttpConnector::new())
}

/// Scheme and authority of a target URL. Any path on the target is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetBase {
    pub scheme: String,
    pub authority: String,
}

impl TargetBase {
    pub fn parse(target: &str) -> Result<Self, ProxyError> {
        let invalid = |reason: String| ProxyError::InvalidTarget {
            target: target.to_string(),
            reason,
        };

        let url = Url::parse(target).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("missing host".to_string()))?;

        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(Self {
            scheme: url.scheme().to_string(),
            authority,
        })
    }
}

/// Replace the route's matched prefix with its rewrite, once.
///
/// A slash on both sides of the seam collapses to one, and the result always
/// starts with `/`. Without a rewrite the path is returned verbatim.
pub fn rewrite_path(path: &str, route: &Route) -> String {
    let Some(rewrite) = route.rewrite_prefix() else {
        return path.to_string();
    };
    let Some(rest) = path.strip_prefix(route.path.as_str()) else {
        return path.to_string();
    };

    let joined = match (rewrite.ends_with('/'), rest.strip_prefix('/')) {
        (true, Some(tail)) => format!("{}{}", rewrite, tail),
        _ => format!("{}{}", rewrite, rest),
    };

    if joined.starts_with('/') {
        joined
    } else {
        format!("/{}", joined)
    }
}

/// Bytes escaped when a rewritten path goes back on the wire.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// The path sent upstream for a raw inbound path.
///
/// The rewrite is applied to the decoded path (the one the route matched)
/// and the result re-encoded. Without a rewrite the raw path goes out as-is.
pub fn outbound_path(raw: &str, route: &Route) -> String {
    if route.rewrite_prefix().is_none() {
        return raw.to_string();
    }
    match decoded_path(raw) {
        Ok(path) if path.starts_with(route.path.as_str()) => {
            utf8_percent_encode(&rewrite_path(&path, route), PATH).to_string()
        }
        _ => raw.to_string(),
    }
}

#[derive(Clone)]
pub struct Forwarder {
    client: UpstreamClient,
}

impl Forwarder {
    pub fn new() -> Self {
        Self {
            client: upstream_client(),
        }
    }

    /// Build the outbound request for `target` without sending it.
    pub fn prepare(
        target: &str,
        route: &Route,
        request: Request<Body>,
        client_ip: Option<IpAddr>,
    ) -> Result<Request<Body>, ProxyError> {
        let base = TargetBase::parse(target)?;
        let (mut parts, body) = request.into_parts();

        let path = outbound_path(parts.uri.path(), route);
        let path_and_query = match parts.uri.query() {
            Some(query) => format!("{}?{}", path, query),
            None => path,
        };

        parts.uri = Uri::builder()
            .scheme(base.scheme.as_str())
            .authority(base.authority.as_str())
            .path_and_query(path_and_query)
            .build()
            .map_err(|e| ProxyError::InvalidTarget {
                target: target.to_string(),
                reason: e.to_string(),
            })?;
        parts.version = Version::HTTP_11;

        strip_hop_by_hop(&mut parts.headers);
        if let Ok(host) = HeaderValue::from_str(&base.authority) {
            parts.headers.insert(header::HOST, host);
        }
        if let Some(ip) = client_ip {
            append_forwarded_for(&mut parts.headers, ip);
        }

        Ok(Request::from_parts(parts, body))
    }

    /// Relay `request` to `target`, streaming the response back.
    pub async fn forward(
        &self,
        target: &str,
        route: &Route,
        request: Request<Body>,
        client_ip: Option<IpAddr>,
    ) -> Result<Response<Body>, ProxyError> {
        let outbound = Self::prepare(target, route, request, client_ip)?;

        tracing::debug!(target = %target, uri = %outbound.uri(), "Forwarding request");

        let response = self
            .client
            .request(outbound)
            .await
            .map_err(|e| ProxyError::Upstream {
                target: target.to_string(),
                message: e.to_string(),
            })?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

impl Default for Forwarder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn test_rewrite_path() {
        let route = Route::to_target("/api", "http://a").with_rewrite("/");
        assert_eq!(rewrite_path("/api/user", &route), "/user");
        assert_eq!(rewrite_path("/api", &route), "/");

        let route = Route::to_target("/api", "http://a").with_rewrite("/v2");
        assert_eq!(rewrite_path("/api/user", &route), "/v2/user");

        let route = Route::to_target("/api/", "http://a").with_rewrite("internal");
        assert_eq!(rewrite_path("/api/user", &route), "/internaluser");
    }

    #[test]
    fn test_rewrite_is_single_substitution() {
        let route = Route::to_target("/api", "http://a").with_rewrite("/");
        assert_eq!(rewrite_path("/api/api/user", &route), "/api/user");
    }

    #[test]
    fn test_no_rewrite_preserves_path() {
        let route = Route::to_target("/api", "http://a");
        assert_eq!(rewrite_path("/api/user", &route), "/api/user");

        let route = Route::to_target("/api", "http://a").with_rewrite("");
        assert_eq!(rewrite_path("/api/user", &route), "/api/user");
    }

    #[test]
    fn test_outbound_path_rewrites_encoded_prefix() {
        let route = Route::to_target("/api", "http://a").with_rewrite("/v2");
        assert_eq!(outbound_path("/%61pi/user", &route), "/v2/user");
        assert_eq!(outbound_path("/api/hello%20world", &route), "/v2/hello%20world");
        assert_eq!(outbound_path("/api/caf%C3%A9", &route), "/v2/caf%C3%A9");
        assert_eq!(outbound_path("/other", &route), "/other");
    }

    #[test]
    fn test_outbound_path_without_rewrite_is_raw() {
        let route = Route::to_target("/api", "http://a");
        assert_eq!(outbound_path("/%61pi/a%2Fb", &route), "/%61pi/a%2Fb");
    }

    #[test]
    fn test_target_base() {
        let base = TargetBase::parse("http://localhost:5001").unwrap();
        assert_eq!(base.scheme, "http");
        assert_eq!(base.authority, "localhost:5001");

        let base = TargetBase::parse("http://example.com/ignored/path").unwrap();
        assert_eq!(base.authority, "example.com");

        assert!(matches!(
            TargetBase::parse("localhost:5001"),
            Err(ProxyError::InvalidTarget { .. })
        ));
        assert!(matches!(
            TargetBase::parse("not a url"),
            Err(ProxyError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn test_prepare_rewrites_and_keeps_query() {
        let route = Route::to_target("/api", "http://127.0.0.1:5001").with_rewrite("/");
        let mut request = get("/api/user?id=7&sort=asc");
        request
            .headers_mut()
            .insert(header::CONNECTION, HeaderValue::from_static("close"));

        let outbound = Forwarder::prepare(
            "http://127.0.0.1:5001",
            &route,
            request,
            Some("10.1.1.1".parse().unwrap()),
        )
        .unwrap();

        assert_eq!(outbound.uri().to_string(), "http://127.0.0.1:5001/user?id=7&sort=asc");
        assert_eq!(outbound.headers().get(header::HOST).unwrap(), "127.0.0.1:5001");
        assert_eq!(outbound.headers().get("x-forwarded-for").unwrap(), "10.1.1.1");
        assert!(outbound.headers().get(header::CONNECTION).is_none());
    }

    #[test]
    fn test_prepare_invalid_target() {
        let route = Route::to_target("/", "::bogus::");
        let err = Forwarder::prepare("::bogus::", &route, get("/x"), None).unwrap_err();
        assert!(matches!(err, ProxyError::InvalidTarget { .. }));
    }

    #[tokio::test]
    async fn test_connection_refused_is_upstream_error() {
        let route = Route::to_target("/", "http://127.0.0.1:9");
        let err = Forwarder::new()
            .forward("http://127.0.0.1:9", &route, get("/x"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Upstream { .. }));
    }
}
