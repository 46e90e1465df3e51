//! Request-path errors and their HTTP status mapping.

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Challenge sent with every 401.
pub const BASIC_CHALLENGE: &str = r#"Basic realm="Restricted""#;

/// Errors a single proxied request can end in.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Request path is not valid percent-encoded UTF-8: {path}")]
    InvalidPath { path: String },

    #[error("No route found for path: {path}")]
    NoRoute { path: String },

    #[error("Missing or invalid credentials")]
    Unauthorized,

    #[error("Rate limit exceeded for client {client}")]
    RateLimited { client: String },

    #[error("Invalid target {target}: {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("Upstream {target} failed: {message}")]
    Upstream { target: String, message: String },
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidPath { .. } => StatusCode::BAD_REQUEST,
            ProxyError::NoRoute { .. } => StatusCode::NOT_FOUND,
            ProxyError::Unauthorized => StatusCode::UNAUTHORIZED,
            ProxyError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ProxyError::InvalidTarget { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    fn client_message(&self) -> &'static str {
        match self {
            ProxyError::InvalidPath { .. } => "Invalid request path",
            ProxyError::NoRoute { .. } => "No matching route found",
            ProxyError::Unauthorized => "Unauthorized",
            ProxyError::RateLimited { .. } => "Rate limit exceeded",
            ProxyError::InvalidTarget { .. } => "Invalid target URL",
            ProxyError::Upstream { .. } => "Upstream request failed",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.client_message()));
        *response.status_mut() = self.status();
        if let ProxyError::Unauthorized = self {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(BASIC_CHALLENGE),
            );
        }
        response
    }
}
