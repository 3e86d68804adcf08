//! Cross-origin allow-list.
//!
//! Requests without an `Origin` header (curl, server-to-server) pass; browser
//! origins must mention `github.io` or `localhost`. Anything else is answered
//! with 403 before routing.

use axum::{
    extract::Request,
    http::{HeaderValue, Method, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

use crate::error::AppError;

const ALLOWED_ORIGIN_MARKERS: [&str; 2] = ["github.io", "localhost"];

pub fn origin_allowed(origin: Option<&str>) -> bool {
    match origin {
        None => true,
        Some(origin) => ALLOWED_ORIGIN_MARKERS
            .iter()
            .any(|marker| origin.contains(marker)),
    }
}

fn header_allowed(origin: &HeaderValue) -> bool {
    origin
        .to_str()
        .map(|o| origin_allowed(Some(o)))
        .unwrap_or(false)
}

pub async fn reject_foreign_origin(request: Request, next: Next) -> Response {
    if let Some(origin) = request.headers().get(header::ORIGIN) {
        if !header_allowed(origin) {
            tracing::warn!(
                origin = ?origin,
                method = %request.method(),
                uri = %request.uri(),
                "cross-origin request rejected"
            );
            return AppError::OriginRejected.into_response();
        }
    }
    next.run(request).await
}

/// CORS response headers for origins that passed the allow-list.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            |origin: &HeaderValue, _parts: &Parts| header_allowed(origin),
        ))
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(AllowHeaders::mirror_request())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_origin_is_allowed() {
        assert!(origin_allowed(None));
    }

    #[test]
    fn github_pages_and_localhost_are_allowed() {
        assert!(origin_allowed(Some("https://ferris.github.io")));
        assert!(origin_allowed(Some("http://localhost:5173")));
        assert!(origin_allowed(Some("http://127.0.0.1.localhost")));
    }

    #[test]
    fn other_origins_are_rejected() {
        assert!(!origin_allowed(Some("https://example.com")));
        assert!(!origin_allowed(Some("http://127.0.0.1:5173")));
        assert!(!origin_allowed(Some("")));
    }

    #[test]
    fn non_utf8_origin_header_is_rejected() {
        let value = HeaderValue::from_bytes(b"http://\xfflocalhost").unwrap();
        assert!(!header_allowed(&value));
    }
}
