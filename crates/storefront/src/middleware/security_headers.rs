//! Response headers sent with every storefront page.
//!
//! Pages are plain server-rendered HTML with same-origin forms, a local
//! stylesheet and product images that may be hosted on any HTTPS host.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue, header::CACHE_CONTROL},
    middleware::Next,
    response::Response,
};

/// No scripts at all; styles and fonts from `/static`.
const CONTENT_POLICY: &str = "default-src 'none'; \
    style-src 'self'; \
    font-src 'self'; \
    img-src 'self' https: data:; \
    form-action 'self'; \
    base-uri 'self'; \
    frame-ancestors 'none'";

/// Browser features the shop never asks for.
const PERMISSIONS_POLICY: &str =
    "camera=(), microphone=(), geolocation=(), payment=(), usb=(), interest-cohort=()";

/// Pages carry the cart badge and flash messages.
const PAGE_CACHE: &str = "no-store";

/// Stylesheets and images under `/static`.
const STATIC_CACHE: &str = "public, max-age=3600";

const FIXED_HEADERS: [(&str, &str); 5] = [
    ("x-frame-options", "DENY"),
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "same-origin"),
    ("content-security-policy", CONTENT_POLICY),
    ("permissions-policy", PERMISSIONS_POLICY),
];

/// Add the shop's security and caching headers to a response.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let is_static = request.uri().path().starts_with("/static/");
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    for (name, value) in FIXED_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }

    let cache = if is_static { STATIC_CACHE } else { PAGE_CACHE };
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(cache));

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::header::{CONTENT_SECURITY_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS};
    use axum::{Router, body::Body, routing::get};
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .route("/static/css/main.css", get(|| async { "body {}" }))
            .layer(axum::middleware::from_fn(security_headers_middleware))
    }

    async fn headers_for(path: &str) -> axum::http::HeaderMap {
        app()
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .headers()
            .clone()
    }

    #[tokio::test]
    async fn test_page_headers() {
        let headers = headers_for("/").await;
        assert_eq!(headers[X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers[X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[CACHE_CONTROL], "no-store");

        let csp = headers[CONTENT_SECURITY_POLICY].to_str().unwrap();
        assert!(csp.contains("img-src 'self' https: data:"));
        assert!(csp.contains("form-action 'self'"));
        assert!(!csp.contains("script-src"));
    }

    #[tokio::test]
    async fn test_static_assets_are_cacheable() {
        let headers = headers_for("/static/css/main.css").await;
        assert_eq!(headers[CACHE_CONTROL], "public, max-age=3600");
        assert_eq!(headers[X_CONTENT_TYPE_OPTIONS], "nosniff");
    }
}
