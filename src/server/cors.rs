//! Origin allow-list for browser clients.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
const ALLOWED_HEADERS: &str = "content-type";
const MAX_AGE_SECS: &str = "600";

#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
    origins: Arc<Vec<String>>,
}

impl CorsPolicy {
    pub fn new(origins: Vec<String>) -> Self {
        Self {
            origins: Arc::new(origins),
        }
    }

    pub fn allows(&self, origin: &str) -> bool {
        self.origins
            .iter()
            .any(|allowed| allowed == "*" || allowed.eq_ignore_ascii_case(origin))
    }
}

/// Answer preflights and tag responses for allowed origins.
///
/// Requests without an `Origin` header pass through untouched.
pub async fn cors_middleware(policy: CorsPolicy, request: Request, next: Next) -> Response {
    let Some(origin) = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
    else {
        return next.run(request).await;
    };
    let allowed = policy.allows(&origin);

    if request.method() == Method::OPTIONS {
        if !allowed {
            debug!(origin = %origin, "Preflight from origin not in allow-list");
            return status_only(StatusCode::FORBIDDEN);
        }
        let mut response = status_only(StatusCode::NO_CONTENT);
        let headers = response.headers_mut();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(MAX_AGE_SECS),
        );
        return with_origin(response, &origin);
    }

    let response = next.run(request).await;
    if allowed {
        with_origin(response, &origin)
    } else {
        response
    }
}

fn status_only(status: StatusCode) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

fn with_origin(mut response: Response, origin: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(origin) {
        let headers = response.headers_mut();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        headers.insert(header::VARY, HeaderValue::from_static("Origin"));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_matches_exact_origin_or_wildcard() {
        let policy = CorsPolicy::new(vec!["http://localhost:5173".to_string()]);
        assert!(policy.allows("http://localhost:5173"));
        assert!(!policy.allows("http://evil.example"));
        assert!(CorsPolicy::new(vec!["*".to_string()]).allows("http://anything"));
        assert!(!CorsPolicy::default().allows("http://localhost:5173"));
    }
}
