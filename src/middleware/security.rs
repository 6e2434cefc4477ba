//! HTTPS redirect and security response headers.

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{app::AppState, config::SecuritySettings};

/// Headers added to every response, derived from the security settings.
pub fn security_headers(settings: &SecuritySettings) -> Vec<(HeaderName, HeaderValue)> {
    let mut headers = vec![(
        header::X_FRAME_OPTIONS,
        HeaderValue::from_static(settings.x_frame_options),
    )];

    if settings.content_type_nosniff {
        headers.push((
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ));
    }

    if let Some(seconds) = settings.hsts_seconds {
        let mut value = format!("max-age={seconds}");
        if settings.hsts_include_subdomains {
            value.push_str("; includeSubDomains");
        }
        if settings.hsts_preload {
            value.push_str("; preload");
        }
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.push((header::STRICT_TRANSPORT_SECURITY, value));
        }
    }

    headers.push((
        header::REFERRER_POLICY,
        HeaderValue::from_static("same-origin"),
    ));

    headers
}

/// Whether the request reached the proxy over HTTPS.
fn is_secure(request: &Request) -> bool {
    request.uri().scheme_str() == Some("https")
        || request
            .headers()
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.split(',').next().unwrap_or_default().trim() == "https")
}

/// Redirect plain-HTTP requests to HTTPS when `ssl_redirect` is enabled.
pub async fn ssl_redirect_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.settings.security.ssl_redirect || is_secure(&request) {
        return next.run(request).await;
    }

    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();
    let path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    match HeaderValue::from_str(&format!("https://{host}{path}")) {
        Ok(location) => (
            StatusCode::MOVED_PERMANENTLY,
            [(header::LOCATION, location)],
        )
            .into_response(),
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}
