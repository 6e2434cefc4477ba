//! Allowed-hosts check.
//!
//! Requests whose `Host` header does not match the configured allow list are
//! rejected with 400 before reaching any handler.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::{app::AppState, error::AppError};

/// Strip the port from a `Host` value and lowercase it.
///
/// Bracketed IPv6 literals keep their brackets.
pub fn host_without_port(host: &str) -> String {
    let host = host.trim();
    let bare = if host.starts_with('[') {
        match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        }
    } else {
        host.rsplit_once(':').map_or(host, |(name, _)| name)
    };
    bare.trim_end_matches('.').to_ascii_lowercase()
}

/// Whether `host` matches one of the `allowed` patterns.
///
/// `*` matches anything; `.example.com` matches `example.com` and every
/// subdomain; anything else must match exactly.
pub fn is_host_allowed(host: &str, allowed: &[String]) -> bool {
    let host = host_without_port(host);
    if host.is_empty() {
        return false;
    }
    allowed.iter().any(|pattern| {
        let pattern = pattern.to_ascii_lowercase();
        if pattern == "*" {
            true
        } else if let Some(domain) = pattern.strip_prefix('.') {
            host == domain || host.ends_with(&pattern)
        } else {
            host == pattern
        }
    })
}

pub async fn allowed_hosts_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| request.uri().host())
        .unwrap_or_default();

    if !is_host_allowed(host, &state.settings.allowed_hosts) {
        tracing::warn!(host, "rejected request for disallowed host");
        return Err(AppError::DisallowedHost);
    }

    Ok(next.run(request).await)
}
