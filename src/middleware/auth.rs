//! Session authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the session cookie
//! 2. Verify its signature and look the session up in the database
//! 3. Inject the logged-in user into the request
//! 4. Refresh the session cookie on the way out
//! 5. Reject unauthenticated requests with HTTP 401

use axum::{
    extract::{Request, State},
    http::{HeaderValue, header},
    middleware::Next,
    response::Response,
};

use crate::{
    app::AppState,
    error::AppError,
    models::user::User,
    services::session_service,
};

/// Authentication context attached to authenticated requests.
///
/// Route handlers extract it with `Extension<CurrentUser>`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    /// Raw cookie value, needed to end the session on logout
    pub session_cookie: String,
}

/// Session authentication middleware function.
///
/// # Flow
///
/// 1. Read the session cookie from the `Cookie` header
/// 2. Resolve it to a user (refreshing expiry when configured)
/// 3. If found: inject `CurrentUser`, call the next handler, re-issue the
///    cookie with a fresh `Max-Age`
/// 4. If not found: return 401 Unauthorized
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session_settings = &state.settings.session;

    let cookie_value = request
        .headers()
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| session_service::get_cookie(h, session_settings.cookie_name))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(AppError::NotAuthenticated)?;

    let user = session_service::load_user(
        &state.pool,
        &state.settings.secret_key,
        session_settings,
        &cookie_value,
        session_settings.save_every_request,
    )
    .await?;

    request.extensions_mut().insert(CurrentUser {
        user,
        session_cookie: cookie_value.clone(),
    });

    let mut response = next.run(request).await;

    // Handlers that already set the cookie (logout) take precedence.
    if session_settings.save_every_request && !response.headers().contains_key(header::SET_COOKIE)
    {
        let cookie = session_service::session_cookie(session_settings, &cookie_value);
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
    }

    Ok(response)
}
