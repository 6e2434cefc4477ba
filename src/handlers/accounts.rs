//! Account HTTP handlers.
//!
//! This module implements the user-facing account endpoints:
//! - POST /accounts/register - Create a user and bank account, log in
//! - POST /accounts/login - Start a session
//! - POST /accounts/logout - End the session
//! - GET /accounts/me - Profile and account summary

use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::{
    app::AppState,
    error::AppError,
    handlers::notify,
    middleware::auth::CurrentUser,
    models::user::{LoginRequest, ProfileResponse, RegisterRequest, User},
    services::{account_service, email_service::EmailMessage, session_service},
};

/// Open a session for `user_id` and return the `Set-Cookie` header value.
async fn start_session(state: &AppState, user_id: Uuid) -> Result<HeaderValue, AppError> {
    let value = session_service::create_session(
        &state.pool,
        &state.settings.secret_key,
        &state.settings.session,
        user_id,
    )
    .await?;
    let cookie = session_service::session_cookie(&state.settings.session, &value);
    HeaderValue::from_str(&cookie)
        .map_err(|_| AppError::InvalidRequest("Invalid session cookie".to_string()))
}

/// Register a new customer.
///
/// # Request Body
///
/// ```json
/// {
///   "email": "jane@example.com",
///   "first_name": "Jane",
///   "last_name": "Doe",
///   "password": "blue-tractor-42",
///   "account_type": "Savings"
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: profile with the new account; a session cookie is set
/// - **409**: email already registered
/// - **422**: password or email rejected, unknown account type
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Response, AppError> {
    let (user, account) =
        account_service::register(&state.pool, &state.settings.banking, request).await?;
    let cookie = start_session(&state, user.id).await?;

    notify(
        &state.tasks,
        EmailMessage {
            to: user.email.clone(),
            subject: "Welcome to your new bank account".to_string(),
            body: format!(
                "Hello {},\n\nYour {} account {} is ready.",
                display_name(&user),
                account.account_type_name,
                account.account_no
            ),
        },
    )
    .await;

    let body = ProfileResponse {
        user: user.into(),
        account: account.into(),
    };
    Ok((StatusCode::CREATED, [(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// Log in with email and password.
///
/// # Response
///
/// - **200 OK**: profile; a session cookie is set
/// - **401**: unknown email or wrong password
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let user = account_service::authenticate(&state.pool, &request.email, &request.password).await?;
    let account = account_service::find_account_for_user(&state.pool, user.id).await?;
    let cookie = start_session(&state, user.id).await?;

    tracing::info!(user_id = %user.id, "user logged in");

    let body = ProfileResponse {
        user: user.into(),
        account: account.into(),
    };
    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// End the current session and clear the cookie.
///
/// # Response
///
/// Returns 204 No Content.
pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Response, AppError> {
    session_service::destroy_session(
        &state.pool,
        &state.settings.secret_key,
        &current.session_cookie,
    )
    .await?;

    tracing::info!(user_id = %current.user.id, "user logged out");

    let cookie = session_service::clear_session_cookie(&state.settings.session);
    let cookie = HeaderValue::from_str(&cookie)
        .map_err(|_| AppError::InvalidRequest("Invalid session cookie".to_string()))?;
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]).into_response())
}

/// Return the logged-in user and their account.
pub async fn me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<ProfileResponse>, AppError> {
    let account = account_service::find_account_for_user(&state.pool, current.user.id).await?;

    Ok(Json(ProfileResponse {
        user: current.user.into(),
        account: account.into(),
    }))
}

pub(crate) fn display_name(user: &User) -> String {
    let full = format!("{} {}", user.first_name, user.last_name);
    let full = full.trim();
    if full.is_empty() {
        user.email.clone()
    } else {
        full.to_string()
    }
}
