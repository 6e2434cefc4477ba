//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, query string, session user)
//! 2. Calls into the services layer
//! 3. Returns an HTTP response (JSON, status code, cookies)

/// Registration, login, logout and profile endpoints
pub mod accounts;
/// Liveness endpoint
pub mod health;
/// Deposit, withdrawal and report endpoints
pub mod transactions;

use crate::{
    services::email_service::EmailMessage,
    tasks::{Job, TaskQueue},
};

/// Queue a notification email.
///
/// Called after the database work has been committed, so a failure here is
/// logged rather than turned into an error response.
pub(crate) async fn notify(tasks: &TaskQueue, message: EmailMessage) {
    let to = message.to.clone();
    if let Err(e) = tasks.enqueue(Job::SendEmail(message)).await {
        tracing::error!(to = %to, error = %e, "failed to send notification");
    }
}
