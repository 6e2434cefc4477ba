//! HTTP middleware components.
//!
//! Middleware are functions that run before route handlers.
//! They can:
//! - Authenticate requests
//! - Reject requests for unknown hosts
//! - Redirect plain HTTP to HTTPS
//! - Expose internal error detail when debugging

/// Session-cookie authentication middleware
pub mod auth;
/// Internal error detail in debug mode
pub mod debug;
/// Allowed-hosts check
pub mod hosts;
/// HTTPS redirect and security headers
pub mod security;
