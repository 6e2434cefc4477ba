//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables,
//! plus the request/response bodies built from them.

/// Bank account and account type models
pub mod account;
/// Login session model
pub mod session;
/// Ledger entry model
pub mod transaction;
/// User model
pub mod user;
