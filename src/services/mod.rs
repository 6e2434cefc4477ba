//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They handle database transactions, validation, and complex operations.

pub mod account_service;
pub mod email_service;
pub mod password;
pub mod session_service;
pub mod transaction_service;
