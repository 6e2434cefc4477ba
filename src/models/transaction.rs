//! Transaction data models and API request/response types.
//!
//! This module defines:
//! - `Transaction`: Database entity representing a ledger entry
//! - Request types for deposit, withdrawal and the transaction report
//! - `TransactionResponse` / `ReportResponse`: Response bodies

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::TransactionType;

/// Represents a transaction record from the database.
///
/// # Database Table
///
/// Maps to the `transactions` table. Each transaction:
/// - Belongs to one bank account (deleted with it)
/// - Stores a positive `amount`; the direction comes from `transaction_type`
/// - Snapshots the account balance right after it was applied
/// - Is never updated after insertion
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Transaction {
    /// Auto-assigned surrogate key
    pub id: i32,

    /// Bank account this entry belongs to
    pub account_id: i32,

    pub amount: Decimal,

    /// Account balance after this entry was applied
    pub balance_after_transaction: Decimal,

    pub transaction_type: TransactionType,

    /// Set by the database at insertion
    pub timestamp: DateTime<Utc>,
}

/// Request to deposit money.
///
/// # JSON Example
///
/// ```json
/// { "amount": "500.00" }
/// ```
#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub amount: Decimal,
}

/// Request to withdraw money.
///
/// # Validation
///
/// - At least the configured minimum withdrawal
/// - At most the account type's maximum withdrawal
/// - At most the current balance
#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub amount: Decimal,
}

/// Query string for `GET /transactions/report`.
///
/// Both bounds are inclusive calendar dates (UTC).
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ReportQuery {
    /// Convert the inclusive date range into a half-open timestamp range.
    pub fn bounds(&self) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), String> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err("start_date must not be after end_date".to_string());
            }
        }
        let from = self
            .start_date
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc());
        let until = self
            .end_date
            .and_then(|d| d.succ_opt())
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc());
        Ok((from, until))
    }
}

/// Response returned for a single ledger entry.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": 42,
///   "transaction_type": "Deposit",
///   "amount": "500.00",
///   "balance_after_transaction": "1500.00",
///   "timestamp": "2024-04-13T11:23:00Z"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: i32,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub balance_after_transaction: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(transaction: Transaction) -> Self {
        Self {
            id: transaction.id,
            transaction_type: transaction.transaction_type,
            amount: transaction.amount,
            balance_after_transaction: transaction.balance_after_transaction,
            timestamp: transaction.timestamp,
        }
    }
}

/// Response body for the transaction report.
#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub account_no: i64,
    pub balance: Decimal,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Entries in ascending timestamp order
    pub transactions: Vec<TransactionResponse>,
}
