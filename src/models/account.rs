//! Bank account data models and API response types.
//!
//! This module defines:
//! - `BankAccount`: a `user_bank_accounts` row joined with its account type
//! - `AccountResponse`: Response body returned to clients

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Column list shared by every query that loads a [`BankAccount`].
///
/// Callers append their own `WHERE` clause (and `FOR UPDATE` when locking).
pub const SELECT_BANK_ACCOUNT: &str = r#"
    SELECT a.id, a.account_no, a.balance,
           a.interest_start_date, a.initial_deposit_date, a.last_interest_at, a.created_at,
           t.name AS account_type_name,
           t.maximum_withdrawal_amount,
           t.annual_interest_rate,
           t.interest_calculation_per_year
    FROM user_bank_accounts a
    JOIN bank_account_types t ON t.id = a.account_type_id
"#;

/// Represents a bank account together with the rules of its account type.
///
/// # Balance Storage
///
/// Balances are `NUMERIC(12, 2)` and map to `rust_decimal::Decimal`, so no
/// floating point is involved anywhere between the database and the API.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BankAccount {
    /// Surrogate key, referenced by `transactions.account_id`
    pub id: i32,

    /// Customer-facing account number (`id` + configured start number)
    pub account_no: i64,

    /// Current balance, never negative (enforced by a CHECK constraint)
    pub balance: Decimal,

    /// Set on the first deposit; interest accrues from this date
    pub interest_start_date: Option<NaiveDate>,

    /// Date of the first deposit
    pub initial_deposit_date: Option<NaiveDate>,

    /// When interest was last credited
    pub last_interest_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub account_type_name: String,
    pub maximum_withdrawal_amount: Decimal,
    /// Percentage, e.g. `3.50`
    pub annual_interest_rate: Decimal,
    pub interest_calculation_per_year: i16,
}

impl BankAccount {
    /// Start of the current accrual period, if interest accrues at all.
    pub fn interest_anchor(&self) -> Option<DateTime<Utc>> {
        self.last_interest_at.or_else(|| {
            self.interest_start_date
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        })
    }
}

/// Response body for account data.
///
/// # JSON Example
///
/// ```json
/// {
///   "account_no": 1000000001,
///   "account_type": "Savings",
///   "balance": "1500.00",
///   "interest_start_date": "2024-04-13",
///   "initial_deposit_date": "2024-04-13",
///   "created_at": "2024-04-13T10:00:00Z"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub account_no: i64,
    pub account_type: String,
    pub balance: Decimal,
    pub interest_start_date: Option<NaiveDate>,
    pub initial_deposit_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Convert a database BankAccount to an API AccountResponse.
///
/// Internal identifiers and account type limits are not exposed.
impl From<BankAccount> for AccountResponse {
    fn from(account: BankAccount) -> Self {
        Self {
            account_no: account.account_no,
            account_type: account.account_type_name,
            balance: account.balance,
            interest_start_date: account.interest_start_date,
            initial_deposit_date: account.initial_deposit_date,
            created_at: account.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn account() -> BankAccount {
        BankAccount {
            id: 1,
            account_no: 1_000_000_001,
            balance: Decimal::new(150_000, 2),
            interest_start_date: None,
            initial_deposit_date: None,
            last_interest_at: None,
            created_at: Utc.with_ymd_and_hms(2024, 4, 13, 10, 0, 0).unwrap(),
            account_type_name: "Savings".into(),
            maximum_withdrawal_amount: Decimal::new(100_000, 0),
            annual_interest_rate: Decimal::new(350, 2),
            interest_calculation_per_year: 12,
        }
    }

    #[test]
    fn no_anchor_before_first_deposit() {
        assert_eq!(account().interest_anchor(), None);
    }

    #[test]
    fn anchor_prefers_last_accrual() {
        let mut acc = account();
        acc.interest_start_date = NaiveDate::from_ymd_opt(2024, 4, 13);
        assert_eq!(
            acc.interest_anchor(),
            Some(Utc.with_ymd_and_hms(2024, 4, 13, 0, 0, 0).unwrap())
        );

        let last = Utc.with_ymd_and_hms(2024, 5, 13, 0, 0, 0).unwrap();
        acc.last_interest_at = Some(last);
        assert_eq!(acc.interest_anchor(), Some(last));
    }

    #[test]
    fn response_hides_internal_fields() {
        let json = serde_json::to_value(AccountResponse::from(account())).unwrap();
        assert_eq!(json["account_no"], 1_000_000_001);
        assert_eq!(json["account_type"], "Savings");
        assert_eq!(json["balance"], "1500.00");
        assert!(json.get("user_id").is_none());
    }
}
