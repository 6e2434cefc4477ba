//! Ledger rules: transaction types, amount validation and balance arithmetic.
//!
//! Everything here is pure so the services can call it while holding a row
//! lock, and so it can be tested without a database.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Amounts and balances are stored as `NUMERIC(12, 2)`.
pub const DECIMAL_PLACES: u32 = 2;
pub const MAX_DIGITS: u32 = 12;

/// Kind of ledger entry. Stored as `SMALLINT` in `transactions.transaction_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
pub enum TransactionType {
    Deposit = 1,
    Withdrawal = 2,
    Interest = 3,
}

impl TransactionType {
    pub const ALL: [TransactionType; 3] = [
        TransactionType::Deposit,
        TransactionType::Withdrawal,
        TransactionType::Interest,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TransactionType::Deposit => "Deposit",
            TransactionType::Withdrawal => "Withdrawal",
            TransactionType::Interest => "Interest",
        }
    }

    /// Whether this entry increases the balance.
    pub fn is_credit(self) -> bool {
        !matches!(self, TransactionType::Withdrawal)
    }
}

impl From<TransactionType> for i16 {
    fn from(value: TransactionType) -> Self {
        value as i16
    }
}

impl TryFrom<i16> for TransactionType {
    type Error = LedgerError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TransactionType::Deposit),
            2 => Ok(TransactionType::Withdrawal),
            3 => Ok(TransactionType::Interest),
            other => Err(LedgerError::UnknownTransactionType(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("amount must be positive")]
    NonPositiveAmount,

    #[error("amount must have at most 2 decimal places")]
    TooManyDecimalPlaces,

    #[error("amount must have at most 12 digits")]
    AmountTooLarge,

    #[error("minimum amount is {0}")]
    BelowMinimum(Decimal),

    #[error("maximum amount is {0}")]
    AboveMaximum(Decimal),

    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("resulting balance does not fit in 12 digits")]
    BalanceOverflow,

    #[error("unknown transaction type {0}")]
    UnknownTransactionType(i16),
}

/// Largest value representable as `NUMERIC(12, 2)`.
fn max_value() -> Decimal {
    // 10^(12-2) - 0.01
    Decimal::new(10_i64.pow(MAX_DIGITS) - 1, DECIMAL_PLACES)
}

/// Check that `amount` is positive and representable as `NUMERIC(12, 2)`.
///
/// Trailing zeros are ignored, so `10.500` is accepted as `10.50`.
pub fn validate_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveAmount);
    }
    let normalized = amount.normalize();
    if normalized.scale() > DECIMAL_PLACES {
        return Err(LedgerError::TooManyDecimalPlaces);
    }
    if normalized > max_value() {
        return Err(LedgerError::AmountTooLarge);
    }
    let mut fixed = normalized;
    fixed.rescale(DECIMAL_PLACES);
    Ok(fixed)
}

/// Compute `balance_after_transaction` for an entry applied to `prior`.
///
/// Deposits and interest add the amount, withdrawals subtract it. A
/// withdrawal larger than the prior balance is rejected.
pub fn balance_after(
    prior: Decimal,
    kind: TransactionType,
    amount: Decimal,
) -> Result<Decimal, LedgerError> {
    let amount = validate_amount(amount)?;
    let next = if kind.is_credit() {
        prior.checked_add(amount).ok_or(LedgerError::BalanceOverflow)?
    } else {
        if amount > prior {
            return Err(LedgerError::InsufficientBalance);
        }
        prior - amount
    };
    if next > max_value() {
        return Err(LedgerError::BalanceOverflow);
    }
    Ok(next)
}

/// Validate a customer deposit against the configured minimum.
pub fn check_deposit(amount: Decimal, minimum: Decimal) -> Result<Decimal, LedgerError> {
    let amount = validate_amount(amount)?;
    if amount < minimum {
        return Err(LedgerError::BelowMinimum(minimum));
    }
    Ok(amount)
}

/// Validate a customer withdrawal against the minimum, the account type's
/// maximum and the current balance.
pub fn check_withdrawal(
    amount: Decimal,
    balance: Decimal,
    minimum: Decimal,
    maximum: Decimal,
) -> Result<Decimal, LedgerError> {
    let amount = validate_amount(amount)?;
    if amount < minimum {
        return Err(LedgerError::BelowMinimum(minimum));
    }
    if amount > maximum {
        return Err(LedgerError::AboveMaximum(maximum));
    }
    if amount > balance {
        return Err(LedgerError::InsufficientBalance);
    }
    Ok(amount)
}

/// Interest earned by `balance` over one accrual period.
///
/// `annual_rate` is a percentage. The result is rounded half away from zero
/// to two decimal places.
pub fn interest_for_period(balance: Decimal, annual_rate: Decimal, periods_per_year: i16) -> Decimal {
    if balance <= Decimal::ZERO || annual_rate <= Decimal::ZERO || periods_per_year <= 0 {
        return Decimal::ZERO;
    }
    let raw = balance * annual_rate / Decimal::ONE_HUNDRED / Decimal::from(periods_per_year);
    raw.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Length of one accrual period.
pub fn accrual_period(periods_per_year: i16) -> chrono::Duration {
    chrono::Duration::days(365 / i64::from(periods_per_year.max(1)))
}

/// Whether a full accrual period has elapsed since `anchor`.
pub fn accrual_due(anchor: DateTime<Utc>, now: DateTime<Utc>, periods_per_year: i16) -> bool {
    now - anchor >= accrual_period(periods_per_year)
}
