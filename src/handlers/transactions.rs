//! Transaction HTTP handlers.
//!
//! This module implements the ledger endpoints:
//! - POST /transactions/deposit - Add money to the caller's account
//! - POST /transactions/withdraw - Remove money from the caller's account
//! - GET /transactions/report - List ledger entries in timestamp order

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::{
    app::AppState,
    error::AppError,
    handlers::{accounts::display_name, notify},
    middleware::auth::CurrentUser,
    models::{
        account::BankAccount,
        transaction::{
            DepositRequest, ReportQuery, ReportResponse, Transaction, TransactionResponse,
            WithdrawRequest,
        },
        user::User,
    },
    services::{account_service, email_service::EmailMessage, transaction_service},
};

fn entry_email(user: &User, account: &BankAccount, transaction: &Transaction) -> EmailMessage {
    let kind = transaction.transaction_type.label();
    EmailMessage {
        to: user.email.clone(),
        subject: format!("{kind} of {} on account {}", transaction.amount, account.account_no),
        body: format!(
            "Hello {},\n\nA {} of {} was recorded on account {} at {}.\nYour balance is now {}.",
            display_name(user),
            kind.to_lowercase(),
            transaction.amount,
            account.account_no,
            transaction.timestamp.format("%Y-%m-%d %H:%M UTC"),
            transaction.balance_after_transaction
        ),
    }
}

/// Deposit into the caller's account.
///
/// # Request Body
///
/// ```json
/// { "amount": "500.00" }
/// ```
///
/// # Response (201)
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
pub async fn deposit(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<DepositRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let (account, transaction) = transaction_service::deposit(
        &state.pool,
        &state.settings.banking,
        current.user.id,
        request.amount,
    )
    .await?;

    notify(&state.tasks, entry_email(&current.user, &account, &transaction)).await;

    Ok((StatusCode::CREATED, Json(transaction.into())))
}

/// Withdraw from the caller's account.
///
/// # Validation
///
/// - Amount at least the minimum withdrawal
/// - Amount at most the account type's maximum withdrawal
/// - Account must have sufficient balance (422 otherwise)
pub async fn withdraw(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<WithdrawRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let (account, transaction) = transaction_service::withdraw(
        &state.pool,
        &state.settings.banking,
        current.user.id,
        request.amount,
    )
    .await?;

    notify(&state.tasks, entry_email(&current.user, &account, &transaction)).await;

    Ok((StatusCode::CREATED, Json(transaction.into())))
}

/// Transaction report for the caller's account.
///
/// # Query Parameters
///
/// - `start_date` (optional): first day included, `YYYY-MM-DD`
/// - `end_date` (optional): last day included, `YYYY-MM-DD`
pub async fn report(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ReportResponse>, AppError> {
    let account = account_service::find_account_for_user(&state.pool, current.user.id).await?;
    let report = transaction_service::report(&state.pool, &account, &query).await?;

    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TransactionType;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    #[test]
    fn entry_email_describes_the_transaction() {
        let user = User {
            id: Uuid::nil(),
            email: "jane@example.com".into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            password_hash: String::new(),
            created_at: Utc::now(),
        };
        let account = BankAccount {
            id: 1,
            account_no: 1_000_000_001,
            balance: Decimal::new(40_000, 2),
            interest_start_date: None,
            initial_deposit_date: None,
            last_interest_at: None,
            created_at: Utc::now(),
            account_type_name: "Savings".into(),
            maximum_withdrawal_amount: Decimal::from(100_000),
            annual_interest_rate: Decimal::new(350, 2),
            interest_calculation_per_year: 12,
        };
        let transaction = Transaction {
            id: 9,
            account_id: 1,
            amount: Decimal::new(10_000, 2),
            balance_after_transaction: Decimal::new(40_000, 2),
            transaction_type: TransactionType::Withdrawal,
            timestamp: Utc.with_ymd_and_hms(2024, 4, 13, 11, 23, 0).unwrap(),
        };

        let email = entry_email(&user, &account, &transaction);

        assert_eq!(email.to, "jane@example.com");
        assert_eq!(email.subject, "Withdrawal of 100.00 on account 1000000001");
        assert!(email.body.contains("Hello Jane Doe"));
        assert!(email.body.contains("A withdrawal of 100.00"));
        assert!(email.body.contains("2024-04-13 11:23 UTC"));
        assert!(email.body.contains("balance is now 400.00"));
    }
}
