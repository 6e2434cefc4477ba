//! Transaction service - Core business logic for the ledger.
//!
//! This service handles:
//! - Deposits and withdrawals with balance validation
//! - Interest accrual
//! - The transaction report
//!
//! # Atomicity Guarantees
//!
//! Every balance change locks the account row (`FOR UPDATE`), computes the
//! new balance with [`crate::ledger`], updates the account and appends the
//! ledger entry inside one PostgreSQL transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction as DbTransaction};
use uuid::Uuid;

use crate::{
    config::BankingSettings,
    db::DbPool,
    error::AppError,
    ledger::{self, TransactionType},
    models::{
        account::{BankAccount, SELECT_BANK_ACCOUNT},
        transaction::{ReportQuery, ReportResponse, Transaction},
    },
};

const TRANSACTION_COLUMNS: &str =
    "id, account_id, amount, balance_after_transaction, transaction_type, timestamp";

/// Lock the bank account owned by `user_id` for the rest of `tx`.
async fn lock_account_for_user(
    tx: &mut DbTransaction<'_, Postgres>,
    user_id: Uuid,
) -> Result<BankAccount, AppError> {
    sqlx::query_as::<_, BankAccount>(&format!(
        "{SELECT_BANK_ACCOUNT} WHERE a.user_id = $1 FOR UPDATE OF a"
    ))
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(AppError::AccountNotFound)
}

/// Apply an entry to a locked account: update the balance and append the
/// ledger row.
async fn record_entry(
    tx: &mut DbTransaction<'_, Postgres>,
    account: &BankAccount,
    kind: TransactionType,
    amount: Decimal,
) -> Result<Transaction, AppError> {
    let balance_after = ledger::balance_after(account.balance, kind, amount)?;

    sqlx::query("UPDATE user_bank_accounts SET balance = $1 WHERE id = $2")
        .bind(balance_after)
        .bind(account.id)
        .execute(&mut **tx)
        .await?;

    let transaction = sqlx::query_as::<_, Transaction>(&format!(
        r#"
        INSERT INTO transactions (account_id, amount, balance_after_transaction, transaction_type)
        VALUES ($1, $2, $3, $4)
        RETURNING {TRANSACTION_COLUMNS}
        "#
    ))
    .bind(account.id)
    .bind(amount)
    .bind(balance_after)
    .bind(kind)
    .fetch_one(&mut **tx)
    .await?;

    Ok(transaction)
}

/// Deposit money into the user's account.
///
/// # Process
///
/// 1. Validate the amount against the minimum deposit
/// 2. Lock the account row
/// 3. On the first deposit, set `initial_deposit_date` and
///    `interest_start_date` to today
/// 4. Update the balance and record a Deposit entry
/// 5. Commit
///
/// # Errors
///
/// - `Validation`: amount malformed or below the minimum
/// - `AccountNotFound`: the user has no bank account
/// - `Database`: Database error occurred
pub async fn deposit(
    pool: &DbPool,
    banking: &BankingSettings,
    user_id: Uuid,
    amount: Decimal,
) -> Result<(BankAccount, Transaction), AppError> {
    let amount = ledger::check_deposit(amount, banking.minimum_deposit_amount)?;

    let mut tx = pool.begin().await?;
    let mut account = lock_account_for_user(&mut tx, user_id).await?;

    if account.initial_deposit_date.is_none() {
        let today = Utc::now().date_naive();
        sqlx::query(
            r#"
            UPDATE user_bank_accounts
            SET initial_deposit_date = $1,
                interest_start_date = COALESCE(interest_start_date, $1)
            WHERE id = $2
            "#,
        )
        .bind(today)
        .bind(account.id)
        .execute(&mut *tx)
        .await?;
        account.initial_deposit_date = Some(today);
        account.interest_start_date = account.interest_start_date.or(Some(today));
    }

    let transaction = record_entry(&mut tx, &account, TransactionType::Deposit, amount).await?;
    tx.commit().await?;

    account.balance = transaction.balance_after_transaction;
    tracing::info!(
        account_no = account.account_no,
        amount = %amount,
        balance = %account.balance,
        "deposit recorded"
    );

    Ok((account, transaction))
}

/// Withdraw money from the user's account.
///
/// # Validation
///
/// - At least the configured minimum withdrawal
/// - At most the account type's maximum withdrawal
/// - At most the current (locked) balance
pub async fn withdraw(
    pool: &DbPool,
    banking: &BankingSettings,
    user_id: Uuid,
    amount: Decimal,
) -> Result<(BankAccount, Transaction), AppError> {
    let amount = ledger::validate_amount(amount)?;

    let mut tx = pool.begin().await?;
    let mut account = lock_account_for_user(&mut tx, user_id).await?;

    // Checked against the locked balance so concurrent withdrawals serialize.
    if let Err(e) = ledger::check_withdrawal(
        amount,
        account.balance,
        banking.minimum_withdrawal_amount,
        account.maximum_withdrawal_amount,
    ) {
        tx.rollback().await?;
        return Err(e.into());
    }

    let transaction = record_entry(&mut tx, &account, TransactionType::Withdrawal, amount).await?;
    tx.commit().await?;

    account.balance = transaction.balance_after_transaction;
    tracing::info!(
        account_no = account.account_no,
        amount = %amount,
        balance = %account.balance,
        "withdrawal recorded"
    );

    Ok((account, transaction))
}

/// List the user's ledger in timestamp order, optionally within a date range.
pub async fn report(
    pool: &DbPool,
    account: &BankAccount,
    query: &ReportQuery,
) -> Result<ReportResponse, AppError> {
    let (from, until) = query.bounds().map_err(AppError::InvalidRequest)?;

    let transactions = sqlx::query_as::<_, Transaction>(&format!(
        r#"
        SELECT {TRANSACTION_COLUMNS}
        FROM transactions
        WHERE account_id = $1
          AND ($2::TIMESTAMPTZ IS NULL OR timestamp >= $2)
          AND ($3::TIMESTAMPTZ IS NULL OR timestamp < $3)
        ORDER BY timestamp ASC, id ASC
        "#
    ))
    .bind(account.id)
    .bind(from)
    .bind(until)
    .fetch_all(pool)
    .await?;

    Ok(ReportResponse {
        account_no: account.account_no,
        balance: account.balance,
        start_date: query.start_date,
        end_date: query.end_date,
        transactions: transactions.into_iter().map(Into::into).collect(),
    })
}

/// Credit interest to every account whose accrual period has elapsed.
///
/// Each account is handled in its own database transaction and re-checked
/// under the row lock, so overlapping runs never credit a period twice.
/// Accounts at a zero balance are visited too: their due periods are
/// consumed with nothing credited. Returns the number of accounts credited.
pub async fn accrue_interest(pool: &DbPool, now: DateTime<Utc>) -> Result<usize, AppError> {
    let candidates: Vec<i32> = sqlx::query_scalar(
        r#"
        SELECT a.id
        FROM user_bank_accounts a
        JOIN bank_account_types t ON t.id = a.account_type_id
        WHERE a.interest_start_date IS NOT NULL
          AND t.annual_interest_rate > 0
        ORDER BY a.id
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut credited = 0;
    for account_id in candidates {
        match accrue_for_account(pool, account_id, now).await {
            Ok(true) => credited += 1,
            Ok(false) => {}
            Err(e) => tracing::error!(account_id, error = %e, "interest accrual failed"),
        }
    }
    Ok(credited)
}

async fn accrue_for_account(
    pool: &DbPool,
    account_id: i32,
    now: DateTime<Utc>,
) -> Result<bool, AppError> {
    let mut tx = pool.begin().await?;

    let account = sqlx::query_as::<_, BankAccount>(&format!(
        "{SELECT_BANK_ACCOUNT} WHERE a.id = $1 FOR UPDATE OF a"
    ))
    .bind(account_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::AccountNotFound)?;

    let Some(anchor) = account.interest_anchor() else {
        tx.rollback().await?;
        return Ok(false);
    };
    if !ledger::accrual_due(anchor, now, account.interest_calculation_per_year) {
        tx.rollback().await?;
        return Ok(false);
    }

    let interest = ledger::interest_for_period(
        account.balance,
        account.annual_interest_rate,
        account.interest_calculation_per_year,
    );

    // The period is consumed even when it rounds to zero.
    sqlx::query("UPDATE user_bank_accounts SET last_interest_at = $1 WHERE id = $2")
        .bind(anchor + ledger::accrual_period(account.interest_calculation_per_year))
        .bind(account.id)
        .execute(&mut *tx)
        .await?;

    if interest > Decimal::ZERO {
        record_entry(&mut tx, &account, TransactionType::Interest, interest).await?;
    }

    tx.commit().await?;

    if interest > Decimal::ZERO {
        tracing::debug!(account_no = account.account_no, interest = %interest, "interest credited");
    }
    Ok(interest > Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::account_service::{
        self,
        tests::{banking, open_account},
    };
    use chrono::Duration;
    use sqlx::error::ErrorKind;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    async fn entries(pool: &DbPool, account_id: i32) -> Vec<Transaction> {
        sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE account_id = $1 ORDER BY id"
        ))
        .bind(account_id)
        .fetch_all(pool)
        .await
        .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn first_deposit_starts_the_interest_clock(pool: DbPool) {
        let (user, _) = open_account(&pool, "jane@example.com").await;
        let today = Utc::now().date_naive();

        let (account, entry) = deposit(&pool, &banking(), user.id, dec("500")).await.unwrap();

        assert_eq!(account.initial_deposit_date, Some(today));
        assert_eq!(account.interest_start_date, Some(today));
        assert_eq!(entry.transaction_type, TransactionType::Deposit);
        assert_eq!(entry.amount, dec("500.00"));

        let stored = account_service::find_account_for_user(&pool, user.id).await.unwrap();
        assert_eq!(stored.initial_deposit_date, Some(today));
        assert_eq!(stored.interest_start_date, Some(today));
        assert_eq!(stored.balance, dec("500.00"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn each_entry_snapshots_the_running_balance(pool: DbPool) {
        let (user, account) = open_account(&pool, "jane@example.com").await;

        deposit(&pool, &banking(), user.id, dec("1000")).await.unwrap();
        withdraw(&pool, &banking(), user.id, dec("300")).await.unwrap();
        let (after, _) = deposit(&pool, &banking(), user.id, dec("150.50")).await.unwrap();

        let balances: Vec<Decimal> = entries(&pool, account.id)
            .await
            .into_iter()
            .map(|t| t.balance_after_transaction)
            .collect();
        assert_eq!(balances, vec![dec("1000.00"), dec("700.00"), dec("850.50")]);
        assert_eq!(after.balance, dec("850.50"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn rejected_withdrawals_leave_no_trace(pool: DbPool) {
        let (user, account) = open_account(&pool, "jane@example.com").await;
        deposit(&pool, &banking(), user.id, dec("1000")).await.unwrap();

        assert!(matches!(
            withdraw(&pool, &banking(), user.id, dec("2000")).await,
            Err(AppError::InsufficientBalance)
        ));
        assert!(matches!(
            withdraw(&pool, &banking(), user.id, dec("50")).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            deposit(&pool, &banking(), user.id, dec("99.99")).await,
            Err(AppError::Validation(_))
        ));

        assert_eq!(entries(&pool, account.id).await.len(), 1);
        let stored = account_service::find_account_for_user(&pool, user.id).await.unwrap();
        assert_eq!(stored.balance, dec("1000.00"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn concurrent_withdrawals_never_overdraw(pool: DbPool) {
        let (user, account) = open_account(&pool, "jane@example.com").await;
        deposit(&pool, &banking(), user.id, dec("1000")).await.unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pool = pool.clone();
                tokio::spawn(async move {
                    withdraw(&pool, &banking(), user.id, dec("300")).await.is_ok()
                })
            })
            .collect();
        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap() {
                succeeded += 1;
            }
        }

        assert_eq!(succeeded, 3);
        let ledger = entries(&pool, account.id).await;
        let mut expected = dec("1000.00");
        for entry in &ledger[1..] {
            expected -= entry.amount;
            assert_eq!(entry.balance_after_transaction, expected);
        }
        let stored = account_service::find_account_for_user(&pool, user.id).await.unwrap();
        assert_eq!(stored.balance, dec("100.00"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn report_lists_entries_in_timestamp_order(pool: DbPool) {
        let (user, _) = open_account(&pool, "jane@example.com").await;
        for amount in ["500", "200", "300"] {
            deposit(&pool, &banking(), user.id, dec(amount)).await.unwrap();
        }
        withdraw(&pool, &banking(), user.id, dec("100")).await.unwrap();
        let account = account_service::find_account_for_user(&pool, user.id).await.unwrap();

        let report = report(&pool, &account, &ReportQuery::default()).await.unwrap();

        assert_eq!(report.transactions.len(), 4);
        assert_eq!(report.balance, dec("900.00"));
        assert!(report.transactions.windows(2).all(|w| {
            (w[0].timestamp, w[0].id) < (w[1].timestamp, w[1].id)
        }));

        let today = Utc::now().date_naive();
        let later = ReportQuery {
            start_date: today.succ_opt(),
            end_date: None,
        };
        assert!(report_for(&pool, &account, &later).await.is_empty());

        let backwards = ReportQuery {
            start_date: today.succ_opt(),
            end_date: Some(today),
        };
        assert!(matches!(
            super::report(&pool, &account, &backwards).await,
            Err(AppError::InvalidRequest(_))
        ));
    }

    async fn report_for(
        pool: &DbPool,
        account: &BankAccount,
        query: &ReportQuery,
    ) -> Vec<crate::models::transaction::TransactionResponse> {
        report(pool, account, query).await.unwrap().transactions
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn transaction_type_outside_known_codes_is_refused(pool: DbPool) {
        let (_, account) = open_account(&pool, "jane@example.com").await;

        let err = sqlx::query(
            "INSERT INTO transactions (account_id, amount, balance_after_transaction, transaction_type) \
             VALUES ($1, 10, 10, 4)",
        )
        .bind(account.id)
        .execute(&pool)
        .await
        .unwrap_err();

        let db_err = err.as_database_error().unwrap();
        assert!(matches!(db_err.kind(), ErrorKind::CheckViolation));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn ledger_entries_cannot_be_updated(pool: DbPool) {
        let (user, _) = open_account(&pool, "jane@example.com").await;
        let (_, entry) = deposit(&pool, &banking(), user.id, dec("500")).await.unwrap();

        let err = sqlx::query("UPDATE transactions SET amount = 1 WHERE id = $1")
            .bind(entry.id)
            .execute(&pool)
            .await
            .unwrap_err();

        let db_err = err.as_database_error().unwrap();
        assert!(db_err.message().contains("transactions are immutable"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn deleting_an_account_removes_its_ledger(pool: DbPool) {
        let (user, account) = open_account(&pool, "jane@example.com").await;
        deposit(&pool, &banking(), user.id, dec("500")).await.unwrap();
        withdraw(&pool, &banking(), user.id, dec("200")).await.unwrap();

        sqlx::query("DELETE FROM user_bank_accounts WHERE id = $1")
            .bind(account.id)
            .execute(&pool)
            .await
            .unwrap();

        assert!(entries(&pool, account.id).await.is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn interest_is_credited_once_per_period(pool: DbPool) {
        let (user, account) = open_account(&pool, "jane@example.com").await;
        deposit(&pool, &banking(), user.id, dec("1200")).await.unwrap();
        let next_month = Utc::now() + Duration::days(31);

        assert_eq!(accrue_interest(&pool, next_month).await.unwrap(), 1);
        assert_eq!(accrue_interest(&pool, next_month).await.unwrap(), 0);

        let ledger = entries(&pool, account.id).await;
        let interest = ledger.last().unwrap();
        assert_eq!(interest.transaction_type, TransactionType::Interest);
        // 1200 * 3.50% / 12
        assert_eq!(interest.amount, dec("3.50"));
        assert_eq!(interest.balance_after_transaction, dec("1203.50"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn empty_periods_are_consumed_without_interest(pool: DbPool) {
        let (user, account) = open_account(&pool, "jane@example.com").await;
        deposit(&pool, &banking(), user.id, dec("1000")).await.unwrap();
        withdraw(&pool, &banking(), user.id, dec("1000")).await.unwrap();
        let later = Utc::now() + Duration::days(200);

        for _ in 0..8 {
            assert_eq!(accrue_interest(&pool, later).await.unwrap(), 0);
        }

        // Money arriving after the idle months earns nothing for them.
        deposit(&pool, &banking(), user.id, dec("100000")).await.unwrap();
        for _ in 0..8 {
            accrue_interest(&pool, later).await.unwrap();
        }

        let credited = entries(&pool, account.id)
            .await
            .into_iter()
            .filter(|t| t.transaction_type == TransactionType::Interest)
            .count();
        assert_eq!(credited, 0);

        let stored = account_service::find_account_for_user(&pool, user.id).await.unwrap();
        let start = stored.interest_anchor().unwrap();
        assert!(later - start < ledger::accrual_period(stored.interest_calculation_per_year));
        assert_eq!(stored.balance, dec("100000.00"));
    }
}
