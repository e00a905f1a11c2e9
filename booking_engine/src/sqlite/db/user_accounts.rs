use hsb_common::Paise;
use log::trace;
use sqlx::SqliteConnection;

use crate::{db_types::UserAccount, traits::WalletApiError};

pub async fn fetch_user_account(
    customer_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<UserAccount>, sqlx::Error> {
    let account = sqlx::query_as("SELECT * FROM user_accounts WHERE customer_id = $1")
        .bind(customer_id)
        .fetch_optional(conn)
        .await?;
    Ok(account)
}

/// Creates the account if it does not exist yet; otherwise leaves the stored record untouched.
pub async fn upsert_user_account(
    customer_id: &str,
    name: &str,
    email: &str,
    conn: &mut SqliteConnection,
) -> Result<UserAccount, WalletApiError> {
    sqlx::query("INSERT OR IGNORE INTO user_accounts (customer_id, name, email) VALUES ($1, $2, $3)")
        .bind(customer_id)
        .bind(name)
        .bind(email)
        .execute(&mut *conn)
        .await?;
    fetch_user_account(customer_id, conn)
        .await?
        .ok_or_else(|| WalletApiError::AccountNotFound(customer_id.to_string()))
}

/// Adjusts the wallet by `delta` and returns the new balance.
pub async fn adjust_wallet(
    customer_id: &str,
    delta: Paise,
    conn: &mut SqliteConnection,
) -> Result<Paise, WalletApiError> {
    let balance: Option<(i64,)> = sqlx::query_as(
        "UPDATE user_accounts SET wallet = wallet + $1, updated_at = CURRENT_TIMESTAMP WHERE customer_id = $2 \
         RETURNING wallet",
    )
    .bind(delta.value())
    .bind(customer_id)
    .fetch_optional(conn)
    .await?;
    let (balance,) = balance.ok_or_else(|| WalletApiError::AccountNotFound(customer_id.to_string()))?;
    trace!("🧑️ Wallet for {customer_id} adjusted by {delta}. New balance {}", Paise::from(balance));
    Ok(Paise::from(balance))
}

/// The settlement wallet leg: debits exactly `amount`, guarded so the balance can never go negative.
/// Returns the new balance.
pub async fn debit_wallet(
    customer_id: &str,
    amount: Paise,
    conn: &mut SqliteConnection,
) -> Result<Paise, WalletApiError> {
    let balance: Option<(i64,)> = sqlx::query_as(
        "UPDATE user_accounts SET wallet = wallet - $1, updated_at = CURRENT_TIMESTAMP WHERE customer_id = $2 AND \
         wallet >= $1 RETURNING wallet",
    )
    .bind(amount.value())
    .bind(customer_id)
    .fetch_optional(&mut *conn)
    .await?;
    match balance {
        Some((balance,)) => Ok(Paise::from(balance)),
        None => match fetch_user_account(customer_id, conn).await? {
            None => Err(WalletApiError::AccountNotFound(customer_id.to_string())),
            Some(_) => {
                Err(WalletApiError::InsufficientFunds { customer_id: customer_id.to_string(), needed: amount })
            },
        },
    }
}
