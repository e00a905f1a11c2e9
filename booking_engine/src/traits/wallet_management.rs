use hsb_common::Paise;
use thiserror::Error;

use crate::db_types::UserAccount;

#[derive(Debug, Clone, Error)]
pub enum WalletApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("No user account exists for customer {0}")]
    AccountNotFound(String),
    #[error("Wallet for customer {customer_id} holds less than the {needed} requested")]
    InsufficientFunds { customer_id: String, needed: Paise },
}

impl From<sqlx::Error> for WalletApiError {
    fn from(e: sqlx::Error) -> Self {
        WalletApiError::DatabaseError(e.to_string())
    }
}

/// Behaviour for managing requester accounts and their wallet credit.
///
/// Settlement debits wallets inside [`BookingGatewayDatabase::settle_booking`]; this trait covers the
/// surrounding reads and administrative credits.
///
/// [`BookingGatewayDatabase::settle_booking`]: crate::traits::BookingGatewayDatabase::settle_booking
#[allow(async_fn_in_trait)]
pub trait WalletManagement {
    /// Fetches the user account for the given customer id. If no account exists, `None` is returned.
    async fn fetch_user_account(&self, customer_id: &str) -> Result<Option<UserAccount>, WalletApiError>;

    /// Creates the account if it is missing, otherwise leaves it untouched. Returns the stored record.
    async fn upsert_user_account(
        &self,
        customer_id: &str,
        name: &str,
        email: &str,
    ) -> Result<UserAccount, WalletApiError>;

    /// Adjusts the wallet balance by `delta` (positive for credits, negative for corrections) and
    /// returns the new balance.
    async fn adjust_wallet(&self, customer_id: &str, delta: Paise) -> Result<Paise, WalletApiError>;
}
