use hsb_common::Paise;
use thiserror::Error;

use crate::traits::{
    BookingGatewayError,
    BookingQueryError,
    PartnerApiError,
    PaymentProviderError,
    WalletApiError,
};

#[derive(Debug, Clone, Error)]
pub enum MatcherError {
    #[error("Invalid checkout: {0}")]
    ValidationError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<BookingGatewayError> for MatcherError {
    fn from(e: BookingGatewayError) -> Self {
        MatcherError::DatabaseError(e.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum BookingFlowError {
    #[error("The requested booking {0} does not exist")]
    BookingNotFound(i64),
    #[error("Booking {0} was already claimed by another partner")]
    AlreadyClaimed(i64),
    #[error("Cancellation is not allowed: {0}")]
    CancellationNotAllowed(String),
    #[error("The requested partner {0} does not exist")]
    PartnerNotFound(i64),
    #[error("Partner {0} is not approved")]
    PartnerNotApproved(i64),
    #[error("Booking {0} is not assigned to the requesting partner")]
    NotAssignedToPartner(i64),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<BookingGatewayError> for BookingFlowError {
    fn from(e: BookingGatewayError) -> Self {
        match e {
            BookingGatewayError::BookingNotFound(id) => BookingFlowError::BookingNotFound(id),
            BookingGatewayError::AlreadyClaimed(id) => BookingFlowError::AlreadyClaimed(id),
            BookingGatewayError::CancellationNotAllowed(reason) => BookingFlowError::CancellationNotAllowed(reason),
            BookingGatewayError::NotAssignedToPartner(id) => BookingFlowError::NotAssignedToPartner(id),
            other => BookingFlowError::DatabaseError(other.to_string()),
        }
    }
}

impl From<BookingQueryError> for BookingFlowError {
    fn from(e: BookingQueryError) -> Self {
        BookingFlowError::DatabaseError(e.to_string())
    }
}

impl From<PartnerApiError> for BookingFlowError {
    fn from(e: PartnerApiError) -> Self {
        match e {
            PartnerApiError::PartnerNotFound(id) => BookingFlowError::PartnerNotFound(id),
            other => BookingFlowError::DatabaseError(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    #[error("Invalid payment request: {0}")]
    ValidationError(String),
    #[error("The requested booking {0} does not exist")]
    BookingNotFound(i64),
    #[error("Wallet cannot be applied: balance {wallet} covers the subtotal {subtotal}")]
    WalletNotApplicable { wallet: Paise, subtotal: Paise },
    #[error("The payment confirmation signature did not verify")]
    VerificationFailed,
    #[error("No user account exists for customer {0}")]
    UserAccountNotFound(String),
    #[error("Payment provider failure: {0}")]
    PaymentProvider(#[from] PaymentProviderError),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl SettlementError {
    /// Provider outages and storage failures are worth retrying; everything else needs a different
    /// request from the caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            SettlementError::PaymentProvider(e) => e.is_retryable(),
            SettlementError::DatabaseError(_) => true,
            _ => false,
        }
    }
}

impl From<BookingGatewayError> for SettlementError {
    fn from(e: BookingGatewayError) -> Self {
        match e {
            BookingGatewayError::BookingNotFound(id) => SettlementError::BookingNotFound(id),
            BookingGatewayError::WalletNotApplicable { wallet, subtotal } => {
                SettlementError::WalletNotApplicable { wallet, subtotal }
            },
            BookingGatewayError::UserAccountNotFound(customer_id) => {
                SettlementError::UserAccountNotFound(customer_id)
            },
            other => SettlementError::DatabaseError(other.to_string()),
        }
    }
}

impl From<BookingQueryError> for SettlementError {
    fn from(e: BookingQueryError) -> Self {
        SettlementError::DatabaseError(e.to_string())
    }
}

impl From<WalletApiError> for SettlementError {
    fn from(e: WalletApiError) -> Self {
        match e {
            WalletApiError::AccountNotFound(customer_id) => SettlementError::UserAccountNotFound(customer_id),
            other => SettlementError::DatabaseError(other.to_string()),
        }
    }
}
