use chrono::Duration;
use hsb_common::Paise;
use thiserror::Error;

use crate::{
    db_types::{Booking, NewBooking, Partner},
    traits::{data_objects::SettlementOutcome, BookingManagement, BookingQueryError},
};

/// This trait defines the highest level of behaviour for backends supporting the booking engine.
///
/// This behaviour includes:
/// * Persisting checkout requests as new bookings.
/// * The first-to-claim arbitration write.
/// * The time-boxed requester cancellation.
/// * Settlement (wallet debit + payment-status flip) and completion.
///
/// Every method that changes more than one row does so inside a single database transaction.
#[allow(async_fn_in_trait)]
pub trait BookingGatewayDatabase: Clone + BookingManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Persists a single validated checkout line item as a new `Active`, unassigned, payment-pending
    /// booking. Returns the stored record.
    ///
    /// Multi-item checkouts call this once per line item. Items are deliberately independent: a failing
    /// sibling must not roll this insert back.
    async fn insert_booking(&self, booking: NewBooking) -> Result<Booking, BookingGatewayError>;

    /// Attempts to claim the booking for the given partner.
    ///
    /// The write is a single conditional update ("set partner fields where they are currently unset"),
    /// never a read-then-write pair, so at most one of any number of racing claimants can win. The
    /// winner's `jobs_pending` counter is incremented in the same transaction.
    ///
    /// Returns the updated booking on success. Fails with [`BookingGatewayError::AlreadyClaimed`] when
    /// the conditional write lost the race, and [`BookingGatewayError::BookingNotFound`] when the id
    /// does not refer to a live booking (absent, cancelled or completed) — callers surface these
    /// differently ("already taken" vs "no longer available").
    async fn claim_booking(&self, booking_id: i64, partner: &Partner) -> Result<Booking, BookingGatewayError>;

    /// Requester-initiated cancellation.
    ///
    /// Permitted only while the booking is `Active`, unclaimed, owned by `customer_id`, and younger
    /// than `window` — all evaluated in one conditional update against the database clock, so a
    /// client-supplied timestamp can never widen the window.
    async fn cancel_booking(
        &self,
        booking_id: i64,
        customer_id: &str,
        window: Duration,
    ) -> Result<Booking, BookingGatewayError>;

    /// Marks a claimed booking as carried out. Terminal.
    ///
    /// Only the assigned partner (or an admin acting as them) may complete. Moves the partner's
    /// pending-job counter to completed and credits the booking price to partner revenue, all in one
    /// transaction.
    async fn complete_booking(&self, booking_id: i64, partner_id: i64) -> Result<Booking, BookingGatewayError>;

    /// Applies a verified payment to the booking.
    ///
    /// In a single transaction: re-checks the wallet election rule when `use_wallet` is set (the wallet
    /// balance must be strictly less than the booking price), debits the wallet leg, and flips the
    /// payment status to `Paid`.
    ///
    /// Idempotent: settling an already-paid booking is a no-op success and debits nothing, so the call
    /// is safe to retry after a crash between verification and application.
    async fn settle_booking(
        &self,
        booking_id: i64,
        customer_id: &str,
        use_wallet: bool,
    ) -> Result<SettlementOutcome, BookingGatewayError>;

    /// Hides the booking from the given partner's queue view. Idempotent append to the booking's
    /// dismissal set; no other booking field changes and other partners' views are unaffected.
    async fn dismiss_booking(&self, booking_id: i64, partner_id: i64) -> Result<(), BookingGatewayError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), BookingGatewayError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum BookingGatewayError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("The requested booking {0} does not exist")]
    BookingNotFound(i64),
    #[error("Booking {0} was already claimed by another partner")]
    AlreadyClaimed(i64),
    #[error("Cancellation is not allowed: {0}")]
    CancellationNotAllowed(String),
    #[error("Booking {0} is not assigned to the requesting partner")]
    NotAssignedToPartner(i64),
    #[error("No user account exists for customer {0}")]
    UserAccountNotFound(String),
    #[error("Wallet cannot be applied: balance {wallet} covers the subtotal {subtotal}")]
    WalletNotApplicable { wallet: Paise, subtotal: Paise },
    #[error("{0}")]
    QueryError(#[from] BookingQueryError),
}

impl From<sqlx::Error> for BookingGatewayError {
    fn from(e: sqlx::Error) -> Self {
        BookingGatewayError::DatabaseError(e.to_string())
    }
}

impl From<crate::traits::WalletApiError> for BookingGatewayError {
    fn from(e: crate::traits::WalletApiError) -> Self {
        match e {
            crate::traits::WalletApiError::AccountNotFound(customer_id) => {
                BookingGatewayError::UserAccountNotFound(customer_id)
            },
            other => BookingGatewayError::DatabaseError(other.to_string()),
        }
    }
}
