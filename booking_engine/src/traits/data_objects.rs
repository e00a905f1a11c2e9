use hsb_common::Paise;
use serde::{Deserialize, Serialize};

use crate::db_types::{Booking, ValidationError};

/// The result of a multi-item checkout. Items are processed independently, so a summary can carry
/// created bookings and rejected line items at the same time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutSummary {
    pub bookings: Vec<Booking>,
    pub rejected: Vec<RejectedItem>,
    /// Notifications handed to the sender successfully. One per (booking, eligible partner) pair.
    pub notified: usize,
    /// Notification attempts that failed. Logged upstream; recorded here for observability only.
    pub notify_failures: usize,
}

impl CheckoutSummary {
    pub fn booking_count(&self) -> usize {
        self.bookings.len()
    }

    pub fn all_accepted(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// A checkout line item that failed validation, keyed by its position in the submitted batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedItem {
    pub index: usize,
    pub reason: String,
}

impl RejectedItem {
    pub fn new(index: usize, error: &ValidationError) -> Self {
        Self { index, reason: error.to_string() }
    }
}

/// The result of applying a verified payment to a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementOutcome {
    pub booking: Booking,
    /// The wallet leg of the settlement. Zero when the wallet was not elected, and on the idempotent
    /// re-application path.
    pub wallet_debited: Paise,
    /// True when the booking was already `Paid` and this call was a no-op.
    pub already_paid: bool,
}
