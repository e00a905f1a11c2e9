use thiserror::Error;

use crate::{booking_objects::BookingQueryFilter, db_types::Booking};

#[derive(Debug, Clone, Error)]
pub enum BookingQueryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("User error constructing query: {0}")]
    QueryError(String),
}

impl From<sqlx::Error> for BookingQueryError {
    fn from(e: sqlx::Error) -> Self {
        BookingQueryError::DatabaseError(e.to_string())
    }
}

/// Read-only queries over booking records.
///
/// The [`BookingGatewayDatabase`] trait handles the state-changing flows; `BookingManagement` answers
/// questions about the same records: single lookups, filtered searches, and the per-partner open-order
/// queue.
///
/// [`BookingGatewayDatabase`]: crate::traits::BookingGatewayDatabase
#[allow(async_fn_in_trait)]
pub trait BookingManagement {
    /// Fetches the booking with the given id. If no booking exists, `None` is returned.
    async fn fetch_booking(&self, booking_id: i64) -> Result<Option<Booking>, BookingQueryError>;

    /// Fetches bookings according to the criteria in the filter, ordered by creation time.
    async fn search_bookings(&self, query: BookingQueryFilter) -> Result<Vec<Booking>, BookingQueryError>;

    /// The partner's open-order queue: unclaimed `Active` bookings the partner is eligible for
    /// (approval + skill + active pincode), minus bookings the partner has dismissed, newest first.
    ///
    /// Dismissals are per-partner; a booking hidden here stays visible to every other partner.
    async fn open_bookings_for_partner(&self, partner_id: i64) -> Result<Vec<Booking>, BookingQueryError>;
}
