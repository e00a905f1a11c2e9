use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;

use crate::{
    bke_api::errors::BookingFlowError,
    booking_objects::BookingQueryFilter,
    db_types::{Booking, BookingStatus},
    events::{BookingCancelledEvent, BookingClaimedEvent, EventProducers},
    traits::{BookingGatewayDatabase, PartnerManagement},
};

const DEFAULT_CANCELLATION_WINDOW: Duration = Duration::hours(2);

/// `BookingFlowApi` drives the booking lifecycle after checkout: the first-to-claim arbitration, the
/// time-boxed requester cancellation, completion, and the read projections over a requester's or
/// partner's bookings.
pub struct BookingFlowApi<B> {
    db: B,
    cancellation_window: Duration,
    producers: EventProducers,
}

impl<B> Debug for BookingFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BookingFlowApi")
    }
}

impl<B> BookingFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, cancellation_window: DEFAULT_CANCELLATION_WINDOW, producers }
    }

    pub fn with_cancellation_window(mut self, window: Duration) -> Self {
        self.cancellation_window = window;
        self
    }

    pub fn cancellation_window(&self) -> Duration {
        self.cancellation_window
    }
}

impl<B> BookingFlowApi<B>
where B: BookingGatewayDatabase + PartnerManagement
{
    /// A partner accepts an open booking. First to accept wins.
    ///
    /// The caller must be an approved partner. The storage layer performs the arbitration as a single
    /// conditional write, so under racing claims exactly one caller receives the booking and the rest
    /// receive [`BookingFlowError::AlreadyClaimed`].
    pub async fn claim_booking(&self, booking_id: i64, partner_id: i64) -> Result<Booking, BookingFlowError> {
        let partner =
            self.db.fetch_partner(partner_id).await?.ok_or(BookingFlowError::PartnerNotFound(partner_id))?;
        if !partner.is_approved() {
            warn!("🔄️ Unapproved partner #{partner_id} tried to claim booking [{booking_id}]");
            return Err(BookingFlowError::PartnerNotApproved(partner_id));
        }
        let booking = self.db.claim_booking(booking_id, &partner).await?;
        self.call_booking_claimed_hook(&booking).await;
        debug!("🔄️ Booking [{booking_id}] claimed by partner #{partner_id}");
        Ok(booking)
    }

    /// Requester-initiated cancellation. Permitted only while the booking is unclaimed and younger than
    /// the cancellation window; both checks run against the database clock.
    pub async fn cancel_booking(&self, booking_id: i64, customer_id: &str) -> Result<Booking, BookingFlowError> {
        let booking = self.db.cancel_booking(booking_id, customer_id, self.cancellation_window).await?;
        self.call_booking_cancelled_hook(&booking).await;
        debug!("🔄️ Booking [{booking_id}] cancelled by requester");
        Ok(booking)
    }

    /// The assigned partner marks the job as carried out. Terminal.
    pub async fn complete_booking(&self, booking_id: i64, partner_id: i64) -> Result<Booking, BookingFlowError> {
        let booking = self.db.complete_booking(booking_id, partner_id).await?;
        debug!("🔄️ Booking [{booking_id}] completed");
        Ok(booking)
    }

    /// The requester's upcoming bookings: still `Active`, scheduled today or later, newest last.
    pub async fn active_bookings(&self, customer_id: &str) -> Result<Vec<Booking>, BookingFlowError> {
        let today = Utc::now().date_naive();
        let query = BookingQueryFilter::default()
            .with_customer_id(customer_id)
            .with_status(BookingStatus::Active)
            .scheduled_on_or_after(today);
        let bookings = self.db.search_bookings(query).await?;
        Ok(bookings)
    }

    /// The requester's booking history: everything scheduled in the past plus completed jobs, with
    /// cancelled bookings excluded. A derived view, not a lifecycle state.
    pub async fn booking_history(&self, customer_id: &str) -> Result<Vec<Booking>, BookingFlowError> {
        let today = Utc::now().date_naive();
        let past = BookingQueryFilter::default()
            .with_customer_id(customer_id)
            .with_status(BookingStatus::Active)
            .with_status(BookingStatus::Completed)
            .scheduled_before(today);
        let mut history = self.db.search_bookings(past).await?;
        // Completed jobs belong in history even when their requested date has not passed yet.
        let completed_upcoming = BookingQueryFilter::default()
            .with_customer_id(customer_id)
            .with_status(BookingStatus::Completed)
            .scheduled_on_or_after(today);
        history.extend(self.db.search_bookings(completed_upcoming).await?);
        history.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(history)
    }

    /// The partner's open-order queue. Approval is enforced here; eligibility (skill + active pincode)
    /// and the partner's own dismissals are applied by the storage query.
    pub async fn open_bookings_for_partner(&self, partner_id: i64) -> Result<Vec<Booking>, BookingFlowError> {
        let partner =
            self.db.fetch_partner(partner_id).await?.ok_or(BookingFlowError::PartnerNotFound(partner_id))?;
        if !partner.is_approved() {
            return Err(BookingFlowError::PartnerNotApproved(partner_id));
        }
        let bookings = self.db.open_bookings_for_partner(partner_id).await?;
        Ok(bookings)
    }

    /// Hides a booking from this partner's queue only. Idempotent; other partners are unaffected.
    pub async fn dismiss_booking(&self, booking_id: i64, partner_id: i64) -> Result<(), BookingFlowError> {
        self.db.dismiss_booking(booking_id, partner_id).await?;
        Ok(())
    }

    async fn call_booking_claimed_hook(&self, booking: &Booking) {
        for emitter in &self.producers.booking_claimed_producer {
            trace!("🔄️ Notifying booking claimed hook subscribers");
            let event = BookingClaimedEvent::new(booking.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_booking_cancelled_hook(&self, booking: &Booking) {
        for emitter in &self.producers.booking_cancelled_producer {
            trace!("🔄️ Notifying booking cancelled hook subscribers");
            let event = BookingCancelledEvent::new(booking.clone());
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
