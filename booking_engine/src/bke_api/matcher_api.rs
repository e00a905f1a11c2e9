use std::{fmt::Debug, time::Duration};

use futures_util::future::join_all;
use log::*;

use crate::{
    bke_api::errors::MatcherError,
    db_types::{Booking, NewBooking},
    traits::{
        BookingGatewayDatabase,
        CheckoutSummary,
        NotificationSender,
        PartnerManagement,
        RejectedItem,
    },
};

const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// `MatcherApi` turns checkout requests into persisted bookings and tells every eligible partner about
/// them.
///
/// Line items are independent: a rejected item never rolls back its siblings. Notification dispatch is
/// best-effort: per-recipient failures are logged and counted, and never fail the checkout.
pub struct MatcherApi<B, N> {
    db: B,
    notifier: N,
    notify_timeout: Duration,
}

impl<B, N> Debug for MatcherApi<B, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MatcherApi")
    }
}

impl<B, N> MatcherApi<B, N> {
    pub fn new(db: B, notifier: N) -> Self {
        Self { db, notifier, notify_timeout: DEFAULT_NOTIFY_TIMEOUT }
    }

    pub fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }
}

impl<B, N> MatcherApi<B, N>
where
    B: BookingGatewayDatabase + PartnerManagement,
    N: NotificationSender,
{
    /// Processes a checkout of one or more booking requests.
    ///
    /// Each valid line item is persisted as a new unassigned, payment-pending booking, and one
    /// notification per (booking, eligible partner) pair is dispatched. Invalid items are reported in
    /// the summary without affecting the rest of the batch.
    pub async fn process_checkout(&self, requests: Vec<NewBooking>) -> Result<CheckoutSummary, MatcherError> {
        if requests.is_empty() {
            return Err(MatcherError::ValidationError("checkout contains no items".to_string()));
        }
        let mut summary = CheckoutSummary::default();
        for (index, request) in requests.into_iter().enumerate() {
            if let Err(e) = request.validate() {
                warn!("📦️ Checkout line {index} rejected: {e}");
                summary.rejected.push(RejectedItem::new(index, &e));
                continue;
            }
            let booking = self.db.insert_booking(request).await?;
            summary.bookings.push(booking);
        }
        for booking in &summary.bookings {
            let (sent, failed) = self.notify_eligible_partners(booking).await;
            summary.notified += sent;
            summary.notify_failures += failed;
        }
        debug!(
            "📦️ Checkout complete. {} booking(s) created, {} rejected, {} partner notification(s) sent, {} failed",
            summary.booking_count(),
            summary.rejected.len(),
            summary.notified,
            summary.notify_failures
        );
        Ok(summary)
    }

    /// Fans the new-booking notification out to every eligible partner. Failures here are deliberately
    /// swallowed: the bookings are already durable, and a broken mail relay must not fail a checkout.
    async fn notify_eligible_partners(&self, booking: &Booking) -> (usize, usize) {
        let partners = match self.db.eligible_partners(&booking.service, &booking.pincode).await {
            Ok(partners) => partners,
            Err(e) => {
                error!("📦️ Could not look up eligible partners for booking [{}]: {e}", booking.id);
                return (0, 0);
            },
        };
        if partners.is_empty() {
            info!(
                "📦️ No eligible partners for booking [{}] ({} at {}). It will wait in the open queue.",
                booking.id, booking.service, booking.pincode
            );
            return (0, 0);
        }
        let subject = format!("New booking request: {}", booking.service);
        let body = new_booking_notification(booking);
        let sends = partners.iter().map(|partner| {
            let subject = subject.as_str();
            let body = body.as_str();
            async move {
                match tokio::time::timeout(self.notify_timeout, self.notifier.send(&partner.email, subject, body))
                    .await
                {
                    Ok(Ok(())) => true,
                    Ok(Err(e)) => {
                        warn!("📦️ Notification for booking [{}] failed: {e}", booking.id);
                        false
                    },
                    Err(_) => {
                        warn!(
                            "📦️ Notification for booking [{}] to {} timed out after {:?}",
                            booking.id, partner.email, self.notify_timeout
                        );
                        false
                    },
                }
            }
        });
        let results = join_all(sends).await;
        let sent = results.iter().filter(|ok| **ok).count();
        (sent, results.len() - sent)
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

fn new_booking_notification(booking: &Booking) -> String {
    format!(
        "A new {service} booking is open in your service area.\n\nDate: {date}\nSlot: {slot}\nArea pincode: \
         {pincode}\nJob value: {price}\n\nOpen your dashboard to accept the job. First to accept wins.",
        service = booking.service,
        date = booking.service_date,
        slot = booking.time_slot,
        pincode = booking.pincode,
        price = booking.price,
    )
}
