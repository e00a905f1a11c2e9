use hsb_common::Paise;
use serde::{Deserialize, Serialize};

use crate::db_types::Booking;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingClaimedEvent {
    pub booking: Booking,
}

impl BookingClaimedEvent {
    pub fn new(booking: Booking) -> Self {
        Self { booking }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingPaidEvent {
    pub booking: Booking,
    /// The wallet leg of the settlement, if any.
    pub wallet_debited: Paise,
}

impl BookingPaidEvent {
    pub fn new(booking: Booking, wallet_debited: Paise) -> Self {
        Self { booking, wallet_debited }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingCancelledEvent {
    pub booking: Booking,
}

impl BookingCancelledEvent {
    pub fn new(booking: Booking) -> Self {
        Self { booking }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventType {
    BookingClaimed(BookingClaimedEvent),
    BookingPaid(BookingPaidEvent),
    BookingCancelled(BookingCancelledEvent),
}
