//! Booking Engine
//!
//! The booking engine is the core of a local-services marketplace: it matches customer bookings to
//! approved service partners by skill and pincode, arbitrates competing claims ("first to accept
//! wins"), settles payments (online, optionally offset by wallet credit), and answers the requester and
//! partner views over the booking set. It is transport-agnostic; the HTTP/UI layer lives elsewhere and
//! consumes this library.
//!
//! The library is divided into two main sections:
//! 1. Database management and control. Currently, SQLite is the supported backend. You should never
//!    need to access the database directly. Instead, use the public API provided by the engine. The
//!    exception is the data types used in the database. These are defined in the `db_types` module and
//!    are public.
//! 2. The engine public API ([`mod@bke_api`]). This provides the public-facing functionality of the
//!    engine: checkout matching and notification, the booking lifecycle, and payment settlement.
//!    Specific backends need to implement the traits in the [`mod@traits`] module in order to act as a
//!    backend for the engine.
//!
//! The engine also provides a set of events that can be subscribed to. These events are emitted when
//! certain actions occur within the engine. For example, when a booking is claimed, a
//! `BookingClaimedEvent` is emitted. A simple actor framework is used so that you can easily hook into
//! these events and perform custom actions.
pub mod bke_api;
pub mod booking_objects;
pub mod config;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod traits;

pub mod test_utils;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use bke_api::{
    booking_flow_api::BookingFlowApi,
    errors::{BookingFlowError, MatcherError, SettlementError},
    matcher_api::MatcherApi,
    settlement_api::{PaymentOrder, SettlementApi},
};
pub use traits::{
    BookingGatewayDatabase,
    BookingManagement,
    NotificationSender,
    PartnerManagement,
    PaymentProvider,
    WalletManagement,
};
