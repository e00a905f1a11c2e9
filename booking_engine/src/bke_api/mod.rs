//! # Booking engine public API
//!
//! The `bke_api` module exposes the programmatic API for the booking engine.
//! The API is modular, so that clients of the API can pick and choose the functionality they want, and
//! each piece only demands the backend traits it actually uses.
//!
//! * [`matcher_api`] persists checkout requests as bookings and notifies every eligible partner.
//! * [`booking_flow_api`] drives the booking lifecycle: first-to-claim arbitration, the time-boxed
//!   requester cancellation, completion, and the requester/partner read projections.
//! * [`settlement_api`] registers payment orders, verifies payment confirmations and applies verified
//!   payments to bookings.
//!
//! # API usage
//!
//! The pattern for using all the APIs is the same. An API instance is created by supplying a database
//! backend that implements the specific backend traits required by the API (plus any external
//! collaborators the API talks to).
//!
//! For example, to create an API instance to drive booking lifecycles:
//!
//! ```rust,ignore
//! use booking_engine::{BookingFlowApi, EventProducers, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/hsb_store.db", 5).await?;
//! // SqliteDatabase implements BookingGatewayDatabase and PartnerManagement
//! let api = BookingFlowApi::new(db, EventProducers::default());
//! let booking = api.claim_booking(booking_id, partner_id).await?;
//! ```

pub mod booking_flow_api;
pub mod errors;
pub mod matcher_api;
pub mod settlement_api;
