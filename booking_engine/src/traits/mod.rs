//! # Backend and collaborator interface contracts.
//!
//! This module defines the interfaces that storage backends and external collaborators must implement
//! to drive the booking engine.
//!
//! ## Bookings
//! A booking ties a requester, a service, a time and place, and (after a successful claim) a partner.
//! The [`BookingGatewayDatabase`] trait owns every state-changing flow: persisting checkout requests,
//! the first-to-claim conditional write, the time-boxed cancellation, settlement, and completion.
//! [`BookingManagement`] provides the read-only queries over the same records.
//!
//! ## Partners and wallets
//! [`PartnerManagement`] manages partner records and answers the eligibility query that the matcher
//! and the partner queue view share. [`WalletManagement`] exposes requester accounts and their wallet
//! balances.
//!
//! ## Collaborators
//! [`NotificationSender`] and [`PaymentProvider`] are implemented outside the engine (SMTP relay,
//! payment aggregator SDK). The engine only depends on these narrow contracts and treats both as
//! unreliable: notification failures are tolerated, provider failures are retryable errors.
mod booking_gateway_database;
mod booking_management;
mod collaborators;

mod partner_management;

mod wallet_management;

mod data_objects;

pub use booking_gateway_database::{BookingGatewayDatabase, BookingGatewayError};
pub use booking_management::{BookingManagement, BookingQueryError};
pub use collaborators::{NotificationError, NotificationSender, PaymentProvider, PaymentProviderError, ProviderOrder};
pub use data_objects::{CheckoutSummary, RejectedItem, SettlementOutcome};
pub use partner_management::{PartnerApiError, PartnerManagement};
pub use wallet_management::{WalletApiError, WalletManagement};
