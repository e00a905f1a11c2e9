use hsb_common::Paise;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Notification to {recipient} failed: {reason}")]
pub struct NotificationError {
    pub recipient: String,
    pub reason: String,
}

impl NotificationError {
    pub fn new<S: Into<String>>(recipient: S, reason: S) -> Self {
        Self { recipient: recipient.into(), reason: reason.into() }
    }
}

/// Out-of-band notification dispatch (email in production).
///
/// Delivery is best-effort. The engine logs and counts failures but never propagates them into the
/// triggering request, and assumes no delivery guarantee beyond what `send` reports.
#[allow(async_fn_in_trait)]
pub trait NotificationSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotificationError>;
}

//--------------------------------------  Payment provider   ---------------------------------------------------------

/// An order registered with the payment aggregator. The `order_id` is opaque to the engine; it is the
/// handle the payer's client completes the payment against, and the value later signed in the payment
/// confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderOrder {
    pub order_id: String,
    pub amount: Paise,
    pub currency: String,
}

#[derive(Debug, Clone, Error)]
pub enum PaymentProviderError {
    #[error("The payment provider rejected the order: {0}")]
    OrderRejected(String),
    #[error("The payment provider is unreachable: {0}")]
    Unavailable(String),
    #[error("Timed out waiting for the payment provider")]
    Timeout,
}

impl PaymentProviderError {
    /// Provider outages and timeouts are worth retrying; a rejected order is not.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, PaymentProviderError::OrderRejected(_))
    }
}

/// The upstream payment aggregator, reduced to the one call the engine makes: registering an order for
/// a given amount so the payer can complete it out-of-band.
#[allow(async_fn_in_trait)]
pub trait PaymentProvider {
    async fn create_order(
        &self,
        amount: Paise,
        currency: &str,
        receipt: &str,
    ) -> Result<ProviderOrder, PaymentProviderError>;
}
