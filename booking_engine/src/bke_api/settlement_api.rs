use std::{fmt::Debug, time::Duration};

use hsb_common::{Paise, Secret, INR_CURRENCY_CODE};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    bke_api::errors::SettlementError,
    db_types::Booking,
    events::{BookingPaidEvent, EventProducers},
    helpers::{new_receipt_id, verify_confirmation, PaymentConfirmation, VerificationOutcome},
    traits::{
        BookingGatewayDatabase,
        PaymentProvider,
        PaymentProviderError,
        ProviderOrder,
        SettlementOutcome,
        WalletManagement,
    },
};

const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// A registered payment order, ready for the payer's client to complete, together with the amounts the
/// engine computed for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOrder {
    pub order: ProviderOrder,
    /// The amount handed to the provider: the booking price net of the wallet leg.
    pub payable: Paise,
    /// The wallet leg that settlement will debit when the payment is applied.
    pub wallet_applied: Paise,
}

/// `SettlementApi` is the payment side of the engine: it registers orders with the upstream payment
/// provider, verifies payment confirmations, and converts verified confirmations into persisted `Paid`
/// booking state.
pub struct SettlementApi<B, P> {
    db: B,
    provider: P,
    signing_secret: Secret<String>,
    provider_timeout: Duration,
    producers: EventProducers,
}

impl<B, P> Debug for SettlementApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi")
    }
}

impl<B, P> SettlementApi<B, P> {
    pub fn new(db: B, provider: P, signing_secret: Secret<String>, producers: EventProducers) -> Self {
        Self { db, provider, signing_secret, provider_timeout: DEFAULT_PROVIDER_TIMEOUT, producers }
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }
}

impl<B, P> SettlementApi<B, P>
where
    B: BookingGatewayDatabase + WalletManagement,
    P: PaymentProvider,
{
    /// Registers a payment order for the booking with the upstream provider.
    ///
    /// The payable amount is the booking price net of the wallet leg. Electing the wallet is only
    /// permitted while the wallet balance is strictly less than the price; a wallet that covers the
    /// whole order is rejected with [`SettlementError::WalletNotApplicable`].
    ///
    /// The provider call runs under a bounded timeout; timeouts and outages surface as retryable
    /// [`SettlementError::PaymentProvider`] errors.
    pub async fn create_payment_order(
        &self,
        booking_id: i64,
        customer_id: &str,
        use_wallet: bool,
    ) -> Result<PaymentOrder, SettlementError> {
        let booking = self.fetch_owned_booking(booking_id, customer_id).await?;
        if booking.is_paid() {
            return Err(SettlementError::ValidationError(format!("booking {booking_id} is already paid")));
        }
        let wallet_applied = self.wallet_leg(&booking, use_wallet).await?;
        let payable = booking.price - wallet_applied;
        if !payable.is_positive() {
            // Unreachable while the wallet election rule holds; kept as a hard stop so a zero-amount
            // order can never reach the provider.
            return Err(SettlementError::ValidationError(format!(
                "payable amount for booking {booking_id} is not positive"
            )));
        }
        let receipt = new_receipt_id(booking_id);
        let order = tokio::time::timeout(
            self.provider_timeout,
            self.provider.create_order(payable, INR_CURRENCY_CODE, &receipt),
        )
        .await
        .map_err(|_| PaymentProviderError::Timeout)??;
        debug!(
            "💳️ Payment order [{}] registered for booking [{booking_id}]: {payable} payable, {wallet_applied} from \
             wallet",
            order.order_id
        );
        Ok(PaymentOrder { order, payable, wallet_applied })
    }

    /// Verifies a payment confirmation against the shared signing secret.
    ///
    /// A mismatched signature is an expected outcome ([`VerificationOutcome::Failed`]), not an error.
    /// Malformed input (empty ids, signature of the wrong shape) is a [`SettlementError::ValidationError`].
    pub fn verify_payment(&self, confirmation: &PaymentConfirmation) -> Result<VerificationOutcome, SettlementError> {
        if confirmation.order_id.trim().is_empty() || confirmation.payment_id.trim().is_empty() {
            return Err(SettlementError::ValidationError(
                "order_id and payment_id must be supplied".to_string(),
            ));
        }
        // HMAC-SHA256 tags are 32 bytes, so well-formed signatures are 64 hex characters.
        if confirmation.signature.len() != 64 || !confirmation.signature.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(SettlementError::ValidationError(
                "signature must be a 64-character hex string".to_string(),
            ));
        }
        let outcome = verify_confirmation(self.signing_secret.reveal(), confirmation);
        if outcome == VerificationOutcome::Failed {
            info!("💳️ Signature verification failed for payment order [{}]", confirmation.order_id);
        }
        Ok(outcome)
    }

    /// Applies a (previously verified) payment to the booking: debits the wallet leg and flips the
    /// payment status, in one storage transaction.
    ///
    /// Idempotent: re-applying to a paid booking is a no-op success with no second wallet debit, so the
    /// call is safe to retry after a crash between verification and application.
    pub async fn apply_payment(
        &self,
        booking_id: i64,
        customer_id: &str,
        use_wallet: bool,
    ) -> Result<SettlementOutcome, SettlementError> {
        let outcome = self.db.settle_booking(booking_id, customer_id, use_wallet).await?;
        if outcome.already_paid {
            debug!("💳️ Booking [{booking_id}] was already settled. No changes made.");
        } else {
            self.call_booking_paid_hook(&outcome).await;
            debug!("💳️ Booking [{booking_id}] settled. Wallet leg: {}", outcome.wallet_debited);
        }
        Ok(outcome)
    }

    /// Verification and application as one logical step. Prefer this over calling [`Self::verify_payment`]
    /// and [`Self::apply_payment`] separately so a verified payment is never left unreflected in booking
    /// state.
    pub async fn confirm_and_apply(
        &self,
        booking_id: i64,
        customer_id: &str,
        confirmation: &PaymentConfirmation,
        use_wallet: bool,
    ) -> Result<SettlementOutcome, SettlementError> {
        match self.verify_payment(confirmation)? {
            VerificationOutcome::Verified => self.apply_payment(booking_id, customer_id, use_wallet).await,
            VerificationOutcome::Failed => Err(SettlementError::VerificationFailed),
        }
    }

    /// The wallet leg of a settlement: zero when not elected, the full balance otherwise. Enforces the
    /// strict `wallet < subtotal` election rule.
    async fn wallet_leg(&self, booking: &Booking, use_wallet: bool) -> Result<Paise, SettlementError> {
        if !use_wallet {
            return Ok(Paise::from(0));
        }
        let account = self
            .db
            .fetch_user_account(&booking.customer_id)
            .await?
            .ok_or_else(|| SettlementError::UserAccountNotFound(booking.customer_id.clone()))?;
        if account.wallet >= booking.price {
            return Err(SettlementError::WalletNotApplicable { wallet: account.wallet, subtotal: booking.price });
        }
        Ok(account.wallet)
    }

    async fn fetch_owned_booking(&self, booking_id: i64, customer_id: &str) -> Result<Booking, SettlementError> {
        let booking =
            self.db.fetch_booking(booking_id).await?.ok_or(SettlementError::BookingNotFound(booking_id))?;
        // Bookings belonging to other customers are reported as absent rather than leaking state.
        if booking.customer_id != customer_id {
            return Err(SettlementError::BookingNotFound(booking_id));
        }
        Ok(booking)
    }

    async fn call_booking_paid_hook(&self, outcome: &SettlementOutcome) {
        for emitter in &self.producers.booking_paid_producer {
            trace!("💳️ Notifying booking paid hook subscribers");
            let event = BookingPaidEvent::new(outcome.booking.clone(), outcome.wallet_debited);
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
