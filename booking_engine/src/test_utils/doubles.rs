//! In-memory doubles for the engine's external collaborators.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
    Mutex,
};

use hsb_common::Paise;

use crate::traits::{NotificationError, NotificationSender, PaymentProvider, PaymentProviderError, ProviderOrder};

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Records every notification instead of sending it. Individual recipients can be marked as failing to
/// exercise the best-effort dispatch path.
#[derive(Clone, Default)]
pub struct MemoryNotifier {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    failing: Arc<Mutex<Vec<String>>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `send` to this address will fail from now on.
    pub fn fail_for<S: Into<String>>(&self, address: S) {
        self.failing.lock().unwrap().push(address.into());
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn recipients(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|m| m.to.clone()).collect()
    }
}

impl NotificationSender for MemoryNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotificationError> {
        if self.failing.lock().unwrap().iter().any(|a| a == to) {
            return Err(NotificationError::new(to, "simulated relay failure"));
        }
        self.sent.lock().unwrap().push(SentMessage {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// Hands out sequential order ids without talking to any upstream. Can be switched into outage mode to
/// exercise the retryable-error path.
#[derive(Clone, Default)]
pub struct StubPaymentProvider {
    counter: Arc<AtomicU64>,
    unavailable: Arc<AtomicBool>,
}

impl StubPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn orders_created(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

impl PaymentProvider for StubPaymentProvider {
    async fn create_order(
        &self,
        amount: Paise,
        currency: &str,
        _receipt: &str,
    ) -> Result<ProviderOrder, PaymentProviderError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PaymentProviderError::Unavailable("simulated outage".to_string()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ProviderOrder { order_id: format!("order_stub_{n}"), amount, currency: currency.to_string() })
    }
}
