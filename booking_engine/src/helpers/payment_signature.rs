//! # Payment confirmation signatures
//!
//! When a payer completes a payment with the upstream aggregator, the aggregator's client-side flow
//! hands the application a `(order_id, payment_id, signature)` triple. The signature is an HMAC-SHA256
//! over the string `"{order_id}|{payment_id}"`, keyed with the shared API secret, hex-encoded.
//!
//! The engine recomputes the tag and compares it to the supplied signature in constant time. A mismatch
//! is an *expected outcome* ([`VerificationOutcome::Failed`]), not an error: payers mistype nothing,
//! but tampered or replayed confirmations arrive in the normal course of business and must simply be
//! rejected.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// The confirmation triple supplied by the payer's client after completing a payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub order_id: String,
    pub payment_id: String,
    /// Hex-encoded HMAC-SHA256 tag.
    pub signature: String,
}

impl PaymentConfirmation {
    pub fn new<S: Into<String>>(order_id: S, payment_id: S, signature: S) -> Self {
        Self { order_id: order_id.into(), payment_id: payment_id.into(), signature: signature.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified,
    Failed,
}

impl VerificationOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationOutcome::Verified)
    }
}

pub fn signature_message(order_id: &str, payment_id: &str) -> String {
    format!("{order_id}|{payment_id}")
}

fn hmac_for(secret: &str, order_id: &str, payment_id: &str) -> HmacSha256 {
    // HMAC-SHA256 accepts keys of any length, so this cannot fail.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take a key of any size");
    mac.update(signature_message(order_id, payment_id).as_bytes());
    mac
}

/// Computes the hex-encoded signature for the given confirmation ids. Primarily useful for tests and
/// tooling; production signatures are computed by the aggregator.
pub fn sign_confirmation(secret: &str, order_id: &str, payment_id: &str) -> String {
    let tag = hmac_for(secret, order_id, payment_id).finalize().into_bytes();
    to_hex(&tag)
}

/// Recomputes the tag and compares it against `confirmation.signature` in constant time.
///
/// A signature that is not valid hex can never match and verifies as `Failed`; callers that want to
/// report malformed input separately should shape-check the confirmation first.
pub fn verify_confirmation(secret: &str, confirmation: &PaymentConfirmation) -> VerificationOutcome {
    let supplied = match from_hex(&confirmation.signature) {
        Some(bytes) => bytes,
        None => return VerificationOutcome::Failed,
    };
    let mac = hmac_for(secret, &confirmation.order_id, &confirmation.payment_id);
    match mac.verify_slice(&supplied) {
        Ok(()) => VerificationOutcome::Verified,
        Err(_) => VerificationOutcome::Failed,
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn from_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len()).step_by(2).map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok()).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    const SECRET: &str = "test-hmac-secret";

    #[test]
    fn round_trip() {
        let signature = sign_confirmation(SECRET, "order_1", "pay_1");
        let confirmation = PaymentConfirmation::new("order_1", "pay_1", &signature);
        assert_eq!(verify_confirmation(SECRET, &confirmation), VerificationOutcome::Verified);
    }

    #[test]
    fn message_format() {
        assert_eq!(signature_message("order_1", "pay_1"), "order_1|pay_1");
    }

    #[test]
    fn any_single_character_mutation_fails() {
        let signature = sign_confirmation(SECRET, "order_1", "pay_1");
        for i in 0..signature.len() {
            let mut mutated = signature.clone().into_bytes();
            mutated[i] = if mutated[i] == b'0' { b'1' } else { b'0' };
            let mutated = String::from_utf8(mutated).unwrap();
            let confirmation = PaymentConfirmation::new("order_1", "pay_1", mutated.as_str());
            assert_eq!(verify_confirmation(SECRET, &confirmation), VerificationOutcome::Failed, "index {i}");
        }
    }

    #[test]
    fn wrong_ids_fail() {
        let signature = sign_confirmation(SECRET, "order_1", "pay_1");
        let confirmation = PaymentConfirmation::new("order_1", "pay_2", signature.as_str());
        assert_eq!(verify_confirmation(SECRET, &confirmation), VerificationOutcome::Failed);
    }

    #[test]
    fn garbage_signature_fails() {
        let confirmation = PaymentConfirmation::new("order_1", "pay_1", "not-hex-at-all");
        assert_eq!(verify_confirmation(SECRET, &confirmation), VerificationOutcome::Failed);
    }
}
