mod payment_signature;
mod receipts;

pub use payment_signature::{
    sign_confirmation,
    signature_message,
    verify_confirmation,
    PaymentConfirmation,
    VerificationOutcome,
};
pub use receipts::new_receipt_id;
