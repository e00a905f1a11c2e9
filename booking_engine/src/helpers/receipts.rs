use rand::Rng;

/// Builds a receipt id to hand to the payment provider when registering an order. The booking id keeps
/// receipts traceable; the random suffix keeps retried registrations distinct.
pub fn new_receipt_id(booking_id: i64) -> String {
    let suffix: u32 = rand::thread_rng().gen();
    format!("bk_{booking_id}_{suffix:08x}")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn receipt_ids_embed_the_booking_id() {
        let receipt = new_receipt_id(42);
        assert!(receipt.starts_with("bk_42_"));
        assert_eq!(receipt.len(), "bk_42_".len() + 8);
    }
}
