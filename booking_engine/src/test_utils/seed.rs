//! Convenience builders for seeding test databases with realistic records.

use chrono::{Duration, Utc};
use hsb_common::Paise;

use crate::{
    db_types::{ApprovalStatus, NewBooking, NewPartner, ServicePincode},
    traits::{PartnerManagement, WalletManagement},
};

/// A fully populated, valid booking request.
pub fn booking_request(customer_id: &str, service: &str, pincode: &str, price: Paise) -> NewBooking {
    let mut request = NewBooking::new(customer_id, service, pincode, price);
    request.customer_name = "Test Customer".to_string();
    request.customer_contact = "customer@example.com".to_string();
    request.service_date = (Utc::now() + Duration::days(3)).date_naive();
    request.time_slot = "10:00-12:00".to_string();
    request.address = "14 Ring Road".to_string();
    request
}

pub fn partner_signup(name: &str, email: &str, skills: &[&str], pincodes: &[&str]) -> NewPartner {
    NewPartner {
        name: name.to_string(),
        email: email.to_string(),
        phone: "9822001100".to_string(),
        password_hash: "argon2id$test-only".to_string(),
        skills: skills.iter().map(|s| s.to_string()).collect(),
        service_pincodes: pincodes
            .iter()
            .map(|p| ServicePincode { pincode: p.to_string(), active: true })
            .collect(),
    }
}

/// Inserts and approves a partner, returning the new partner id.
pub async fn approved_partner<B: PartnerManagement>(
    db: &B,
    name: &str,
    email: &str,
    skills: &[&str],
    pincodes: &[&str],
) -> i64 {
    let partner_id =
        db.insert_partner(partner_signup(name, email, skills, pincodes)).await.expect("Error inserting partner");
    db.set_partner_approval(partner_id, ApprovalStatus::Approved).await.expect("Error approving partner");
    partner_id
}

/// Ensures a user account exists with the given wallet balance.
pub async fn user_with_wallet<B: WalletManagement>(db: &B, customer_id: &str, wallet: Paise) {
    db.upsert_user_account(customer_id, "Test Customer", "customer@example.com")
        .await
        .expect("Error creating user account");
    if wallet.value() != 0 {
        db.adjust_wallet(customer_id, wallet).await.expect("Error crediting wallet");
    }
}
