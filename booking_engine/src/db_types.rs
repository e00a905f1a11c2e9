use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use hsb_common::Paise;
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------   PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// No verified payment has been applied to the booking yet.
    Pending,
    /// The booking has been paid in full (online, wallet-offset, or cash on delivery recorded by an admin).
    Paid,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Paid => write!(f, "Paid"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid status value: {0}")]
pub struct ConversionError(String);

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid payment status: {value}. But this conversion cannot fail. Defaulting to Pending");
            PaymentStatus::Pending
        })
    }
}

//--------------------------------------   BookingStatus     ---------------------------------------------------------
/// Bookings are never physically deleted. Completion and cancellation are status transitions, so the
/// completed-jobs history stays queryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum BookingStatus {
    /// The booking is live: unclaimed, or claimed and awaiting fulfilment.
    Active,
    /// The job was carried out. Terminal.
    Completed,
    /// The requester cancelled the booking inside the cancellation window. Terminal.
    Cancelled,
}

impl Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingStatus::Active => write!(f, "Active"),
            BookingStatus::Completed => write!(f, "Completed"),
            BookingStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for BookingStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(Self::Active),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid booking status: {s}"))),
        }
    }
}

impl From<String> for BookingStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid booking status: {value}. But this conversion cannot fail. Defaulting to Active");
            BookingStatus::Active
        })
    }
}

//--------------------------------------   ApprovalStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ApprovalStatus {
    /// Freshly signed up. Cannot authenticate, claim, or receive notifications.
    Pending,
    /// Vetted by an administrator. Full partner privileges.
    Approved,
    /// Rejected by an administrator.
    Rejected,
}

impl Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApprovalStatus::Pending => write!(f, "Pending"),
            ApprovalStatus::Approved => write!(f, "Approved"),
            ApprovalStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

impl FromStr for ApprovalStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Approved" => Ok(Self::Approved),
            "Rejected" => Ok(Self::Rejected),
            s => Err(ConversionError(format!("Invalid approval status: {s}"))),
        }
    }
}

impl From<String> for ApprovalStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid approval status: {value}. But this conversion cannot fail. Defaulting to Pending");
            ApprovalStatus::Pending
        })
    }
}

//--------------------------------------      Booking        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_contact: String,
    pub service: String,
    pub service_date: NaiveDate,
    pub time_slot: String,
    pub address: String,
    pub pincode: String,
    pub price: Paise,
    pub remark: Option<String>,
    /// Set exactly once, by the winning claim. `partner_id`, `partner_name` and `partner_contact` are
    /// always set (or unset) together.
    pub partner_id: Option<i64>,
    pub partner_name: Option<String>,
    pub partner_contact: Option<String>,
    pub payment_status: PaymentStatus,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn is_claimed(&self) -> bool {
        self.partner_id.is_some()
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }
}

//--------------------------------------     NewBooking      ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBooking {
    /// The requester, as supplied by the identity provider.
    pub customer_id: String,
    pub customer_name: String,
    pub customer_contact: String,
    /// The service being booked, e.g. "AC Repair". Matched verbatim against partner skills.
    pub service: String,
    pub service_date: NaiveDate,
    pub time_slot: String,
    pub address: String,
    pub pincode: String,
    pub price: Paise,
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Error)]
#[error("Invalid booking request: {0}")]
pub struct ValidationError(pub String);

impl NewBooking {
    pub fn new<S: Into<String>>(customer_id: S, service: S, pincode: S, price: Paise) -> Self {
        Self {
            customer_id: customer_id.into(),
            customer_name: String::default(),
            customer_contact: String::default(),
            service: service.into(),
            service_date: Utc::now().date_naive(),
            time_slot: String::default(),
            address: String::default(),
            pincode: pincode.into(),
            price,
            remark: None,
        }
    }

    /// Checks the request before it reaches the database. Requests arrive from the untrusted edge, so
    /// everything the engine relies on downstream is pinned here.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("customer_id", &self.customer_id),
            ("customer_name", &self.customer_name),
            ("customer_contact", &self.customer_contact),
            ("service", &self.service),
            ("time_slot", &self.time_slot),
            ("address", &self.address),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError(format!("{field} must not be empty")));
            }
        }
        let pincode_format = regex::Regex::new(r"^[1-9][0-9]{5}$").unwrap();
        if !pincode_format.is_match(&self.pincode) {
            return Err(ValidationError(format!("{} is not a valid pincode", self.pincode)));
        }
        if !self.price.is_positive() {
            return Err(ValidationError(format!("price must be positive, got {}", self.price)));
        }
        Ok(())
    }
}

//--------------------------------------      Partner        ---------------------------------------------------------
/// A service-provider account row. Capability data (skills, coverage pincodes) lives in child tables and is
/// carried by [`PartnerProfile`].
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Partner {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Opaque to the engine. Credential issuance and verification happen in the excluded identity layer.
    pub password_hash: String,
    pub approval: ApprovalStatus,
    pub jobs_pending: i64,
    pub jobs_completed: i64,
    pub rating: f64,
    pub revenue: Paise,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Partner {
    pub fn is_approved(&self) -> bool {
        self.approval == ApprovalStatus::Approved
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ServicePincode {
    pub pincode: String,
    /// Coverage of a pincode can be switched off without deleting the entry.
    pub active: bool,
}

/// A partner together with their declared capabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerProfile {
    pub partner: Partner,
    pub skills: Vec<String>,
    pub service_pincodes: Vec<ServicePincode>,
}

impl PartnerProfile {
    pub fn new(partner: Partner) -> Self {
        Self { partner, skills: Vec::new(), service_pincodes: Vec::new() }
    }

    pub fn with_skills(mut self, skills: Vec<String>) -> Self {
        self.skills = skills;
        self
    }

    pub fn with_service_pincodes(mut self, service_pincodes: Vec<ServicePincode>) -> Self {
        self.service_pincodes = service_pincodes;
        self
    }

    /// The eligibility rule. The matcher and the partner queue view both answer to this one predicate:
    /// approved, skill declared, and an *active* coverage entry for the pincode.
    pub fn is_eligible_for(&self, service: &str, pincode: &str) -> bool {
        self.partner.is_approved()
            && self.skills.iter().any(|s| s == service)
            && self.service_pincodes.iter().any(|p| p.pincode == pincode && p.active)
    }
}

//--------------------------------------    NewPartner       ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPartner {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    pub skills: Vec<String>,
    pub service_pincodes: Vec<ServicePincode>,
}

//--------------------------------------    UserAccount      ---------------------------------------------------------
/// A requester account. The wallet balance is monetary credit redeemable against booking prices at
/// settlement time.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserAccount {
    pub customer_id: String,
    pub name: String,
    pub email: String,
    pub wallet: Paise,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    fn partner(approval: ApprovalStatus) -> PartnerProfile {
        let partner = Partner {
            id: 1,
            name: "Asha Repairs".to_string(),
            email: "asha@example.com".to_string(),
            phone: "9822001100".to_string(),
            password_hash: "argon2id$dummy".to_string(),
            approval,
            jobs_pending: 0,
            jobs_completed: 0,
            rating: 0.0,
            revenue: Paise::from(0),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        PartnerProfile::new(partner)
            .with_skills(vec!["AC Repair".to_string()])
            .with_service_pincodes(vec![
                ServicePincode { pincode: "395007".to_string(), active: true },
                ServicePincode { pincode: "395009".to_string(), active: false },
            ])
    }

    #[test]
    fn eligibility_requires_skill_and_active_pincode() {
        let p = partner(ApprovalStatus::Approved);
        assert!(p.is_eligible_for("AC Repair", "395007"));
        assert!(!p.is_eligible_for("Plumbing", "395007"));
        assert!(!p.is_eligible_for("AC Repair", "400001"));
    }

    #[test]
    fn inactive_pincode_is_not_covered() {
        let p = partner(ApprovalStatus::Approved);
        assert!(!p.is_eligible_for("AC Repair", "395009"));
    }

    #[test]
    fn unapproved_partners_are_never_eligible() {
        for approval in [ApprovalStatus::Pending, ApprovalStatus::Rejected] {
            let p = partner(approval);
            assert!(!p.is_eligible_for("AC Repair", "395007"));
        }
    }

    #[test]
    fn booking_request_validation() {
        let mut req = NewBooking::new("cust-1", "AC Repair", "395007", Paise::from_rupees(500));
        req.customer_name = "Leela".to_string();
        req.customer_contact = "leela@example.com".to_string();
        req.time_slot = "10:00-12:00".to_string();
        req.address = "14 Ring Road".to_string();
        assert!(req.validate().is_ok());

        let mut missing = req.clone();
        missing.address = "  ".to_string();
        assert!(missing.validate().is_err());

        let mut bad_pin = req.clone();
        bad_pin.pincode = "0395007".to_string();
        assert!(bad_pin.validate().is_err());

        let mut free = req;
        free.price = Paise::from(0);
        assert!(free.validate().is_err());
    }
}
