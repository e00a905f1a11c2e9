use thiserror::Error;

use crate::db_types::{ApprovalStatus, NewPartner, Partner, PartnerProfile};

#[derive(Debug, Clone, Error)]
pub enum PartnerApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The requested partner {0} does not exist")]
    PartnerNotFound(i64),
    #[error("A partner with email {0} already exists")]
    DuplicateEmail(String),
}

impl From<sqlx::Error> for PartnerApiError {
    fn from(e: sqlx::Error) -> Self {
        PartnerApiError::DatabaseError(e.to_string())
    }
}

/// Behaviour for managing partner records and answering the shared eligibility query.
///
/// Signup inserts a `Pending` partner; an administrator flips the approval state. Matching and the
/// queue view only ever see `Approved` partners.
#[allow(async_fn_in_trait)]
pub trait PartnerManagement {
    /// Creates a new partner in `Pending` state, together with their declared skills and coverage
    /// pincodes. Returns the new partner id. Fails with [`PartnerApiError::DuplicateEmail`] if the
    /// email is taken.
    async fn insert_partner(&self, partner: NewPartner) -> Result<i64, PartnerApiError>;

    /// Fetches the partner record. If no partner exists, `None` is returned.
    async fn fetch_partner(&self, partner_id: i64) -> Result<Option<Partner>, PartnerApiError>;

    /// Fetches the partner together with their skills and coverage pincodes.
    async fn fetch_partner_profile(&self, partner_id: i64) -> Result<Option<PartnerProfile>, PartnerApiError>;

    /// All partners eligible for the given service at the given pincode: approved, skill declared, and
    /// the pincode entry active. This is the matcher's side of the shared eligibility rule.
    async fn eligible_partners(&self, service: &str, pincode: &str) -> Result<Vec<Partner>, PartnerApiError>;

    /// Administrative approval transition. Out of the core request path, but required to make a signup
    /// matchable.
    async fn set_partner_approval(
        &self,
        partner_id: i64,
        approval: ApprovalStatus,
    ) -> Result<Partner, PartnerApiError>;

    /// Switches coverage of a single pincode on or off without deleting the entry.
    async fn set_pincode_active(&self, partner_id: i64, pincode: &str, active: bool) -> Result<(), PartnerApiError>;
}
