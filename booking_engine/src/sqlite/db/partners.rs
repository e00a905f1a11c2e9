use hsb_common::Paise;
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{ApprovalStatus, NewPartner, Partner, PartnerProfile, ServicePincode},
    traits::PartnerApiError,
};

/// Inserts the partner row plus their declared skills and coverage pincodes. Embed this in a
/// transaction so a failed child insert does not leave a capability-less partner behind.
pub async fn insert_partner(partner: NewPartner, conn: &mut SqliteConnection) -> Result<i64, PartnerApiError> {
    let result = sqlx::query(
        "INSERT INTO partners (name, email, phone, password_hash) VALUES ($1, $2, $3, $4)",
    )
    .bind(&partner.name)
    .bind(&partner.email)
    .bind(&partner.phone)
    .bind(&partner.password_hash)
    .execute(&mut *conn)
    .await;
    let partner_id = match result {
        Ok(r) => r.last_insert_rowid(),
        Err(sqlx::Error::Database(de)) if de.is_unique_violation() => {
            return Err(PartnerApiError::DuplicateEmail(partner.email));
        },
        Err(e) => return Err(e.into()),
    };
    for skill in &partner.skills {
        sqlx::query("INSERT OR IGNORE INTO partner_skills (partner_id, skill) VALUES ($1, $2)")
            .bind(partner_id)
            .bind(skill)
            .execute(&mut *conn)
            .await?;
    }
    for entry in &partner.service_pincodes {
        sqlx::query("INSERT OR IGNORE INTO partner_pincodes (partner_id, pincode, active) VALUES ($1, $2, $3)")
            .bind(partner_id)
            .bind(&entry.pincode)
            .bind(entry.active)
            .execute(&mut *conn)
            .await?;
    }
    debug!("🧑‍🔧️ Partner [{}] signed up with id {partner_id} (pending approval)", partner.email);
    Ok(partner_id)
}

pub async fn fetch_partner(partner_id: i64, conn: &mut SqliteConnection) -> Result<Option<Partner>, sqlx::Error> {
    let partner =
        sqlx::query_as("SELECT * FROM partners WHERE id = $1").bind(partner_id).fetch_optional(conn).await?;
    Ok(partner)
}

pub async fn fetch_partner_profile(
    partner_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<PartnerProfile>, PartnerApiError> {
    let partner = match fetch_partner(partner_id, &mut *conn).await? {
        Some(p) => p,
        None => return Ok(None),
    };
    let skills: Vec<(String,)> =
        sqlx::query_as("SELECT skill FROM partner_skills WHERE partner_id = $1 ORDER BY skill")
            .bind(partner_id)
            .fetch_all(&mut *conn)
            .await?;
    let skills = skills.into_iter().map(|(s,)| s).collect();
    let service_pincodes: Vec<ServicePincode> =
        sqlx::query_as("SELECT pincode, active FROM partner_pincodes WHERE partner_id = $1 ORDER BY pincode")
            .bind(partner_id)
            .fetch_all(&mut *conn)
            .await?;
    let profile = PartnerProfile::new(partner).with_skills(skills).with_service_pincodes(service_pincodes);
    Ok(Some(profile))
}

/// The matcher's side of the shared eligibility rule: approved partners with the skill declared and an
/// active coverage entry for the pincode.
pub async fn eligible_partners(
    service: &str,
    pincode: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Partner>, sqlx::Error> {
    let partners: Vec<Partner> = sqlx::query_as(
        r#"
        SELECT partners.*
        FROM partners
        JOIN partner_skills ON partner_skills.partner_id = partners.id AND partner_skills.skill = $1
        JOIN partner_pincodes
            ON partner_pincodes.partner_id = partners.id
            AND partner_pincodes.pincode = $2
            AND partner_pincodes.active = TRUE
        WHERE partners.approval = 'Approved'
        ORDER BY partners.id"#,
    )
    .bind(service)
    .bind(pincode)
    .fetch_all(conn)
    .await?;
    trace!("🧑‍🔧️ {} partner(s) eligible for {service} at {pincode}", partners.len());
    Ok(partners)
}

pub async fn set_partner_approval(
    partner_id: i64,
    approval: ApprovalStatus,
    conn: &mut SqliteConnection,
) -> Result<Partner, PartnerApiError> {
    let approval = approval.to_string();
    let result: Option<Partner> =
        sqlx::query_as("UPDATE partners SET approval = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(approval)
            .bind(partner_id)
            .fetch_optional(conn)
            .await?;
    result.ok_or(PartnerApiError::PartnerNotFound(partner_id))
}

pub async fn set_pincode_active(
    partner_id: i64,
    pincode: &str,
    active: bool,
    conn: &mut SqliteConnection,
) -> Result<(), PartnerApiError> {
    let result = sqlx::query("UPDATE partner_pincodes SET active = $1 WHERE partner_id = $2 AND pincode = $3")
        .bind(active)
        .bind(partner_id)
        .bind(pincode)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(PartnerApiError::PartnerNotFound(partner_id));
    }
    Ok(())
}

/// A won claim adds a pending job to the winner's counters.
pub async fn incr_jobs_pending(partner_id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE partners SET jobs_pending = jobs_pending + 1, updated_at = CURRENT_TIMESTAMP WHERE id = $1")
        .bind(partner_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Completion moves a job from pending to completed and credits the booking price to partner revenue.
pub async fn record_completed_job(
    partner_id: i64,
    price: Paise,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE partners
        SET jobs_pending = MAX(jobs_pending - 1, 0),
            jobs_completed = jobs_completed + 1,
            revenue = revenue + $1,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $2"#,
    )
    .bind(price.value())
    .bind(partner_id)
    .execute(conn)
    .await?;
    Ok(())
}
