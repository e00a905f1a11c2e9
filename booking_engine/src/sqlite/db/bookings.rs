use chrono::Duration;
use log::{debug, error, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    booking_objects::BookingQueryFilter,
    db_types::{Booking, BookingStatus, NewBooking, Partner, PaymentStatus},
    traits::BookingGatewayError,
};

/// Inserts a new booking into the database using the given connection. This is not atomic across a
/// checkout batch; line items are deliberately independent.
pub async fn insert_booking(booking: NewBooking, conn: &mut SqliteConnection) -> Result<Booking, BookingGatewayError> {
    let booking: Booking = sqlx::query_as(
        r#"
            INSERT INTO bookings (
                customer_id,
                customer_name,
                customer_contact,
                service,
                service_date,
                time_slot,
                address,
                pincode,
                price,
                remark
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *;
        "#,
    )
    .bind(booking.customer_id)
    .bind(booking.customer_name)
    .bind(booking.customer_contact)
    .bind(booking.service)
    .bind(booking.service_date)
    .bind(booking.time_slot)
    .bind(booking.address)
    .bind(booking.pincode)
    .bind(booking.price.value())
    .bind(booking.remark)
    .fetch_one(conn)
    .await?;
    debug!("📝️ Booking [{}] for {} inserted", booking.id, booking.service);
    Ok(booking)
}

pub async fn fetch_booking(booking_id: i64, conn: &mut SqliteConnection) -> Result<Option<Booking>, sqlx::Error> {
    let booking =
        sqlx::query_as("SELECT * FROM bookings WHERE id = $1").bind(booking_id).fetch_optional(conn).await?;
    Ok(booking)
}

/// The first-to-claim write. A single conditional update sets the partner fields only where they are
/// currently unset, so concurrent claimants cannot both observe "unassigned" and both win.
pub async fn claim_booking(
    booking_id: i64,
    partner: &Partner,
    conn: &mut SqliteConnection,
) -> Result<Booking, BookingGatewayError> {
    let claimed: Option<Booking> = sqlx::query_as(
        r#"
            UPDATE bookings
            SET partner_id = $1, partner_name = $2, partner_contact = $3, updated_at = CURRENT_TIMESTAMP
            WHERE id = $4 AND partner_id IS NULL AND status = 'Active'
            RETURNING *;
        "#,
    )
    .bind(partner.id)
    .bind(&partner.name)
    .bind(&partner.phone)
    .bind(booking_id)
    .fetch_optional(&mut *conn)
    .await?;
    match claimed {
        Some(booking) => {
            debug!("📝️ Booking [{booking_id}] claimed by partner #{}", partner.id);
            Ok(booking)
        },
        // The conditional write matched nothing. Inspect the row to report "already taken" and
        // "no longer available" as distinct outcomes.
        None => match fetch_booking(booking_id, conn).await? {
            None => Err(BookingGatewayError::BookingNotFound(booking_id)),
            Some(b) if b.is_claimed() => Err(BookingGatewayError::AlreadyClaimed(booking_id)),
            Some(b) if b.status != BookingStatus::Active => Err(BookingGatewayError::BookingNotFound(booking_id)),
            Some(_) => {
                error!("📝️ Claim of booking [{booking_id}] matched nothing, yet the row looks claimable. ");
                Err(BookingGatewayError::DatabaseError(format!(
                    "Inconsistent claim state for booking {booking_id}"
                )))
            },
        },
    }
}

/// Requester cancellation. The guard (ownership, unclaimed, Active, inside the window) is evaluated in
/// SQL against the database clock, so a client-supplied timestamp cannot widen the window.
pub async fn cancel_booking(
    booking_id: i64,
    customer_id: &str,
    window: Duration,
    conn: &mut SqliteConnection,
) -> Result<Booking, BookingGatewayError> {
    let cancelled: Option<Booking> = sqlx::query_as(
        format!(
            "UPDATE bookings SET status = 'Cancelled', updated_at = CURRENT_TIMESTAMP WHERE id = $1 AND \
             customer_id = $2 AND partner_id IS NULL AND status = 'Active' AND \
             (unixepoch(CURRENT_TIMESTAMP) - unixepoch(created_at)) < {} RETURNING *;",
            window.num_seconds()
        )
        .as_str(),
    )
    .bind(booking_id)
    .bind(customer_id)
    .fetch_optional(&mut *conn)
    .await?;
    match cancelled {
        Some(booking) => {
            debug!("📝️ Booking [{booking_id}] cancelled by its requester");
            Ok(booking)
        },
        None => match fetch_booking(booking_id, conn).await? {
            None => Err(BookingGatewayError::BookingNotFound(booking_id)),
            // Bookings belonging to other customers are reported as absent rather than leaking state.
            Some(b) if b.customer_id != customer_id => Err(BookingGatewayError::BookingNotFound(booking_id)),
            Some(b) if b.is_claimed() => Err(BookingGatewayError::CancellationNotAllowed(
                "a partner has already been assigned".to_string(),
            )),
            Some(b) if b.status != BookingStatus::Active => Err(BookingGatewayError::CancellationNotAllowed(
                format!("the booking is already {}", b.status),
            )),
            Some(_) => Err(BookingGatewayError::CancellationNotAllowed(
                format!("more than {} minutes have passed since the booking was placed", window.num_minutes()),
            )),
        },
    }
}

pub async fn set_payment_status(
    booking_id: i64,
    payment_status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<Booking, BookingGatewayError> {
    let status = payment_status.to_string();
    let result: Option<Booking> = sqlx::query_as(
        "UPDATE bookings SET payment_status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(status)
    .bind(booking_id)
    .fetch_optional(conn)
    .await?;
    result.ok_or(BookingGatewayError::BookingNotFound(booking_id))
}

/// Marks a claimed, Active booking as Completed. The caller must be the assigned partner.
pub async fn complete_booking(
    booking_id: i64,
    partner_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Booking, BookingGatewayError> {
    let completed: Option<Booking> = sqlx::query_as(
        r#"
            UPDATE bookings
            SET status = 'Completed', updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND partner_id = $2 AND status = 'Active'
            RETURNING *;
        "#,
    )
    .bind(booking_id)
    .bind(partner_id)
    .fetch_optional(&mut *conn)
    .await?;
    match completed {
        Some(booking) => Ok(booking),
        None => match fetch_booking(booking_id, conn).await? {
            None => Err(BookingGatewayError::BookingNotFound(booking_id)),
            Some(b) if b.partner_id != Some(partner_id) => {
                Err(BookingGatewayError::NotAssignedToPartner(booking_id))
            },
            // Already completed (or cancelled out from under the partner): reads as gone, and in
            // particular never reaches the stats counters a second time.
            Some(_) => Err(BookingGatewayError::BookingNotFound(booking_id)),
        },
    }
}

/// Idempotently hides a booking from one partner's queue. Re-dismissing is a no-op.
pub async fn dismiss_booking(
    booking_id: i64,
    partner_id: i64,
    conn: &mut SqliteConnection,
) -> Result<(), BookingGatewayError> {
    if fetch_booking(booking_id, &mut *conn).await?.is_none() {
        return Err(BookingGatewayError::BookingNotFound(booking_id));
    }
    sqlx::query("INSERT OR IGNORE INTO booking_dismissals (booking_id, partner_id) VALUES ($1, $2)")
        .bind(booking_id)
        .bind(partner_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// The partner queue: unclaimed Active bookings matching the partner's approval, skills and *active*
/// coverage pincodes, minus the partner's own dismissals, newest first.
pub async fn open_bookings_for_partner(
    partner_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Booking>, sqlx::Error> {
    let bookings: Vec<Booking> = sqlx::query_as(
        r#"
        SELECT bookings.*
        FROM bookings
        JOIN partners ON partners.id = $1 AND partners.approval = 'Approved'
        JOIN partner_skills ON partner_skills.partner_id = $1 AND partner_skills.skill = bookings.service
        JOIN partner_pincodes
            ON partner_pincodes.partner_id = $1
            AND partner_pincodes.pincode = bookings.pincode
            AND partner_pincodes.active = TRUE
        WHERE
            bookings.status = 'Active' AND
            bookings.partner_id IS NULL AND
            bookings.id NOT IN (SELECT booking_id FROM booking_dismissals WHERE partner_id = $1)
        ORDER BY bookings.created_at DESC, bookings.id DESC"#,
    )
    .bind(partner_id)
    .fetch_all(conn)
    .await?;
    Ok(bookings)
}

/// Fetches bookings according to criteria specified in the `BookingQueryFilter`
///
/// Resulting bookings are ordered by `created_at` in ascending order
pub async fn search_bookings(
    query: BookingQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Booking>, sqlx::Error> {
    let mut builder = QueryBuilder::new(
        r#"
    SELECT * FROM bookings
    "#,
    );
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(customer_id) = query.customer_id {
        where_clause.push("customer_id = ");
        where_clause.push_bind_unseparated(customer_id);
    }
    if let Some(partner_id) = query.partner_id {
        where_clause.push("partner_id = ");
        where_clause.push_bind_unseparated(partner_id);
    }
    if let Some(service) = query.service {
        where_clause.push("service = ");
        where_clause.push_bind_unseparated(service);
    }
    if let Some(pincode) = query.pincode {
        where_clause.push("pincode = ");
        where_clause.push_bind_unseparated(pincode);
    }
    if query.status.as_ref().map(|s| !s.is_empty()).unwrap_or(false) {
        let mut statuses = vec![];
        query.status.as_ref().unwrap().iter().for_each(|s| {
            statuses.push(format!("'{s}'"));
        });
        let status_clause = statuses.join(",");
        where_clause.push(format!("status IN ({status_clause})"));
    }
    if let Some(payment_status) = query.payment_status {
        where_clause.push("payment_status = ");
        where_clause.push_bind_unseparated(payment_status.to_string());
    }
    if let Some(day) = query.scheduled_on_or_after {
        where_clause.push("service_date >= ");
        where_clause.push_bind_unseparated(day);
    }
    if let Some(day) = query.scheduled_before {
        where_clause.push("service_date < ");
        where_clause.push_bind_unseparated(day);
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    if let Some(claimed) = query.claimed {
        where_clause.push(if claimed { "partner_id IS NOT NULL" } else { "partner_id IS NULL" });
    }
    builder.push(" ORDER BY created_at ASC");

    trace!("📝️ Executing query: {}", builder.sql());
    let query = builder.build_query_as::<Booking>();
    let bookings = query.fetch_all(conn).await?;
    trace!("Result of search_bookings: {:?}", bookings.len());
    Ok(bookings)
}
