use std::{
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use chrono::{Duration, Utc};
use hsb_common::Paise;
use log::*;
use booking_engine::{
    db_types::BookingStatus,
    events::{BookingClaimedEvent, EventHandler, EventProducers},
    test_utils::{
        doubles::MemoryNotifier,
        prepare_env::{prepare_test_env, random_db_path},
        seed::{approved_partner, booking_request, partner_signup},
    },
    BookingFlowApi,
    BookingFlowError,
    MatcherApi,
    PartnerManagement,
    SqliteDatabase,
};

async fn new_test_db() -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 8).await.expect("Error creating database")
}

/// Rewrites a booking's creation time so cancellation-window tests don't have to wait around.
async fn age_booking(db: &SqliteDatabase, booking_id: i64, minutes: i64) {
    sqlx::query(format!("UPDATE bookings SET created_at = datetime('now', '-{minutes} minutes') WHERE id = $1").as_str())
        .bind(booking_id)
        .execute(db.pool())
        .await
        .expect("Error aging booking");
}

async fn one_booking(db: &SqliteDatabase, customer_id: &str, price: Paise) -> i64 {
    let matcher = MatcherApi::new(db.clone(), MemoryNotifier::new());
    let summary = matcher
        .process_checkout(vec![booking_request(customer_id, "AC Repair", "395007", price)])
        .await
        .expect("Error processing checkout");
    summary.bookings[0].id
}

#[tokio::test]
async fn matcher_notifies_eligible_partners_only() {
    let db = new_test_db().await;
    approved_partner(&db, "P1", "p1@example.com", &["AC Repair"], &["395007"]).await;
    approved_partner(&db, "P2", "p2@example.com", &["Plumbing"], &["395007"]).await;
    approved_partner(&db, "P3", "p3@example.com", &["AC Repair"], &["400001"]).await;
    // P4 has the right skill and pincode but never got approved.
    db.insert_partner(partner_signup("P4", "p4@example.com", &["AC Repair"], &["395007"]))
        .await
        .expect("Error inserting partner");
    // P5 covers the pincode but has switched it off.
    let p5 = approved_partner(&db, "P5", "p5@example.com", &["AC Repair"], &["395007"]).await;
    db.set_pincode_active(p5, "395007", false).await.expect("Error deactivating pincode");

    let notifier = MemoryNotifier::new();
    let matcher = MatcherApi::new(db.clone(), notifier.clone());
    let summary = matcher
        .process_checkout(vec![booking_request("cust-1", "AC Repair", "395007", Paise::from_rupees(500))])
        .await
        .expect("Error processing checkout");

    assert_eq!(summary.booking_count(), 1);
    assert_eq!(summary.notified, 1);
    assert_eq!(summary.notify_failures, 0);
    assert_eq!(notifier.recipients(), vec!["p1@example.com".to_string()]);
}

#[tokio::test]
async fn notification_failures_do_not_fail_checkout() {
    let db = new_test_db().await;
    approved_partner(&db, "P1", "p1@example.com", &["AC Repair"], &["395007"]).await;
    approved_partner(&db, "P2", "p2@example.com", &["AC Repair"], &["395007"]).await;

    let notifier = MemoryNotifier::new();
    notifier.fail_for("p1@example.com");
    let matcher = MatcherApi::new(db.clone(), notifier.clone());
    let summary = matcher
        .process_checkout(vec![booking_request("cust-1", "AC Repair", "395007", Paise::from_rupees(500))])
        .await
        .expect("Error processing checkout");

    assert_eq!(summary.booking_count(), 1, "the booking must be durable despite the failed notification");
    assert_eq!(summary.notified, 1);
    assert_eq!(summary.notify_failures, 1);
    assert_eq!(notifier.recipients(), vec!["p2@example.com".to_string()]);
}

#[tokio::test]
async fn checkout_line_items_are_independent() {
    let db = new_test_db().await;
    let good = booking_request("cust-1", "AC Repair", "395007", Paise::from_rupees(500));
    let mut bad = booking_request("cust-1", "Plumbing", "395007", Paise::from_rupees(300));
    bad.time_slot = String::new();

    let matcher = MatcherApi::new(db.clone(), MemoryNotifier::new());
    let summary = matcher.process_checkout(vec![good, bad]).await.expect("Error processing checkout");

    assert_eq!(summary.booking_count(), 1);
    assert_eq!(summary.rejected.len(), 1);
    assert_eq!(summary.rejected[0].index, 1);
    assert!(!summary.all_accepted());
}

#[tokio::test]
async fn cancellation_window_is_enforced() {
    let db = new_test_db().await;
    let api = BookingFlowApi::new(db.clone(), EventProducers::default());

    // 119 minutes old: still inside the 2 hour window.
    let booking_id = one_booking(&db, "cust-1", Paise::from_rupees(500)).await;
    age_booking(&db, booking_id, 119).await;
    let cancelled = api.cancel_booking(booking_id, "cust-1").await.expect("Error cancelling booking");
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    // 121 minutes old: the window has closed.
    let booking_id = one_booking(&db, "cust-1", Paise::from_rupees(500)).await;
    age_booking(&db, booking_id, 121).await;
    match api.cancel_booking(booking_id, "cust-1").await {
        Err(BookingFlowError::CancellationNotAllowed(reason)) => {
            debug!("Cancellation rejected as expected: {reason}")
        },
        other => panic!("Expected CancellationNotAllowed, got {other:?}"),
    }
}

#[tokio::test]
async fn claimed_bookings_cannot_be_cancelled() {
    let db = new_test_db().await;
    let partner_id = approved_partner(&db, "P1", "p1@example.com", &["AC Repair"], &["395007"]).await;
    let api = BookingFlowApi::new(db.clone(), EventProducers::default());

    let booking_id = one_booking(&db, "cust-1", Paise::from_rupees(500)).await;
    api.claim_booking(booking_id, partner_id).await.expect("Error claiming booking");

    // Freshly created, well inside the window, but a partner is assigned.
    match api.cancel_booking(booking_id, "cust-1").await {
        Err(BookingFlowError::CancellationNotAllowed(_)) => {},
        other => panic!("Expected CancellationNotAllowed, got {other:?}"),
    }

    // A different customer's cancellation attempt reads as "no such booking".
    let booking_id = one_booking(&db, "cust-1", Paise::from_rupees(500)).await;
    match api.cancel_booking(booking_id, "cust-2").await {
        Err(BookingFlowError::BookingNotFound(_)) => {},
        other => panic!("Expected BookingNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn conflict_and_not_found_are_distinguished() {
    let db = new_test_db().await;
    let p1 = approved_partner(&db, "P1", "p1@example.com", &["AC Repair"], &["395007"]).await;
    let p2 = approved_partner(&db, "P2", "p2@example.com", &["AC Repair"], &["395007"]).await;
    let api = BookingFlowApi::new(db.clone(), EventProducers::default());

    // Claiming a booking that never existed.
    match api.claim_booking(9999, p1).await {
        Err(BookingFlowError::BookingNotFound(9999)) => {},
        other => panic!("Expected BookingNotFound, got {other:?}"),
    }

    // Claiming a booking the requester already cancelled.
    let booking_id = one_booking(&db, "cust-1", Paise::from_rupees(500)).await;
    api.cancel_booking(booking_id, "cust-1").await.expect("Error cancelling booking");
    match api.claim_booking(booking_id, p1).await {
        Err(BookingFlowError::BookingNotFound(_)) => {},
        other => panic!("Expected BookingNotFound, got {other:?}"),
    }

    // Claiming a booking someone else holds.
    let booking_id = one_booking(&db, "cust-1", Paise::from_rupees(500)).await;
    api.claim_booking(booking_id, p1).await.expect("Error claiming booking");
    match api.claim_booking(booking_id, p2).await {
        Err(BookingFlowError::AlreadyClaimed(_)) => {},
        other => panic!("Expected AlreadyClaimed, got {other:?}"),
    }
}

#[tokio::test]
async fn unapproved_partners_cannot_claim_or_browse() {
    let db = new_test_db().await;
    let pending = db
        .insert_partner(partner_signup("P1", "p1@example.com", &["AC Repair"], &["395007"]))
        .await
        .expect("Error inserting partner");
    let api = BookingFlowApi::new(db.clone(), EventProducers::default());
    let booking_id = one_booking(&db, "cust-1", Paise::from_rupees(500)).await;

    match api.claim_booking(booking_id, pending).await {
        Err(BookingFlowError::PartnerNotApproved(_)) => {},
        other => panic!("Expected PartnerNotApproved, got {other:?}"),
    }
    match api.open_bookings_for_partner(pending).await {
        Err(BookingFlowError::PartnerNotApproved(_)) => {},
        other => panic!("Expected PartnerNotApproved, got {other:?}"),
    }
}

#[tokio::test]
async fn dismissals_are_isolated_per_partner() {
    let db = new_test_db().await;
    let p1 = approved_partner(&db, "P1", "p1@example.com", &["AC Repair"], &["395007"]).await;
    let p2 = approved_partner(&db, "P2", "p2@example.com", &["AC Repair"], &["395007"]).await;
    let api = BookingFlowApi::new(db.clone(), EventProducers::default());

    let booking_id = one_booking(&db, "cust-1", Paise::from_rupees(500)).await;
    assert_eq!(api.open_bookings_for_partner(p1).await.unwrap().len(), 1);
    assert_eq!(api.open_bookings_for_partner(p2).await.unwrap().len(), 1);

    api.dismiss_booking(booking_id, p1).await.expect("Error dismissing booking");
    // Dismissing twice is a no-op, not an error.
    api.dismiss_booking(booking_id, p1).await.expect("Error re-dismissing booking");

    assert!(api.open_bookings_for_partner(p1).await.unwrap().is_empty());
    assert_eq!(api.open_bookings_for_partner(p2).await.unwrap().len(), 1, "other partners keep seeing the booking");
}

#[tokio::test]
async fn queue_hides_claimed_bookings_and_orders_newest_first() {
    let db = new_test_db().await;
    let p1 = approved_partner(&db, "P1", "p1@example.com", &["AC Repair"], &["395007"]).await;
    let api = BookingFlowApi::new(db.clone(), EventProducers::default());

    let first = one_booking(&db, "cust-1", Paise::from_rupees(100)).await;
    age_booking(&db, first, 30).await;
    let second = one_booking(&db, "cust-2", Paise::from_rupees(200)).await;

    let queue = api.open_bookings_for_partner(p1).await.unwrap();
    assert_eq!(queue.iter().map(|b| b.id).collect::<Vec<_>>(), vec![second, first]);

    api.claim_booking(first, p1).await.expect("Error claiming booking");
    let queue = api.open_bookings_for_partner(p1).await.unwrap();
    assert_eq!(queue.iter().map(|b| b.id).collect::<Vec<_>>(), vec![second]);
}

#[tokio::test]
async fn completion_is_terminal_and_updates_partner_stats() {
    let db = new_test_db().await;
    let p1 = approved_partner(&db, "P1", "p1@example.com", &["AC Repair"], &["395007"]).await;
    let api = BookingFlowApi::new(db.clone(), EventProducers::default());

    let price = Paise::from_rupees(650);
    let booking_id = one_booking(&db, "cust-1", price).await;
    api.claim_booking(booking_id, p1).await.expect("Error claiming booking");

    let partner = db.fetch_partner(p1).await.unwrap().unwrap();
    assert_eq!(partner.jobs_pending, 1);
    assert_eq!(partner.jobs_completed, 0);

    let booking = api.complete_booking(booking_id, p1).await.expect("Error completing booking");
    assert_eq!(booking.status, BookingStatus::Completed);

    let partner = db.fetch_partner(p1).await.unwrap().unwrap();
    assert_eq!(partner.jobs_pending, 0);
    assert_eq!(partner.jobs_completed, 1);
    assert_eq!(partner.revenue, price);

    // Completing an unclaimed booking, or someone else's booking, is rejected.
    let other = one_booking(&db, "cust-1", price).await;
    match api.complete_booking(other, p1).await {
        Err(BookingFlowError::NotAssignedToPartner(_)) => {},
        other => panic!("Expected NotAssignedToPartner, got {other:?}"),
    }
}

#[tokio::test]
async fn active_and_history_projections_partition_by_date() {
    let db = new_test_db().await;
    let api = BookingFlowApi::new(db.clone(), EventProducers::default());
    let matcher = MatcherApi::new(db.clone(), MemoryNotifier::new());

    let mut upcoming = booking_request("cust-1", "AC Repair", "395007", Paise::from_rupees(500));
    upcoming.service_date = (Utc::now() + Duration::days(2)).date_naive();
    let mut past = booking_request("cust-1", "Plumbing", "395007", Paise::from_rupees(300));
    past.service_date = (Utc::now() - Duration::days(2)).date_naive();

    let summary = matcher.process_checkout(vec![upcoming, past]).await.expect("Error processing checkout");
    assert_eq!(summary.booking_count(), 2);
    let upcoming_id = summary.bookings[0].id;
    let past_id = summary.bookings[1].id;

    let active = api.active_bookings("cust-1").await.unwrap();
    assert_eq!(active.iter().map(|b| b.id).collect::<Vec<_>>(), vec![upcoming_id]);

    let history = api.booking_history("cust-1").await.unwrap();
    assert_eq!(history.iter().map(|b| b.id).collect::<Vec<_>>(), vec![past_id]);

    // Cancelled bookings drop out of both projections.
    api.cancel_booking(upcoming_id, "cust-1").await.expect("Error cancelling booking");
    assert!(api.active_bookings("cust-1").await.unwrap().is_empty());
    assert_eq!(api.booking_history("cust-1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn claim_publishes_an_event() {
    let db = new_test_db().await;
    let p1 = approved_partner(&db, "P1", "p1@example.com", &["AC Repair"], &["395007"]).await;

    let claims_seen = Arc::new(AtomicU64::new(0));
    let counter = claims_seen.clone();
    let handler = Arc::new(move |ev: BookingClaimedEvent| {
        let counter = counter.clone();
        Box::pin(async move {
            debug!("Hook saw claim of booking [{}]", ev.booking.id);
            counter.fetch_add(1, Ordering::SeqCst);
        }) as Pin<Box<dyn std::future::Future<Output = ()> + Send>>
    });
    let event_handler = EventHandler::new(8, handler);
    let mut producers = EventProducers::default();
    producers.booking_claimed_producer.push(event_handler.subscribe());

    let api = BookingFlowApi::new(db.clone(), producers);
    let booking_id = one_booking(&db, "cust-1", Paise::from_rupees(500)).await;
    api.claim_booking(booking_id, p1).await.expect("Error claiming booking");

    // Dropping the API drops the last producer, letting the handler drain and shut down.
    drop(api);
    event_handler.start_handler().await;
    assert_eq!(claims_seen.load(Ordering::SeqCst), 1);
}
