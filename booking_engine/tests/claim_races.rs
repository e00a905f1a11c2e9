use std::sync::Arc;

use futures_util::future::join_all;
use hsb_common::Paise;
use log::*;
use booking_engine::{
    events::EventProducers,
    test_utils::{
        doubles::MemoryNotifier,
        prepare_env::{prepare_test_env, random_db_path},
        seed::{approved_partner, booking_request},
    },
    BookingFlowApi,
    BookingFlowError,
    MatcherApi,
    SqliteDatabase,
};
use tokio::runtime::Runtime;

const NUM_PARTNERS: usize = 8;

/// Race a pack of eligible partners for a single booking. Exactly one claim may win; every other
/// claimant must see a conflict, not a missing booking.
#[test]
fn at_most_one_claim_wins() {
    let _ = env_logger::try_init();
    info!("🚀️ Starting claim race test");

    let sys = Runtime::new().unwrap();

    sys.block_on(async move {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 16).await.expect("Error creating database");

        let mut partner_ids = Vec::with_capacity(NUM_PARTNERS);
        for i in 0..NUM_PARTNERS {
            let email = format!("partner{i}@example.com");
            let id = approved_partner(&db, "Racing Partner", &email, &["AC Repair"], &["395007"]).await;
            partner_ids.push(id);
        }

        let matcher = MatcherApi::new(db.clone(), MemoryNotifier::new());
        let summary = matcher
            .process_checkout(vec![booking_request("cust-1", "AC Repair", "395007", Paise::from_rupees(800))])
            .await
            .expect("Error processing checkout");
        let booking_id = summary.bookings[0].id;

        let api = Arc::new(BookingFlowApi::new(db.clone(), EventProducers::default()));
        info!("🚀️ {NUM_PARTNERS} partners racing to claim booking [{booking_id}]");
        let claims = partner_ids.iter().map(|partner_id| {
            let api = Arc::clone(&api);
            let partner_id = *partner_id;
            tokio::spawn(async move { api.claim_booking(booking_id, partner_id).await })
        });
        let results = join_all(claims).await;

        let mut winners = 0;
        let mut conflicts = 0;
        for result in results {
            match result.expect("claim task panicked") {
                Ok(booking) => {
                    assert_eq!(booking.id, booking_id);
                    assert!(booking.is_claimed());
                    winners += 1;
                },
                Err(BookingFlowError::AlreadyClaimed(id)) => {
                    assert_eq!(id, booking_id);
                    conflicts += 1;
                },
                Err(e) => panic!("Unexpected claim failure: {e}"),
            }
        }
        assert_eq!(winners, 1, "exactly one claim must win");
        assert_eq!(conflicts, NUM_PARTNERS - 1, "every losing claim must report a conflict");

        // The partner fields were written exactly once.
        let pool = api.db().pool();
        let (partner_id,): (Option<i64>,) = sqlx::query_as("SELECT partner_id FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_one(pool)
            .await
            .unwrap();
        assert!(partner_id.is_some());
    });
    info!("🚀️ test complete");
}
