use hsb_common::{Paise, Secret};
use booking_engine::{
    db_types::PaymentStatus,
    events::EventProducers,
    helpers::{sign_confirmation, PaymentConfirmation, VerificationOutcome},
    test_utils::{
        doubles::{MemoryNotifier, StubPaymentProvider},
        prepare_env::{prepare_test_env, random_db_path},
        seed::{booking_request, user_with_wallet},
    },
    BookingManagement,
    MatcherApi,
    SettlementApi,
    SettlementError,
    SqliteDatabase,
    WalletManagement,
};

const SECRET: &str = "test-signing-secret";

async fn new_test_db() -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 8).await.expect("Error creating database")
}

fn settlement_api(db: &SqliteDatabase) -> SettlementApi<SqliteDatabase, StubPaymentProvider> {
    SettlementApi::new(
        db.clone(),
        StubPaymentProvider::new(),
        Secret::new(SECRET.to_string()),
        EventProducers::default(),
    )
}

async fn priced_booking(db: &SqliteDatabase, customer_id: &str, price: Paise) -> i64 {
    let matcher = MatcherApi::new(db.clone(), MemoryNotifier::new());
    let summary = matcher
        .process_checkout(vec![booking_request(customer_id, "AC Repair", "395007", price)])
        .await
        .expect("Error processing checkout");
    summary.bookings[0].id
}

#[tokio::test]
async fn wallet_covering_the_subtotal_cannot_be_elected() {
    let db = new_test_db().await;
    user_with_wallet(&db, "cust-1", Paise::from(500)).await;
    let booking_id = priced_booking(&db, "cust-1", Paise::from(500)).await;

    let api = settlement_api(&db);
    match api.create_payment_order(booking_id, "cust-1", true).await {
        Err(SettlementError::WalletNotApplicable { wallet, subtotal }) => {
            assert_eq!(wallet, Paise::from(500));
            assert_eq!(subtotal, Paise::from(500));
        },
        other => panic!("Expected WalletNotApplicable, got {other:?}"),
    }
}

#[tokio::test]
async fn wallet_one_paisa_short_leaves_one_paisa_payable() {
    let db = new_test_db().await;
    user_with_wallet(&db, "cust-1", Paise::from(499)).await;
    let booking_id = priced_booking(&db, "cust-1", Paise::from(500)).await;

    let api = settlement_api(&db);
    let order = api.create_payment_order(booking_id, "cust-1", true).await.expect("Error creating payment order");
    assert_eq!(order.payable, Paise::from(1));
    assert_eq!(order.wallet_applied, Paise::from(499));
    assert_eq!(order.order.amount, Paise::from(1));
}

#[tokio::test]
async fn empty_wallet_election_degenerates_to_full_price() {
    let db = new_test_db().await;
    user_with_wallet(&db, "cust-1", Paise::from(0)).await;
    let booking_id = priced_booking(&db, "cust-1", Paise::from(500)).await;

    let api = settlement_api(&db);
    let order = api.create_payment_order(booking_id, "cust-1", true).await.expect("Error creating payment order");
    assert_eq!(order.payable, Paise::from(500));
    assert_eq!(order.wallet_applied, Paise::from(0));
}

#[tokio::test]
async fn verified_payment_settles_and_is_idempotent() {
    let db = new_test_db().await;
    user_with_wallet(&db, "cust-1", Paise::from(499)).await;
    let booking_id = priced_booking(&db, "cust-1", Paise::from(500)).await;

    let api = settlement_api(&db);
    let order = api.create_payment_order(booking_id, "cust-1", true).await.expect("Error creating payment order");
    let signature = sign_confirmation(SECRET, &order.order.order_id, "pay_1");
    let confirmation = PaymentConfirmation::new(order.order.order_id.as_str(), "pay_1", signature.as_str());

    let outcome = api.confirm_and_apply(booking_id, "cust-1", &confirmation, true).await.expect("Error settling");
    assert!(!outcome.already_paid);
    assert_eq!(outcome.wallet_debited, Paise::from(499));
    assert_eq!(outcome.booking.payment_status, PaymentStatus::Paid);
    let account = db.fetch_user_account("cust-1").await.unwrap().unwrap();
    assert_eq!(account.wallet, Paise::from(0));

    // Retrying the application step (e.g. after a crash between verify and apply) changes nothing and
    // debits nothing.
    let outcome = api.apply_payment(booking_id, "cust-1", true).await.expect("Error re-applying payment");
    assert!(outcome.already_paid);
    assert_eq!(outcome.wallet_debited, Paise::from(0));
    assert_eq!(outcome.booking.payment_status, PaymentStatus::Paid);
    let account = db.fetch_user_account("cust-1").await.unwrap().unwrap();
    assert_eq!(account.wallet, Paise::from(0), "no second wallet debit");
}

#[tokio::test]
async fn signature_round_trip_and_mutation() {
    let db = new_test_db().await;
    let api = settlement_api(&db);

    let signature = sign_confirmation(SECRET, "order_1", "pay_1");
    let good = PaymentConfirmation::new("order_1", "pay_1", signature.as_str());
    assert_eq!(api.verify_payment(&good).unwrap(), VerificationOutcome::Verified);

    let mut mutated = signature.clone().into_bytes();
    mutated[0] = if mutated[0] == b'0' { b'1' } else { b'0' };
    let mutated = String::from_utf8(mutated).unwrap();
    let bad = PaymentConfirmation::new("order_1", "pay_1", mutated.as_str());
    assert_eq!(api.verify_payment(&bad).unwrap(), VerificationOutcome::Failed);
}

#[tokio::test]
async fn failed_verification_never_settles() {
    let db = new_test_db().await;
    user_with_wallet(&db, "cust-1", Paise::from(499)).await;
    let booking_id = priced_booking(&db, "cust-1", Paise::from(500)).await;

    let api = settlement_api(&db);
    let order = api.create_payment_order(booking_id, "cust-1", true).await.expect("Error creating payment order");
    let zeros = "0".repeat(64);
    let confirmation = PaymentConfirmation::new(order.order.order_id.as_str(), "pay_1", zeros.as_str());

    match api.confirm_and_apply(booking_id, "cust-1", &confirmation, true).await {
        Err(SettlementError::VerificationFailed) => {},
        other => panic!("Expected VerificationFailed, got {other:?}"),
    }
    let booking = db.fetch_booking(booking_id).await.unwrap().unwrap();
    assert_eq!(booking.payment_status, PaymentStatus::Pending);
    let account = db.fetch_user_account("cust-1").await.unwrap().unwrap();
    assert_eq!(account.wallet, Paise::from(499), "wallet untouched after failed verification");
}

#[tokio::test]
async fn malformed_confirmations_are_rejected_before_verification() {
    let db = new_test_db().await;
    let api = settlement_api(&db);

    let zeros = "0".repeat(64);
    let missing_id = PaymentConfirmation::new("", "pay_1", zeros.as_str());
    assert!(matches!(api.verify_payment(&missing_id), Err(SettlementError::ValidationError(_))));

    let short_signature = PaymentConfirmation::new("order_1", "pay_1", "abc123");
    assert!(matches!(api.verify_payment(&short_signature), Err(SettlementError::ValidationError(_))));
}

#[tokio::test]
async fn provider_outage_is_a_retryable_error() {
    let db = new_test_db().await;
    user_with_wallet(&db, "cust-1", Paise::from(0)).await;
    let booking_id = priced_booking(&db, "cust-1", Paise::from(500)).await;

    let provider = StubPaymentProvider::new();
    provider.set_unavailable(true);
    let api = SettlementApi::new(db.clone(), provider.clone(), Secret::new(SECRET.to_string()), EventProducers::default());

    match api.create_payment_order(booking_id, "cust-1", false).await {
        Err(e @ SettlementError::PaymentProvider(_)) => assert!(e.is_retryable()),
        other => panic!("Expected PaymentProvider error, got {other:?}"),
    }

    provider.set_unavailable(false);
    api.create_payment_order(booking_id, "cust-1", false).await.expect("Error creating payment order after outage");
    assert_eq!(provider.orders_created(), 1);
}
