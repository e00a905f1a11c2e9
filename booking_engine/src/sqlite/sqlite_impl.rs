//! `SqliteDatabase` is a concrete implementation of a booking engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`traits`] module.
//!
//! [`traits`]: crate::traits
use std::fmt::Debug;

use chrono::Duration;
use hsb_common::Paise;
use log::*;
use sqlx::SqlitePool;

use super::db::{bookings, db_url, new_pool, partners, user_accounts};
use crate::{
    booking_objects::BookingQueryFilter,
    db_types::{
        ApprovalStatus,
        Booking,
        NewBooking,
        NewPartner,
        Partner,
        PartnerProfile,
        PaymentStatus,
        UserAccount,
    },
    traits::{
        BookingGatewayDatabase,
        BookingGatewayError,
        BookingManagement,
        BookingQueryError,
        PartnerApiError,
        PartnerManagement,
        SettlementOutcome,
        WalletApiError,
        WalletManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl BookingGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_booking(&self, booking: NewBooking) -> Result<Booking, BookingGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let booking = bookings::insert_booking(booking, &mut conn).await?;
        debug!("🗃️ Booking [{}] has been saved in the DB", booking.id);
        Ok(booking)
    }

    /// The claim arbitration write plus the winner's pending-job counter bump, in one transaction.
    async fn claim_booking(&self, booking_id: i64, partner: &Partner) -> Result<Booking, BookingGatewayError> {
        let mut tx = self.pool.begin().await?;
        let booking = bookings::claim_booking(booking_id, partner, &mut tx).await?;
        partners::incr_jobs_pending(partner.id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Booking [{booking_id}] is now assigned to partner #{}", partner.id);
        Ok(booking)
    }

    async fn cancel_booking(
        &self,
        booking_id: i64,
        customer_id: &str,
        window: Duration,
    ) -> Result<Booking, BookingGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let booking = bookings::cancel_booking(booking_id, customer_id, window, &mut conn).await?;
        debug!("🗃️ Booking [{booking_id}] has been cancelled");
        Ok(booking)
    }

    async fn complete_booking(&self, booking_id: i64, partner_id: i64) -> Result<Booking, BookingGatewayError> {
        let mut tx = self.pool.begin().await?;
        let booking = bookings::complete_booking(booking_id, partner_id, &mut tx).await?;
        partners::record_completed_job(partner_id, booking.price, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Booking [{booking_id}] completed by partner #{partner_id}");
        Ok(booking)
    }

    /// Applies a verified payment. In one transaction: re-validate the wallet election, debit the
    /// wallet leg, and flip the payment status. Re-applying to a paid booking is a no-op, so a crash
    /// between verification and application can always be resolved by retrying this call.
    async fn settle_booking(
        &self,
        booking_id: i64,
        customer_id: &str,
        use_wallet: bool,
    ) -> Result<SettlementOutcome, BookingGatewayError> {
        let mut tx = self.pool.begin().await?;
        let booking = bookings::fetch_booking(booking_id, &mut tx)
            .await?
            .ok_or(BookingGatewayError::BookingNotFound(booking_id))?;
        if booking.customer_id != customer_id {
            return Err(BookingGatewayError::BookingNotFound(booking_id));
        }
        if booking.is_paid() {
            debug!("🗃️ Booking [{booking_id}] is already paid. Nothing to do.");
            return Ok(SettlementOutcome { booking, wallet_debited: Paise::from(0), already_paid: true });
        }
        let mut wallet_debited = Paise::from(0);
        if use_wallet {
            let account = user_accounts::fetch_user_account(customer_id, &mut tx)
                .await?
                .ok_or_else(|| BookingGatewayError::UserAccountNotFound(customer_id.to_string()))?;
            if account.wallet >= booking.price {
                return Err(BookingGatewayError::WalletNotApplicable {
                    wallet: account.wallet,
                    subtotal: booking.price,
                });
            }
            if account.wallet.is_positive() {
                user_accounts::debit_wallet(customer_id, account.wallet, &mut tx).await?;
                wallet_debited = account.wallet;
                trace!("🗃️ Wallet leg of {wallet_debited} debited for booking [{booking_id}]");
            }
        }
        let booking = bookings::set_payment_status(booking_id, PaymentStatus::Paid, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Booking [{booking_id}] is now paid ({wallet_debited} from wallet).");
        Ok(SettlementOutcome { booking, wallet_debited, already_paid: false })
    }

    async fn dismiss_booking(&self, booking_id: i64, partner_id: i64) -> Result<(), BookingGatewayError> {
        let mut conn = self.pool.acquire().await?;
        bookings::dismiss_booking(booking_id, partner_id, &mut conn).await?;
        trace!("🗃️ Booking [{booking_id}] hidden from partner #{partner_id}'s queue");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BookingGatewayError> {
        self.pool.close().await;
        Ok(())
    }
}

impl BookingManagement for SqliteDatabase {
    async fn fetch_booking(&self, booking_id: i64) -> Result<Option<Booking>, BookingQueryError> {
        let mut conn = self.pool.acquire().await?;
        let booking = bookings::fetch_booking(booking_id, &mut conn).await?;
        Ok(booking)
    }

    async fn search_bookings(&self, query: BookingQueryFilter) -> Result<Vec<Booking>, BookingQueryError> {
        let mut conn = self.pool.acquire().await?;
        let bookings = bookings::search_bookings(query, &mut conn).await?;
        Ok(bookings)
    }

    async fn open_bookings_for_partner(&self, partner_id: i64) -> Result<Vec<Booking>, BookingQueryError> {
        let mut conn = self.pool.acquire().await?;
        let bookings = bookings::open_bookings_for_partner(partner_id, &mut conn).await?;
        Ok(bookings)
    }
}

impl PartnerManagement for SqliteDatabase {
    async fn insert_partner(&self, partner: NewPartner) -> Result<i64, PartnerApiError> {
        let mut tx = self.pool.begin().await.map_err(|e| PartnerApiError::DatabaseError(e.to_string()))?;
        let partner_id = partners::insert_partner(partner, &mut tx).await?;
        tx.commit().await.map_err(|e| PartnerApiError::DatabaseError(e.to_string()))?;
        Ok(partner_id)
    }

    async fn fetch_partner(&self, partner_id: i64) -> Result<Option<Partner>, PartnerApiError> {
        let mut conn = self.pool.acquire().await?;
        let partner = partners::fetch_partner(partner_id, &mut conn).await?;
        Ok(partner)
    }

    async fn fetch_partner_profile(&self, partner_id: i64) -> Result<Option<PartnerProfile>, PartnerApiError> {
        let mut conn = self.pool.acquire().await?;
        partners::fetch_partner_profile(partner_id, &mut conn).await
    }

    async fn eligible_partners(&self, service: &str, pincode: &str) -> Result<Vec<Partner>, PartnerApiError> {
        let mut conn = self.pool.acquire().await?;
        let partners = partners::eligible_partners(service, pincode, &mut conn).await?;
        Ok(partners)
    }

    async fn set_partner_approval(
        &self,
        partner_id: i64,
        approval: ApprovalStatus,
    ) -> Result<Partner, PartnerApiError> {
        let mut conn = self.pool.acquire().await?;
        let partner = partners::set_partner_approval(partner_id, approval, &mut conn).await?;
        debug!("🗃️ Partner #{partner_id} is now {}", partner.approval);
        Ok(partner)
    }

    async fn set_pincode_active(&self, partner_id: i64, pincode: &str, active: bool) -> Result<(), PartnerApiError> {
        let mut conn = self.pool.acquire().await?;
        partners::set_pincode_active(partner_id, pincode, active, &mut conn).await
    }
}

impl WalletManagement for SqliteDatabase {
    async fn fetch_user_account(&self, customer_id: &str) -> Result<Option<UserAccount>, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        let account = user_accounts::fetch_user_account(customer_id, &mut conn).await?;
        Ok(account)
    }

    async fn upsert_user_account(
        &self,
        customer_id: &str,
        name: &str,
        email: &str,
    ) -> Result<UserAccount, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        user_accounts::upsert_user_account(customer_id, name, email, &mut conn).await
    }

    async fn adjust_wallet(&self, customer_id: &str, delta: Paise) -> Result<Paise, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        user_accounts::adjust_wallet(customer_id, delta, &mut conn).await
    }
}
