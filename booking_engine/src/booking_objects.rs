use std::fmt::Display;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{BookingStatus, PaymentStatus};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BookingQueryFilter {
    pub customer_id: Option<String>,
    pub partner_id: Option<i64>,
    pub service: Option<String>,
    pub pincode: Option<String>,
    pub status: Option<Vec<BookingStatus>>,
    pub payment_status: Option<PaymentStatus>,
    /// Keep bookings whose requested service date is on or after this day.
    pub scheduled_on_or_after: Option<NaiveDate>,
    /// Keep bookings whose requested service date is strictly before this day.
    pub scheduled_before: Option<NaiveDate>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    /// True for unclaimed bookings only, false for claimed only; `None` matches both.
    pub claimed: Option<bool>,
}

impl BookingQueryFilter {
    pub fn with_customer_id<S: Into<String>>(mut self, customer_id: S) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn with_partner_id(mut self, partner_id: i64) -> Self {
        self.partner_id = Some(partner_id);
        self
    }

    pub fn with_service<S: Into<String>>(mut self, service: S) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_pincode<S: Into<String>>(mut self, pincode: S) -> Self {
        self.pincode = Some(pincode.into());
        self
    }

    pub fn with_status(mut self, status: BookingStatus) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn with_payment_status(mut self, payment_status: PaymentStatus) -> Self {
        self.payment_status = Some(payment_status);
        self
    }

    pub fn scheduled_on_or_after(mut self, day: NaiveDate) -> Self {
        self.scheduled_on_or_after = Some(day);
        self
    }

    pub fn scheduled_before(mut self, day: NaiveDate) -> Self {
        self.scheduled_before = Some(day);
        self
    }

    pub fn created_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn created_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn unclaimed_only(mut self) -> Self {
        self.claimed = Some(false);
        self
    }

    pub fn claimed_only(mut self) -> Self {
        self.claimed = Some(true);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.customer_id.is_none()
            && self.partner_id.is_none()
            && self.service.is_none()
            && self.pincode.is_none()
            && self.status.is_none()
            && self.payment_status.is_none()
            && self.scheduled_on_or_after.is_none()
            && self.scheduled_before.is_none()
            && self.since.is_none()
            && self.until.is_none()
            && self.claimed.is_none()
    }
}

impl Display for BookingQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "No filters.")?;
            return Ok(());
        }
        if let Some(customer_id) = &self.customer_id {
            write!(f, "customer_id: {customer_id}. ")?;
        }
        if let Some(partner_id) = &self.partner_id {
            write!(f, "partner_id: {partner_id}. ")?;
        }
        if let Some(service) = &self.service {
            write!(f, "service: {service}. ")?;
        }
        if let Some(pincode) = &self.pincode {
            write!(f, "pincode: {pincode}. ")?;
        }
        if let Some(statuses) = &self.status {
            let statuses = statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "statuses: [{statuses}]. ")?;
        }
        if let Some(payment_status) = &self.payment_status {
            write!(f, "payment_status: {payment_status}. ")?;
        }
        if let Some(day) = &self.scheduled_on_or_after {
            write!(f, "scheduled on or after {day}. ")?;
        }
        if let Some(day) = &self.scheduled_before {
            write!(f, "scheduled before {day}. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "created since {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "created until {until}. ")?;
        }
        if let Some(claimed) = &self.claimed {
            write!(f, "{}. ", if *claimed { "claimed only" } else { "unclaimed only" })?;
        }
        Ok(())
    }
}
