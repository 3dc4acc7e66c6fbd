//! Next-payment date calculator.
//!
//! Pure function of the subscription, its billing terms and the current
//! time. Host lookups and the override filters live in
//! [`crate::services::RenewActive`].

use super::dates::{format_mysql, from_timestamp, parse_host_date};
use super::{add_periods, ScheduleError};
use crate::models::{BillingTerms, Subscription};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_EXPIRY_TOLERANCE_SECS: i64 = 120;
pub const DEFAULT_MAX_CATCH_UP_ITERATIONS: u32 = 30;

/// Bounds applied by the calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleLimits {
    /// A next payment within this distance of the expiry date is dropped.
    pub expiry_tolerance: Duration,
    /// Maximum extra intervals added to move a stale date into the future.
    pub max_catch_up_iterations: u32,
}

impl Default for ScheduleLimits {
    fn default() -> Self {
        Self {
            expiry_tolerance: Duration::seconds(DEFAULT_EXPIRY_TOLERANCE_SECS),
            max_catch_up_iterations: DEFAULT_MAX_CATCH_UP_ITERATIONS,
        }
    }
}

/// Explicit starting point of a calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FromDate {
    /// Unix timestamp in seconds.
    Timestamp(i64),
    /// Host date string.
    Date(String),
}

impl FromDate {
    pub fn resolve(&self) -> Result<DateTime<Utc>, ScheduleError> {
        match self {
            FromDate::Timestamp(ts) => from_timestamp(*ts),
            FromDate::Date(value) => parse_host_date(value),
        }
    }
}

impl From<DateTime<Utc>> for FromDate {
    fn from(date: DateTime<Utc>) -> Self {
        FromDate::Timestamp(date.timestamp())
    }
}

/// Where the base date of a calculation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FromSource {
    Explicit,
    LastPayment,
    StartDate,
    Now,
}

impl FromSource {
    /// Failed payments only shift dates taken from the subscription itself.
    fn shifts_failed_payments(&self) -> bool {
        matches!(self, FromSource::LastPayment | FromSource::StartDate)
    }
}

/// Requested output of a calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentDateFormat {
    Timestamp,
    Mysql,
}

/// Rendered next-payment date. `Timestamp(0)` means no further payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaymentDateValue {
    Timestamp(i64),
    Formatted(String),
}

impl PaymentDateValue {
    pub fn is_no_further_payment(&self) -> bool {
        matches!(self, PaymentDateValue::Timestamp(0))
    }

    pub fn as_timestamp(&self) -> Result<i64, ScheduleError> {
        match self {
            PaymentDateValue::Timestamp(ts) => Ok(*ts),
            PaymentDateValue::Formatted(value) => parse_host_date(value).map(|d| d.timestamp()),
        }
    }

    pub fn to_next_payment(&self) -> Result<NextPayment, ScheduleError> {
        match self.as_timestamp()? {
            0 => Ok(NextPayment::NoFurtherPayment),
            ts => from_timestamp(ts).map(NextPayment::Scheduled),
        }
    }
}

/// Outcome of a calculation before formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPayment {
    Scheduled(DateTime<Utc>),
    /// The next period would start at or after the subscription's expiry.
    NoFurtherPayment,
}

impl NextPayment {
    pub fn date(&self) -> Option<DateTime<Utc>> {
        match self {
            NextPayment::Scheduled(date) => Some(*date),
            NextPayment::NoFurtherPayment => None,
        }
    }

    pub fn timestamp(&self) -> i64 {
        self.date().map(|d| d.timestamp()).unwrap_or(0)
    }

    pub fn render(&self, format: PaymentDateFormat) -> PaymentDateValue {
        match (self, format) {
            (NextPayment::Scheduled(date), PaymentDateFormat::Mysql) => {
                PaymentDateValue::Formatted(format_mysql(*date))
            }
            _ => PaymentDateValue::Timestamp(self.timestamp()),
        }
    }
}

/// Everything the calculator reads.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleInput<'a> {
    pub subscription: &'a Subscription,
    pub terms: &'a BillingTerms,
    pub order_date: DateTime<Utc>,
    pub from: Option<&'a FromDate>,
    pub now: DateTime<Utc>,
}

/// Result of a calculation plus the intermediate values it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calculation {
    pub next_payment: NextPayment,
    pub from_date: DateTime<Utc>,
    pub from_source: FromSource,
    pub trial_end: Option<DateTime<Utc>>,
    pub failed_payment_periods: u32,
    pub catch_up_iterations: u32,
}

/// Compute the first payment strictly after `input.now`.
pub fn calculate_next_payment(
    input: &ScheduleInput<'_>,
    limits: &ScheduleLimits,
) -> Result<Calculation, ScheduleError> {
    let terms = input.terms;
    let subscription = input.subscription;

    if terms.interval == 0 {
        return Err(ScheduleError::InvalidInterval);
    }

    let trial_end = match subscription.trial_expiry_date {
        Some(date) => Some(date),
        None => terms
            .trial_offset()
            .map(|(length, period)| add_periods(input.order_date, period, length))
            .transpose()?,
    };

    let (mut from_date, from_source) = match input.from {
        Some(explicit) => (explicit.resolve()?, FromSource::Explicit),
        None => match (subscription.last_payment(), subscription.start_date) {
            (Some(last), _) => (last, FromSource::LastPayment),
            (None, Some(start)) => (start, FromSource::StartDate),
            (None, None) => (input.now, FromSource::Now),
        },
    };

    let mut failed_payment_periods = 0;
    if from_source.shifts_failed_payments() && terms.failed_payment_count > 0 {
        failed_payment_periods = terms
            .failed_payment_count
            .checked_mul(terms.interval)
            .ok_or(ScheduleError::OutOfRange {
                from: from_date,
                period: terms.period,
                count: u32::MAX,
            })?;
        from_date = add_periods(from_date, terms.period, failed_payment_periods)?;
    }

    let mut candidate = add_periods(from_date, terms.period, terms.interval)?;

    let mut catch_up_iterations = 0;
    while candidate <= input.now {
        if catch_up_iterations >= limits.max_catch_up_iterations {
            return Err(ScheduleError::DidNotConverge {
                candidate,
                now: input.now,
                iterations: catch_up_iterations,
            });
        }
        candidate = add_periods(candidate, terms.period, terms.interval)?;
        catch_up_iterations += 1;
    }

    let next_payment = match subscription.expiry_date {
        Some(expiry) if candidate + limits.expiry_tolerance >= expiry => {
            NextPayment::NoFurtherPayment
        }
        _ => NextPayment::Scheduled(candidate),
    };

    Ok(Calculation {
        next_payment,
        from_date,
        from_source,
        trial_end,
        failed_payment_periods,
        catch_up_iterations,
    })
}
