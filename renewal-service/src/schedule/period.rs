use super::ScheduleError;
use crate::models::BillingPeriod;
use chrono::{DateTime, Duration, Months, Utc};

/// Add `count` billing periods to `from`.
///
/// Months and years move by calendar month and clamp to the last day of the
/// target month, so Jan 31 + 1 month is Feb 28 (or 29), never early March.
pub fn add_periods(
    from: DateTime<Utc>,
    period: BillingPeriod,
    count: u32,
) -> Result<DateTime<Utc>, ScheduleError> {
    let out_of_range = || ScheduleError::OutOfRange {
        from,
        period,
        count,
    };

    match period {
        BillingPeriod::Day => Duration::try_days(i64::from(count))
            .and_then(|delta| from.checked_add_signed(delta))
            .ok_or_else(out_of_range),
        BillingPeriod::Week => Duration::try_weeks(i64::from(count))
            .and_then(|delta| from.checked_add_signed(delta))
            .ok_or_else(out_of_range),
        BillingPeriod::Month => from
            .checked_add_months(Months::new(count))
            .ok_or_else(out_of_range),
        BillingPeriod::Year => count
            .checked_mul(12)
            .and_then(|months| from.checked_add_months(Months::new(months)))
            .ok_or_else(out_of_range),
    }
}
