use crate::models::BillingPeriod;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use thiserror::Error;

/// Data-integrity failures of the next-payment calculation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("Malformed date: {value:?}")]
    MalformedDate { value: String },

    #[error("Billing interval must be positive")]
    InvalidInterval,

    #[error("Date out of range adding {count} {period}(s) to {from}")]
    OutOfRange {
        from: DateTime<Utc>,
        period: BillingPeriod,
        count: u32,
    },

    #[error("Next payment {candidate} still not after {now} after {iterations} catch-up iterations")]
    DidNotConverge {
        candidate: DateTime<Utc>,
        now: DateTime<Utc>,
        iterations: u32,
    },
}

impl ScheduleError {
    pub fn kind(&self) -> &'static str {
        match self {
            ScheduleError::MalformedDate { .. } => "malformed_date",
            ScheduleError::InvalidInterval => "invalid_interval",
            ScheduleError::OutOfRange { .. } => "out_of_range",
            ScheduleError::DidNotConverge { .. } => "did_not_converge",
        }
    }
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        AppError::DataIntegrity(anyhow::Error::new(err))
    }
}
