//! Next-payment date calculation.

mod calculator;
pub mod dates;
mod error;
mod period;

pub use calculator::{
    calculate_next_payment, Calculation, FromDate, FromSource, NextPayment, PaymentDateFormat,
    PaymentDateValue, ScheduleInput, ScheduleLimits, DEFAULT_EXPIRY_TOLERANCE_SECS,
    DEFAULT_MAX_CATCH_UP_ITERATIONS,
};
pub use error::ScheduleError;
pub use period::add_periods;
