//! Billing terms model.

use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::fmt;
use std::str::FromStr;

/// Billing period a subscription interval is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingPeriod {
    Day,
    Week,
    Month,
    Year,
}

impl BillingPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingPeriod::Day => "day",
            BillingPeriod::Week => "week",
            BillingPeriod::Month => "month",
            BillingPeriod::Year => "year",
        }
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillingPeriod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(BillingPeriod::Day),
            "week" => Ok(BillingPeriod::Week),
            "month" => Ok(BillingPeriod::Month),
            "year" => Ok(BillingPeriod::Year),
            other => Err(AppError::BadRequest(anyhow::anyhow!(
                "Unknown billing period: {}",
                other
            ))),
        }
    }
}

/// Billing terms of one subscription product inside an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingTerms {
    pub period: BillingPeriod,
    pub interval: u32,
    #[serde(default)]
    pub trial_length: u32,
    #[serde(default)]
    pub trial_period: Option<BillingPeriod>,
    #[serde(default)]
    pub failed_payment_count: u32,
}

impl BillingTerms {
    pub fn new(period: BillingPeriod, interval: u32) -> Self {
        Self {
            period,
            interval,
            trial_length: 0,
            trial_period: None,
            failed_payment_count: 0,
        }
    }

    pub fn with_trial(mut self, length: u32, period: BillingPeriod) -> Self {
        self.trial_length = length;
        self.trial_period = Some(period);
        self
    }

    pub fn with_failed_payments(mut self, count: u32) -> Self {
        self.failed_payment_count = count;
        self
    }

    /// Trial offset configured on the product, if any.
    pub fn trial_offset(&self) -> Option<(u32, BillingPeriod)> {
        match self.trial_period {
            Some(period) if self.trial_length > 0 => Some((self.trial_length, period)),
            _ => None,
        }
    }
}
