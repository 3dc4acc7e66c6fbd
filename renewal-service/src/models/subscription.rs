//! Subscription model.

use super::order::{OrderId, ProductId};
use crate::schedule::dates::{parse_host_date, parse_optional_host_date};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
    Trash,
    Failed,
    Pending,
    OnHold,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Trash => "trash",
            SubscriptionStatus::Failed => "failed",
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::OnHold => "on-hold",
        }
    }

    /// Statuses a new renewal purchase may be started from.
    pub fn allows_renewal(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active
                | SubscriptionStatus::Cancelled
                | SubscriptionStatus::Expired
                | SubscriptionStatus::Trash
                | SubscriptionStatus::Failed
        )
    }
}

impl FromStr for SubscriptionStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SubscriptionStatus::Active),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            "expired" => Ok(SubscriptionStatus::Expired),
            "trash" => Ok(SubscriptionStatus::Trash),
            "failed" => Ok(SubscriptionStatus::Failed),
            "pending" => Ok(SubscriptionStatus::Pending),
            "on-hold" => Ok(SubscriptionStatus::OnHold),
            other => Err(AppError::BadRequest(anyhow::anyhow!(
                "Unknown subscription status: {}",
                other
            ))),
        }
    }
}

/// Subscription identity: the order that bought it plus the product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionKey {
    pub order_id: OrderId,
    pub product_id: ProductId,
}

impl SubscriptionKey {
    pub fn new(order_id: OrderId, product_id: ProductId) -> Self {
        Self {
            order_id,
            product_id,
        }
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.order_id, self.product_id)
    }
}

impl FromStr for SubscriptionKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::BadRequest(anyhow::anyhow!("Invalid subscription key: {}", s));

        let (order, product) = s.split_once('_').ok_or_else(invalid)?;
        let order_id = order.parse().map_err(|_| invalid())?;
        let product_id = product.parse().map_err(|_| invalid())?;

        Ok(Self::new(order_id, product_id))
    }
}

/// Subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub key: SubscriptionKey,
    pub status: SubscriptionStatus,
    /// Completed payments, oldest first.
    pub completed_payments: Vec<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub trial_expiry_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub next_payment_date: Option<DateTime<Utc>>,
}

impl Subscription {
    pub fn last_payment(&self) -> Option<DateTime<Utc>> {
        self.completed_payments.last().copied()
    }
}

/// Subscription as the host stores it: string statuses and dates, `"0"` for none.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub status: String,
    #[serde(default)]
    pub completed_payments: Vec<String>,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub trial_expiry_date: String,
    #[serde(default)]
    pub expiry_date: String,
    #[serde(default)]
    pub next_payment_date: String,
}

impl TryFrom<SubscriptionRecord> for Subscription {
    type Error = AppError;

    fn try_from(record: SubscriptionRecord) -> Result<Self, Self::Error> {
        let completed_payments = record
            .completed_payments
            .iter()
            .map(|value| parse_host_date(value))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            key: SubscriptionKey::new(record.order_id, record.product_id),
            status: record.status.parse()?,
            completed_payments,
            start_date: parse_optional_host_date(&record.start_date)?,
            trial_expiry_date: parse_optional_host_date(&record.trial_expiry_date)?,
            expiry_date: parse_optional_host_date(&record.expiry_date)?,
            next_payment_date: parse_optional_host_date(&record.next_payment_date)?,
        })
    }
}

/// Action button shown next to a subscription in the customer's account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionAction {
    pub url: String,
    pub name: String,
}

/// Actions per subscription, keyed by action slug (`renew`, `cancel`, ...).
pub type AccountActions = BTreeMap<SubscriptionKey, BTreeMap<String, SubscriptionAction>>;
