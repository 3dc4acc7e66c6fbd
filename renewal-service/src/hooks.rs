//! Extension points exposed to code embedding the renewal handlers.
//!
//! Filters may rewrite a calculated next-payment date; observers are told
//! when an early renewal pushed a subscription's schedule forward. Both are
//! registered explicitly on a [`HookRegistry`] and run in registration order.

use crate::models::{Order, OrderId, ProductId, SubscriptionKey};
use crate::schedule::{FromDate, PaymentDateFormat, PaymentDateValue};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// Inputs a next-payment calculation was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalculationContext {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub format: PaymentDateFormat,
    pub from_date: DateTime<Utc>,
    pub requested_from: Option<FromDate>,
    pub trial_end: Option<DateTime<Utc>>,
}

/// Override point for calculated next-payment dates.
pub trait NextPaymentFilter: Send + Sync {
    fn filter(&self, value: PaymentDateValue, context: &CalculationContext) -> PaymentDateValue;
}

impl<F> NextPaymentFilter for F
where
    F: Fn(PaymentDateValue, &CalculationContext) -> PaymentDateValue + Send + Sync,
{
    fn filter(&self, value: PaymentDateValue, context: &CalculationContext) -> PaymentDateValue {
        self(value, context)
    }
}

/// Fired after an active subscription's schedule was advanced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRenewalEvent {
    pub parent_order: Order,
    pub subscription_key: SubscriptionKey,
    /// Unix seconds; 0 when no further payment is due.
    pub next_payment: i64,
}

pub trait RenewalObserver: Send + Sync {
    fn active_subscription_renewed(&self, event: &ActiveRenewalEvent);
}

impl<F> RenewalObserver for F
where
    F: Fn(&ActiveRenewalEvent) + Send + Sync,
{
    fn active_subscription_renewed(&self, event: &ActiveRenewalEvent) {
        self(event)
    }
}

#[derive(Clone, Default)]
pub struct HookRegistry {
    next_payment_filters: Vec<Arc<dyn NextPaymentFilter>>,
    renewal_observers: Vec<Arc<dyn RenewalObserver>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_next_payment_filter(&mut self, filter: impl NextPaymentFilter + 'static) -> &mut Self {
        self.next_payment_filters.push(Arc::new(filter));
        self
    }

    pub fn add_renewal_observer(&mut self, observer: impl RenewalObserver + 'static) -> &mut Self {
        self.renewal_observers.push(Arc::new(observer));
        self
    }

    pub fn apply_next_payment_filters(
        &self,
        value: PaymentDateValue,
        context: &CalculationContext,
    ) -> PaymentDateValue {
        self.next_payment_filters
            .iter()
            .fold(value, |value, filter| filter.filter(value, context))
    }

    pub fn notify_active_subscription_renewed(&self, event: &ActiveRenewalEvent) {
        for observer in &self.renewal_observers {
            observer.active_subscription_renewed(event);
        }
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("next_payment_filters", &self.next_payment_filters.len())
            .field("renewal_observers", &self.renewal_observers.len())
            .finish()
    }
}
