//! In-memory host store.
//!
//! Backs the integration tests and embedders that keep subscription state in
//! process. Every write is recorded so callers can assert on side effects.

use super::host::SubscriptionHost;
use crate::models::{
    BillingTerms, CustomerId, ItemId, Order, OrderId, ProductId, RenewalRole, Subscription,
    SubscriptionKey,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::{DashMap, DashSet};
use service_core::error::AppError;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

#[derive(Debug, Default)]
pub struct MemoryHost {
    subscriptions: DashMap<SubscriptionKey, Subscription>,
    orders: DashMap<OrderId, Order>,
    terms: DashMap<(OrderId, ProductId), BillingTerms>,
    manual_renewal: DashMap<OrderId, bool>,
    meta: DashMap<(OrderId, String), String>,
    retry_locks: DashMap<SubscriptionKey, Duration>,
    rejected_writes: DashSet<SubscriptionKey>,
    next_payment_writes: AtomicUsize,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_subscription(&self, subscription: Subscription) {
        self.subscriptions.insert(subscription.key, subscription);
    }

    pub fn insert_order(&self, order: Order) {
        self.orders.insert(order.order_id, order);
    }

    pub fn insert_terms(&self, order_id: OrderId, product_id: ProductId, terms: BillingTerms) {
        self.terms.insert((order_id, product_id), terms);
    }

    pub fn set_manual_renewal(&self, order_id: OrderId, manual: bool) {
        self.manual_renewal.insert(order_id, manual);
    }

    pub fn insert_meta(&self, order_id: OrderId, key: &str, value: &str) {
        self.meta
            .insert((order_id, key.to_string()), value.to_string());
    }

    /// Make next-payment writes for `key` fail with a host error until
    /// [`MemoryHost::accept_writes`] is called.
    pub fn reject_writes(&self, key: SubscriptionKey) {
        self.rejected_writes.insert(key);
    }

    pub fn accept_writes(&self, key: &SubscriptionKey) {
        self.rejected_writes.remove(key);
    }

    pub fn subscription(&self, key: &SubscriptionKey) -> Option<Subscription> {
        self.subscriptions.get(key).map(|s| s.clone())
    }

    pub fn order(&self, order_id: OrderId) -> Option<Order> {
        self.orders.get(&order_id).map(|o| o.clone())
    }

    pub fn meta(&self, order_id: OrderId, key: &str) -> Option<String> {
        self.meta
            .get(&(order_id, key.to_string()))
            .map(|v| v.clone())
    }

    pub fn retry_lock(&self, key: &SubscriptionKey) -> Option<Duration> {
        self.retry_locks.get(key).map(|d| *d)
    }

    /// Number of `set_next_payment_date` calls so far.
    pub fn next_payment_writes(&self) -> usize {
        self.next_payment_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubscriptionHost for MemoryHost {
    async fn get_subscription(
        &self,
        key: &SubscriptionKey,
    ) -> Result<Option<Subscription>, AppError> {
        Ok(self.subscription(key))
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, AppError> {
        Ok(self.order(order_id))
    }

    async fn billing_terms(
        &self,
        order_id: OrderId,
        product_id: ProductId,
    ) -> Result<Option<BillingTerms>, AppError> {
        Ok(self.terms.get(&(order_id, product_id)).map(|t| t.clone()))
    }

    async fn requires_manual_renewal(&self, order_id: OrderId) -> Result<bool, AppError> {
        Ok(self
            .manual_renewal
            .get(&order_id)
            .map(|manual| *manual)
            .unwrap_or(false))
    }

    async fn is_item_subscription(
        &self,
        order_id: OrderId,
        product_id: ProductId,
    ) -> Result<bool, AppError> {
        Ok(self
            .subscriptions
            .contains_key(&SubscriptionKey::new(order_id, product_id)))
    }

    async fn set_next_payment_date(
        &self,
        key: &SubscriptionKey,
        customer_id: CustomerId,
        next_payment: Option<DateTime<Utc>>,
    ) -> Result<(), AppError> {
        if self.rejected_writes.contains(key) {
            return Err(AppError::HostError(anyhow::anyhow!(
                "Next payment write rejected for subscription {}",
                key
            )));
        }

        let mut subscription = self.subscriptions.get_mut(key).ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Subscription {} not found", key))
        })?;
        subscription.next_payment_date = next_payment;
        self.next_payment_writes.fetch_add(1, Ordering::SeqCst);

        debug!(subscription_key = %key, customer_id = customer_id, "Next payment date stored");
        Ok(())
    }

    async fn update_retry_lock(
        &self,
        key: &SubscriptionKey,
        _customer_id: CustomerId,
        lock_for: Duration,
    ) -> Result<(), AppError> {
        self.retry_locks.insert(*key, lock_for);
        Ok(())
    }

    async fn get_order_meta(
        &self,
        order_id: OrderId,
        key: &str,
    ) -> Result<Option<String>, AppError> {
        Ok(self.meta(order_id, key))
    }

    async fn set_order_meta(
        &self,
        order_id: OrderId,
        key: &str,
        value: &str,
    ) -> Result<(), AppError> {
        self.insert_meta(order_id, key, value);
        Ok(())
    }

    async fn find_orders_by_meta(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Vec<OrderId>, AppError> {
        let mut matches: Vec<OrderId> = self
            .meta
            .iter()
            .filter(|entry| entry.key().1 == key && entry.value() == value)
            .map(|entry| entry.key().0)
            .filter(|order_id| {
                self.orders
                    .get(order_id)
                    .map(|order| order.parent_order_id.is_none())
                    .unwrap_or(false)
            })
            .collect();
        matches.sort_unstable();
        Ok(matches)
    }

    async fn rename_order_item(&self, item_id: ItemId, name: &str) -> Result<(), AppError> {
        for mut order in self.orders.iter_mut() {
            if let Some(item) = order.items.iter_mut().find(|i| i.item_id == item_id) {
                item.name = name.to_string();
                return Ok(());
            }
        }

        Err(AppError::NotFound(anyhow::anyhow!(
            "Order item {} not found",
            item_id
        )))
    }

    fn renewal_link(&self, key: &SubscriptionKey, role: RenewalRole) -> String {
        format!(
            "/my-account/?renew_subscription={}&role={}",
            key,
            role.as_str()
        )
    }
}
