//! Collaborator interface of the host subscription store.

use crate::models::{
    BillingTerms, CustomerId, ItemId, Order, OrderId, ProductId, RenewalRole, Subscription,
    SubscriptionKey,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use service_core::error::AppError;

/// Operations the host store provides. Missing records are `Ok(None)`;
/// `Err` is reserved for the store itself failing.
#[async_trait]
pub trait SubscriptionHost: Send + Sync {
    async fn get_subscription(&self, key: &SubscriptionKey)
        -> Result<Option<Subscription>, AppError>;

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, AppError>;

    /// Parent of a renewal order, if it has one.
    async fn get_parent_order(&self, order: &Order) -> Result<Option<Order>, AppError> {
        match order.parent_order_id {
            Some(parent_id) => self.get_order(parent_id).await,
            None => Ok(None),
        }
    }

    async fn billing_terms(
        &self,
        order_id: OrderId,
        product_id: ProductId,
    ) -> Result<Option<BillingTerms>, AppError>;

    /// True when renewals of this order are paid by hand instead of charged automatically.
    async fn requires_manual_renewal(&self, order_id: OrderId) -> Result<bool, AppError>;

    async fn is_item_subscription(
        &self,
        order_id: OrderId,
        product_id: ProductId,
    ) -> Result<bool, AppError>;

    /// `None` clears the scheduled payment.
    async fn set_next_payment_date(
        &self,
        key: &SubscriptionKey,
        customer_id: CustomerId,
        next_payment: Option<DateTime<Utc>>,
    ) -> Result<(), AppError>;

    /// Reset the scheduled-payment lock so it expires after `lock_for`.
    async fn update_retry_lock(
        &self,
        key: &SubscriptionKey,
        customer_id: CustomerId,
        lock_for: Duration,
    ) -> Result<(), AppError>;

    async fn get_order_meta(&self, order_id: OrderId, key: &str)
        -> Result<Option<String>, AppError>;

    async fn set_order_meta(&self, order_id: OrderId, key: &str, value: &str)
        -> Result<(), AppError>;

    /// Top-level orders (no parent) whose metadata `key` equals `value`.
    async fn find_orders_by_meta(&self, key: &str, value: &str)
        -> Result<Vec<OrderId>, AppError>;

    /// Persist a new display name for an order item.
    async fn rename_order_item(&self, item_id: ItemId, name: &str) -> Result<(), AppError>;

    /// URL that starts a renewal of `key` in the given role.
    fn renewal_link(&self, key: &SubscriptionKey, role: RenewalRole) -> String;
}
