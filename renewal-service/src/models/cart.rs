//! Cart and request context.

use super::order::{OrderId, ProductId, RenewalRole};
use super::subscription::SubscriptionKey;
use serde::{Deserialize, Serialize};

/// Renewal data the host attaches to a cart item restored from an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRenewal {
    pub original_order: OrderId,
    pub role: RenewalRole,
    #[serde(default)]
    pub is_active_subscription: bool,
    /// Unix seconds; 0 when unknown or no further payment is due.
    #[serde(default)]
    pub first_payment_timestamp: i64,
}

impl SubscriptionRenewal {
    pub fn new(original_order: OrderId, role: RenewalRole) -> Self {
        Self {
            original_order,
            role,
            is_active_subscription: false,
            first_payment_timestamp: 0,
        }
    }
}

/// Cart item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub subscription_renewal: Option<SubscriptionRenewal>,
}

fn default_quantity() -> u32 {
    1
}

impl CartItem {
    pub fn new(product_id: ProductId) -> Self {
        Self {
            product_id,
            quantity: default_quantity(),
            subscription_renewal: None,
        }
    }

    pub fn with_renewal(mut self, renewal: SubscriptionRenewal) -> Self {
        self.subscription_renewal = Some(renewal);
        self
    }
}

/// Session cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
}

impl Cart {
    /// First cart item flagged as renewing an active subscription.
    pub fn active_subscription_renewal(&self) -> Option<&SubscriptionRenewal> {
        self.items
            .iter()
            .filter_map(|item| item.subscription_renewal.as_ref())
            .find(|renewal| renewal.is_active_subscription)
    }
}

/// Per-request state handed to handlers instead of ambient globals.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Subscription the customer asked to renew (`renew_subscription` query arg).
    pub renew_subscription: Option<SubscriptionKey>,
    pub cart: Cart,
}

impl RequestContext {
    pub fn new(cart: Cart) -> Self {
        Self {
            renew_subscription: None,
            cart,
        }
    }

    pub fn renewing(mut self, key: SubscriptionKey) -> Self {
        self.renew_subscription = Some(key);
        self
    }
}
