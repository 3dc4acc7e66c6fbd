//! Domain models for renewal-service.

mod billing;
mod cart;
mod order;
mod subscription;

pub use billing::{BillingPeriod, BillingTerms};
pub use cart::{Cart, CartItem, RequestContext, SubscriptionRenewal};
pub use order::{
    CustomerId, ItemId, Order, OrderId, OrderItem, OrderItemType, OrderMetaKey, OrderStatus,
    ProductId, RenewalRole, META_TRUE,
};
pub use subscription::{
    AccountActions, Subscription, SubscriptionAction, SubscriptionKey, SubscriptionRecord,
    SubscriptionStatus,
};
