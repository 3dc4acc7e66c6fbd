//! Test helper module for renewal-service integration tests.
//!
//! Seeds an in-memory host with one active monthly subscription bought in
//! order 100 and a manually paid child renewal order 200.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use renewal_service::hooks::{ActiveRenewalEvent, HookRegistry};
use renewal_service::models::{
    BillingPeriod, BillingTerms, Cart, CartItem, Order, OrderId, OrderItem, OrderMetaKey,
    ProductId, RenewalRole, RequestContext, Subscription, SubscriptionKey, SubscriptionRenewal,
    SubscriptionStatus, META_TRUE,
};
use renewal_service::services::{MemoryHost, RenewActive};
use std::sync::{Arc, Mutex};

pub const PARENT_ORDER_ID: OrderId = 100;
pub const RENEWAL_ORDER_ID: OrderId = 200;
pub const PRODUCT_ID: ProductId = 7;
pub const SECOND_PRODUCT_ID: ProductId = 8;
pub const CUSTOMER_ID: u64 = 42;
pub const PARENT_ITEM_ID: u64 = 1;
pub const RENEWAL_ITEM_ID: u64 = 11;
pub const SECOND_RENEWAL_ITEM_ID: u64 = 12;

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

/// Fixed "now" for every handler in these tests.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2013, 2, 20, 12, 0, 0).unwrap()
}

pub fn key() -> SubscriptionKey {
    SubscriptionKey::new(PARENT_ORDER_ID, PRODUCT_ID)
}

/// Active, paid twice, next payment due 2013-03-01.
pub fn active_subscription() -> Subscription {
    Subscription {
        key: key(),
        status: SubscriptionStatus::Active,
        completed_payments: vec![at(2013, 1, 1), at(2013, 2, 1)],
        start_date: Some(at(2013, 1, 1)),
        trial_expiry_date: None,
        expiry_date: None,
        next_payment_date: Some(at(2013, 3, 1)),
    }
}

pub fn parent_order() -> Order {
    Order {
        order_id: PARENT_ORDER_ID,
        customer_id: CUSTOMER_ID,
        order_date: at(2013, 1, 1),
        parent_order_id: None,
        renewal_role: None,
        items: vec![OrderItem::line_item(PARENT_ITEM_ID, PRODUCT_ID, "Monthly Box")],
    }
}

pub fn renewal_order(role: RenewalRole) -> Order {
    Order {
        order_id: RENEWAL_ORDER_ID,
        customer_id: CUSTOMER_ID,
        order_date: now(),
        parent_order_id: Some(PARENT_ORDER_ID),
        renewal_role: Some(role),
        items: vec![OrderItem::line_item(
            RENEWAL_ITEM_ID,
            PRODUCT_ID,
            "Renewal of Monthly Box purchased in Order 100",
        )],
    }
}

pub fn seeded_host() -> Arc<MemoryHost> {
    let host = Arc::new(MemoryHost::new());
    host.insert_order(parent_order());
    host.insert_order(renewal_order(RenewalRole::Child));
    host.insert_subscription(active_subscription());
    host.insert_terms(
        PARENT_ORDER_ID,
        PRODUCT_ID,
        BillingTerms::new(BillingPeriod::Month, 1),
    );
    host.set_manual_renewal(PARENT_ORDER_ID, true);
    host.insert_meta(
        RENEWAL_ORDER_ID,
        OrderMetaKey::OriginalOrder.as_str(),
        &PARENT_ORDER_ID.to_string(),
    );
    host
}

pub fn handlers(host: &Arc<MemoryHost>, hooks: HookRegistry) -> RenewActive {
    RenewActive::new(host.clone(), hooks).with_clock(now)
}

/// Seeded host plus handlers without any registered hooks.
pub fn setup() -> (Arc<MemoryHost>, RenewActive) {
    let host = seeded_host();
    let handlers = handlers(&host, HookRegistry::new());
    (host, handlers)
}

/// Mark the renewal order as renewing an active subscription.
pub fn mark_active_renewal(host: &MemoryHost) {
    host.insert_meta(
        RENEWAL_ORDER_ID,
        OrderMetaKey::ActiveSubscriptionRenewal.as_str(),
        META_TRUE,
    );
}

pub fn renewal_cart_item() -> CartItem {
    CartItem::new(PRODUCT_ID)
        .with_renewal(SubscriptionRenewal::new(PARENT_ORDER_ID, RenewalRole::Child))
}

pub fn renewing_context(cart: Cart) -> RequestContext {
    RequestContext::new(cart).renewing(key())
}

/// Observer that records every event it receives.
pub fn recording_hooks() -> (HookRegistry, Arc<Mutex<Vec<ActiveRenewalEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);

    let mut hooks = HookRegistry::new();
    hooks.add_renewal_observer(move |event: &ActiveRenewalEvent| {
        sink.lock().unwrap().push(event.clone());
    });

    (hooks, events)
}

pub fn second_key() -> SubscriptionKey {
    SubscriptionKey::new(PARENT_ORDER_ID, SECOND_PRODUCT_ID)
}

/// Add a second subscription, due 2013-03-15, to the parent and renewal orders.
pub fn add_second_subscription(host: &MemoryHost, terms: BillingTerms) {
    let mut subscription = active_subscription();
    subscription.key = second_key();
    subscription.next_payment_date = Some(at(2013, 3, 15));
    host.insert_subscription(subscription);
    host.insert_terms(PARENT_ORDER_ID, SECOND_PRODUCT_ID, terms);

    let mut order = renewal_order(RenewalRole::Child);
    order.items.push(OrderItem::line_item(
        SECOND_RENEWAL_ITEM_ID,
        SECOND_PRODUCT_ID,
        "Renewal of Weekly Tea purchased in Order 100",
    ));
    host.insert_order(order);
}
