//! Integration tests for next payment calculation against the host store.

mod common;

use common::*;
use renewal_service::hooks::{CalculationContext, HookRegistry};
use renewal_service::models::{BillingPeriod, BillingTerms};
use renewal_service::schedule::{FromDate, PaymentDateFormat, PaymentDateValue};
use std::sync::{Arc, Mutex};

#[tokio::test]
async fn test_early_renewal_counts_from_scheduled_payment() {
    let (_host, handlers) = setup();

    let value = handlers
        .calculate_next_payment_date(PARENT_ORDER_ID, PRODUCT_ID, PaymentDateFormat::Timestamp)
        .await
        .unwrap();

    assert_eq!(value, Some(PaymentDateValue::Timestamp(at(2013, 4, 1).timestamp())));
}

#[tokio::test]
async fn test_mysql_format_is_rendered() {
    let (_host, handlers) = setup();

    let value = handlers
        .calculate_next_payment_date(PARENT_ORDER_ID, PRODUCT_ID, PaymentDateFormat::Mysql)
        .await
        .unwrap();

    assert_eq!(
        value,
        Some(PaymentDateValue::Formatted("2013-04-01 00:00:00".to_string()))
    );
}

#[tokio::test]
async fn test_without_from_date_last_payment_is_used() {
    let (_host, handlers) = setup();

    let value = handlers
        .early_renew_calculate_next_payment_date(
            PARENT_ORDER_ID,
            PRODUCT_ID,
            PaymentDateFormat::Timestamp,
            None,
        )
        .await
        .unwrap();

    assert_eq!(value, Some(PaymentDateValue::Timestamp(at(2013, 3, 1).timestamp())));
}

#[tokio::test]
async fn test_explicit_from_date_string_is_accepted() {
    let (_host, handlers) = setup();

    let value = handlers
        .early_renew_calculate_next_payment_date(
            PARENT_ORDER_ID,
            PRODUCT_ID,
            PaymentDateFormat::Timestamp,
            Some(FromDate::Date("2013-03-31 00:00:00".to_string())),
        )
        .await
        .unwrap();

    assert_eq!(value, Some(PaymentDateValue::Timestamp(at(2013, 4, 30).timestamp())));
}

#[tokio::test]
async fn test_missing_records_yield_no_value() {
    let (host, handlers) = setup();

    let unknown_order = handlers
        .calculate_next_payment_date(999, PRODUCT_ID, PaymentDateFormat::Timestamp)
        .await
        .unwrap();
    assert_eq!(unknown_order, None);

    let unknown_product = handlers
        .early_renew_calculate_next_payment_date(
            PARENT_ORDER_ID,
            999,
            PaymentDateFormat::Timestamp,
            None,
        )
        .await
        .unwrap();
    assert_eq!(unknown_product, None);

    host.insert_terms(PARENT_ORDER_ID, 8, BillingTerms::new(BillingPeriod::Week, 1));
    let no_subscription = handlers
        .early_renew_calculate_next_payment_date(
            PARENT_ORDER_ID,
            8,
            PaymentDateFormat::Timestamp,
            None,
        )
        .await
        .unwrap();
    assert_eq!(no_subscription, None);
}

#[tokio::test]
async fn test_filters_see_calculation_context() {
    let host = seeded_host();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let mut hooks = HookRegistry::new();
    hooks.add_next_payment_filter(move |value: PaymentDateValue, ctx: &CalculationContext| {
        sink.lock().unwrap().push(ctx.clone());
        value
    });
    let handlers = handlers(&host, hooks);

    handlers
        .calculate_next_payment_date(PARENT_ORDER_ID, PRODUCT_ID, PaymentDateFormat::Timestamp)
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].order_id, PARENT_ORDER_ID);
    assert_eq!(seen[0].product_id, PRODUCT_ID);
    assert_eq!(seen[0].from_date, at(2013, 3, 1));
    assert_eq!(
        seen[0].requested_from,
        Some(FromDate::Timestamp(at(2013, 3, 1).timestamp()))
    );
}
