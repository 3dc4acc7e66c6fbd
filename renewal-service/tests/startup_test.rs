//! Integration tests for process bootstrap and metrics.

mod common;

use chrono::{Duration, Utc};
use common::*;
use renewal_service::config::RenewalConfig;
use renewal_service::hooks::HookRegistry;
use renewal_service::models::OrderStatus;
use renewal_service::services::{get_metrics, AdvanceOutcome};
use renewal_service::startup::{bootstrap, Application};
use serial_test::serial;

#[test]
#[serial]
fn test_bootstrap_installs_logging_once() {
    let mut config = RenewalConfig::default();
    config.common.json_logs = false;

    assert!(bootstrap(&config).is_ok());
    assert!(bootstrap(&config).is_err());
}

#[tokio::test]
#[serial]
async fn test_application_handlers_record_metrics() {
    let host = seeded_host();
    let mut subscription = active_subscription();
    subscription.next_payment_date = Some(Utc::now() + Duration::days(5));
    host.insert_subscription(subscription);
    mark_active_renewal(&host);
    let app = Application::build(RenewalConfig::default(), host.clone(), HookRegistry::new())
        .unwrap();

    let outcome = app
        .handlers()
        .on_order_status_changed(RENEWAL_ORDER_ID, OrderStatus::Pending, OrderStatus::Completed)
        .await
        .unwrap();
    assert!(matches!(outcome, AdvanceOutcome::Advanced(_)));

    let metrics = get_metrics();
    assert!(metrics.contains("renewal_schedule_advances_total"));
    assert!(metrics.contains("renewal_next_payment_catch_up_iterations"));
}

#[test]
#[serial]
fn test_invalid_config_is_rejected_at_build() {
    let mut config = RenewalConfig::default();
    config.display.date_format = "%Q".to_string();

    assert!(Application::build(config, seeded_host(), HookRegistry::new()).is_err());
}
