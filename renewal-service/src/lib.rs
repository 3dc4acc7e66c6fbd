//! Renewal Service - early manual renewal of active subscriptions.
//!
//! Handlers here are attached to the host store's extension points. They read
//! and mutate host-owned records through [`services::SubscriptionHost`] and
//! push the next-payment date of a subscription forward when an early
//! renewal order is paid, so the customer is not charged twice.

pub mod config;
pub mod hooks;
pub mod models;
pub mod schedule;
pub mod services;
pub mod startup;
