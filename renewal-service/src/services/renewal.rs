//! Early renewal handlers.
//!
//! Each public method corresponds to one host extension point. Precondition
//! misses return the input unchanged (or a negative result); only store
//! failures and calculation data-integrity errors are surfaced as `Err`.

use super::host::SubscriptionHost;
use super::metrics::{
    record_calculation_error, record_catch_up_iterations, record_handler_invocation,
    record_schedule_advance,
};
use crate::config::{RenewalConfig, DEFAULT_DATE_FORMAT};
use crate::hooks::{ActiveRenewalEvent, CalculationContext, HookRegistry};
use crate::models::{
    AccountActions, Cart, CartItem, OrderId, OrderItem, OrderItemType, OrderMetaKey, OrderStatus,
    ProductId, RenewalRole, RequestContext, Subscription, SubscriptionAction, SubscriptionKey,
    SubscriptionStatus, META_TRUE,
};
use crate::schedule::dates::from_timestamp;
use crate::schedule::{
    calculate_next_payment, FromDate, NextPayment, PaymentDateFormat, PaymentDateValue,
    ScheduleInput, ScheduleLimits,
};
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use service_core::error::AppError;
use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

static RENEWAL_ITEM_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(Renewal of .*?) purchased in Order .*$")
        .expect("Failed to compile RENEWAL_ITEM_NAME")
});

const RENEW_ACTION: &str = "renew";
const EARLY_RENEW_LABEL: &str = "Early Renew";

/// `"Renewal of X purchased in Order Y"` → `"Renewal of X"`; `None` if the name does not match.
pub fn strip_order_reference(name: &str) -> Option<&str> {
    RENEWAL_ITEM_NAME
        .captures(name)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// A subscription whose schedule was pushed forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvancedSubscription {
    pub key: SubscriptionKey,
    pub next_payment: NextPayment,
}

/// Result of handling a completed renewal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// Not a manually paid child renewal order.
    NotApplicable,
    /// The order does not renew an active subscription.
    NotActiveRenewal,
    /// The schedule was already advanced for this order.
    AlreadyAdvanced,
    Advanced(Vec<AdvancedSubscription>),
}

impl AdvanceOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            AdvanceOutcome::NotApplicable => "not_applicable",
            AdvanceOutcome::NotActiveRenewal => "not_active_renewal",
            AdvanceOutcome::AlreadyAdvanced => "already_advanced",
            AdvanceOutcome::Advanced(_) => "advanced",
        }
    }
}

/// Host extension points the handlers subscribe to.
#[derive(Debug, Clone)]
pub enum HostEvent {
    /// A cart item is being rebuilt from a previous order.
    CartItemRestored { item: CartItem },
    RenewalOrderCreated {
        renewal_order_id: OrderId,
        original_order_id: OrderId,
        product_id: ProductId,
        role: RenewalRole,
    },
    OrderStatusChanged {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },
    OrderItemCreated { order_id: OrderId, item: OrderItem },
}

impl HostEvent {
    pub fn name(&self) -> &'static str {
        match self {
            HostEvent::CartItemRestored { .. } => "cart_item_restored",
            HostEvent::RenewalOrderCreated { .. } => "renewal_order_created",
            HostEvent::OrderStatusChanged { .. } => "order_status_changed",
            HostEvent::OrderItemCreated { .. } => "order_item_created",
        }
    }
}

/// What a dispatched event produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    CartItem(CartItem),
    OrderTagged(bool),
    Schedule(AdvanceOutcome),
    ItemRenamed(Option<String>),
}

pub struct RenewActive {
    host: Arc<dyn SubscriptionHost>,
    hooks: HookRegistry,
    limits: ScheduleLimits,
    date_format: String,
    clock: Clock,
}

impl fmt::Debug for RenewActive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenewActive")
            .field("hooks", &self.hooks)
            .field("limits", &self.limits)
            .field("date_format", &self.date_format)
            .finish_non_exhaustive()
    }
}

impl RenewActive {
    pub fn new(host: Arc<dyn SubscriptionHost>, hooks: HookRegistry) -> Self {
        Self {
            host,
            hooks,
            limits: ScheduleLimits::default(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            clock: Arc::new(Utc::now),
        }
    }

    pub fn from_config(
        host: Arc<dyn SubscriptionHost>,
        hooks: HookRegistry,
        config: &RenewalConfig,
    ) -> Result<Self, AppError> {
        config.validate()?;

        Ok(Self {
            limits: config.limits()?,
            date_format: config.display.date_format.clone(),
            ..Self::new(host, hooks)
        })
    }

    pub fn with_clock(
        mut self,
        clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static,
    ) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    async fn has_flag(&self, order_id: OrderId, key: OrderMetaKey) -> Result<bool, AppError> {
        let value = self.host.get_order_meta(order_id, key.as_str()).await?;
        Ok(value.as_deref() == Some(META_TRUE))
    }

    async fn set_flag(&self, order_id: OrderId, key: OrderMetaKey) -> Result<(), AppError> {
        self.host
            .set_order_meta(order_id, key.as_str(), META_TRUE)
            .await
    }

    // =========================================================================
    // Next Payment Date
    // =========================================================================

    /// Next payment for an early renewal, counted from the subscription's
    /// currently scheduled payment when it has one.
    pub async fn calculate_next_payment_date(
        &self,
        order_id: OrderId,
        product_id: ProductId,
        format: PaymentDateFormat,
    ) -> Result<Option<PaymentDateValue>, AppError> {
        let key = SubscriptionKey::new(order_id, product_id);
        let Some(subscription) = self.host.get_subscription(&key).await? else {
            debug!(subscription_key = %key, "No subscription, skipping calculation");
            return Ok(None);
        };

        let from = subscription.next_payment_date.map(FromDate::from);
        self.early_renew_calculate_next_payment_date(order_id, product_id, format, from)
            .await
    }

    /// Run the calculator for one subscription and pass the result through
    /// the registered next-payment filters.
    ///
    /// `Ok(None)` when the order, subscription or billing terms are missing.
    #[instrument(skip(self, from))]
    pub async fn early_renew_calculate_next_payment_date(
        &self,
        order_id: OrderId,
        product_id: ProductId,
        format: PaymentDateFormat,
        from: Option<FromDate>,
    ) -> Result<Option<PaymentDateValue>, AppError> {
        let key = SubscriptionKey::new(order_id, product_id);

        let Some(order) = self.host.get_order(order_id).await? else {
            debug!("Order not found, skipping calculation");
            return Ok(None);
        };
        let Some(subscription) = self.host.get_subscription(&key).await? else {
            debug!("Subscription not found, skipping calculation");
            return Ok(None);
        };
        let Some(terms) = self.host.billing_terms(order_id, product_id).await? else {
            debug!("Billing terms not found, skipping calculation");
            return Ok(None);
        };

        let input = ScheduleInput {
            subscription: &subscription,
            terms: &terms,
            order_date: order.order_date,
            from: from.as_ref(),
            now: self.now(),
        };

        let calculation = calculate_next_payment(&input, &self.limits).map_err(|e| {
            record_calculation_error(e.kind());
            warn!(subscription_key = %key, error = %e, "Next payment calculation failed");
            e
        })?;
        record_catch_up_iterations(calculation.catch_up_iterations);

        let context = CalculationContext {
            order_id,
            product_id,
            format,
            from_date: calculation.from_date,
            requested_from: from,
            trial_end: calculation.trial_end,
        };
        let value = self
            .hooks
            .apply_next_payment_filters(calculation.next_payment.render(format), &context);

        debug!(
            subscription_key = %key,
            from_source = ?calculation.from_source,
            from_date = %calculation.from_date,
            failed_payment_periods = calculation.failed_payment_periods,
            catch_up_iterations = calculation.catch_up_iterations,
            next_payment = ?value,
            "Next payment calculated"
        );

        Ok(Some(value))
    }

    // =========================================================================
    // Eligibility
    // =========================================================================

    /// Allow active subscriptions to be renewed, on top of the host's own rules.
    #[instrument(skip(self, subscription))]
    pub async fn can_subscription_be_renewed(
        &self,
        already_renewable: bool,
        subscription: Option<&Subscription>,
    ) -> Result<bool, AppError> {
        record_handler_invocation("can_subscription_be_renewed");

        if already_renewable {
            return Ok(true);
        }

        let Some(subscription) = subscription else {
            return Ok(false);
        };

        if subscription.completed_payments.is_empty() || !subscription.status.allows_renewal() {
            return Ok(false);
        }

        let renewal_orders = self
            .host
            .find_orders_by_meta(
                OrderMetaKey::OriginalOrder.as_str(),
                &subscription.key.order_id.to_string(),
            )
            .await?;

        Ok(renewal_orders.is_empty())
    }

    /// Replace the renew action of active subscriptions with an early renewal
    /// in the child role.
    pub fn my_account_actions(
        &self,
        mut actions: AccountActions,
        subscriptions: &HashMap<SubscriptionKey, Subscription>,
    ) -> AccountActions {
        record_handler_invocation("my_account_actions");

        for (key, subscription_actions) in actions.iter_mut() {
            let is_active = subscriptions
                .get(key)
                .is_some_and(|s| s.status == SubscriptionStatus::Active);

            if is_active && subscription_actions.contains_key(RENEW_ACTION) {
                subscription_actions.insert(
                    RENEW_ACTION.to_string(),
                    SubscriptionAction {
                        url: self.host.renewal_link(key, RenewalRole::Child),
                        name: EARLY_RENEW_LABEL.to_string(),
                    },
                );
            }
        }

        actions
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Flag a restored cart item as renewing an active subscription and
    /// precompute its first payment.
    #[instrument(skip(self, ctx, item), fields(product_id = item.product_id))]
    pub async fn cart_item_data(
        &self,
        ctx: &RequestContext,
        mut item: CartItem,
    ) -> Result<CartItem, AppError> {
        let Some(key) = ctx.renew_subscription else {
            return Ok(item);
        };
        if item.subscription_renewal.is_none() {
            return Ok(item);
        }

        let Some(subscription) = self.host.get_subscription(&key).await? else {
            return Ok(item);
        };
        if subscription.status != SubscriptionStatus::Active {
            return Ok(item);
        }

        let first_payment = match self
            .calculate_next_payment_date(key.order_id, key.product_id, PaymentDateFormat::Timestamp)
            .await?
        {
            Some(value) => value.as_timestamp()?,
            None => 0,
        };

        if let Some(renewal) = item.subscription_renewal.as_mut() {
            renewal.is_active_subscription = true;
            renewal.first_payment_timestamp = first_payment;
        }

        info!(
            subscription_key = %key,
            first_payment_timestamp = first_payment,
            "Cart item flagged as active subscription renewal"
        );

        Ok(item)
    }

    /// Append the next payment date to a cart total when the cart renews an
    /// active subscription.
    pub fn customise_price_string(&self, cart: &Cart, price: &str) -> String {
        record_handler_invocation("customise_price_string");

        let Some(renewal) = cart.active_subscription_renewal() else {
            return price.to_string();
        };
        if renewal.first_payment_timestamp == 0 {
            return price.to_string();
        }

        let date = match from_timestamp(renewal.first_payment_timestamp) {
            Ok(date) => date,
            Err(e) => {
                warn!(error = %e, "Unusable first payment timestamp in cart");
                return price.to_string();
            }
        };

        let mut annotated = String::new();
        match write!(
            annotated,
            "{} (next payment {})",
            price,
            date.format(&self.date_format)
        ) {
            Ok(()) => annotated,
            Err(_) => {
                warn!(date_format = %self.date_format, "Failed to format next payment date");
                price.to_string()
            }
        }
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Mark a freshly created renewal order when the cart renews an active subscription.
    #[instrument(skip(self, ctx))]
    pub async fn add_order_meta(
        &self,
        ctx: &RequestContext,
        renewal_order_id: OrderId,
    ) -> Result<bool, AppError> {
        if ctx.cart.active_subscription_renewal().is_none() {
            return Ok(false);
        }

        self.set_flag(renewal_order_id, OrderMetaKey::ActiveSubscriptionRenewal)
            .await?;
        info!("Renewal order marked as active subscription renewal");

        Ok(true)
    }

    /// Only pending → completed and on-hold → completed transitions count as payment.
    pub async fn on_order_status_changed(
        &self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<AdvanceOutcome, AppError> {
        let is_payment = to == OrderStatus::Completed
            && matches!(from, OrderStatus::Pending | OrderStatus::OnHold);

        if !is_payment {
            return Ok(AdvanceOutcome::NotApplicable);
        }

        self.maybe_update_next_payment_date(order_id).await
    }

    /// Push the parent subscription's next payment forward once an early
    /// renewal order is paid. Runs at most once per order.
    #[instrument(skip(self))]
    pub async fn maybe_update_next_payment_date(
        &self,
        order_id: OrderId,
    ) -> Result<AdvanceOutcome, AppError> {
        let outcome = self.advance_schedule(order_id).await?;
        record_schedule_advance(outcome.label());
        Ok(outcome)
    }

    async fn advance_schedule(&self, order_id: OrderId) -> Result<AdvanceOutcome, AppError> {
        let Some(order) = self.host.get_order(order_id).await? else {
            return Ok(AdvanceOutcome::NotApplicable);
        };
        if !order.is_renewal_with_role(RenewalRole::Child) {
            return Ok(AdvanceOutcome::NotApplicable);
        }
        let Some(parent) = self.host.get_parent_order(&order).await? else {
            return Ok(AdvanceOutcome::NotApplicable);
        };
        if !self.host.requires_manual_renewal(parent.order_id).await? {
            return Ok(AdvanceOutcome::NotApplicable);
        }

        if !self
            .has_flag(order_id, OrderMetaKey::ActiveSubscriptionRenewal)
            .await?
        {
            return Ok(AdvanceOutcome::NotActiveRenewal);
        }
        if self
            .has_flag(order_id, OrderMetaKey::NextPaymentAdvanced)
            .await?
        {
            debug!("Next payment already advanced for this order");
            return Ok(AdvanceOutcome::AlreadyAdvanced);
        }

        // Every date is calculated before anything is written, so a calculation
        // failure leaves all subscriptions untouched.
        let mut planned = Vec::new();
        for item in order.line_items() {
            let Some(product_id) = item.product_id else {
                continue;
            };
            if !self
                .host
                .is_item_subscription(parent.order_id, product_id)
                .await?
            {
                continue;
            }

            let key = SubscriptionKey::new(parent.order_id, product_id);
            let marker = OrderMetaKey::subscription_advanced(&key);
            if self.host.get_order_meta(order_id, &marker).await?.as_deref() == Some(META_TRUE) {
                debug!(subscription_key = %key, "Subscription already advanced for this order");
                continue;
            }

            let Some(value) = self
                .calculate_next_payment_date(
                    parent.order_id,
                    product_id,
                    PaymentDateFormat::Timestamp,
                )
                .await?
            else {
                continue;
            };
            planned.push((key, marker, value.to_next_payment()?));
        }

        // Each write is marked per subscription so a retry after a host
        // failure skips the ones that already moved.
        let mut advanced = Vec::with_capacity(planned.len());
        for (key, marker, next_payment) in planned {
            self.host
                .set_next_payment_date(&key, parent.customer_id, next_payment.date())
                .await?;

            if let Some(next) = next_payment.date() {
                let lock_for = (next - self.now()).max(Duration::zero());
                self.host
                    .update_retry_lock(&key, parent.customer_id, lock_for)
                    .await?;
            }

            self.host
                .set_order_meta(order_id, &marker, META_TRUE)
                .await?;

            info!(
                subscription_key = %key,
                next_payment = next_payment.timestamp(),
                "Next payment date advanced for early renewal"
            );
            self.hooks
                .notify_active_subscription_renewed(&ActiveRenewalEvent {
                    parent_order: parent.clone(),
                    subscription_key: key,
                    next_payment: next_payment.timestamp(),
                });
            advanced.push(AdvancedSubscription { key, next_payment });
        }

        self.set_flag(order_id, OrderMetaKey::NextPaymentAdvanced)
            .await?;

        Ok(AdvanceOutcome::Advanced(advanced))
    }

    /// Drop the "purchased in Order #N" suffix from new renewal line items.
    #[instrument(skip(self, item), fields(item_id = item.item_id))]
    pub async fn new_order_item(
        &self,
        order_id: OrderId,
        item: &OrderItem,
    ) -> Result<Option<String>, AppError> {
        if item.item_type != OrderItemType::LineItem {
            return Ok(None);
        }

        let Some(clean_name) = strip_order_reference(&item.name) else {
            return Ok(None);
        };

        self.host.rename_order_item(item.item_id, clean_name).await?;
        debug!(name = %clean_name, "Renewal order item renamed");

        Ok(Some(clean_name.to_string()))
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Route a host event to its handler.
    pub async fn dispatch(
        &self,
        ctx: &RequestContext,
        event: HostEvent,
    ) -> Result<EventOutcome, AppError> {
        record_handler_invocation(event.name());

        match event {
            HostEvent::CartItemRestored { item } => {
                self.cart_item_data(ctx, item).await.map(EventOutcome::CartItem)
            }
            HostEvent::RenewalOrderCreated {
                renewal_order_id,
                original_order_id,
                product_id,
                role,
            } => {
                debug!(
                    renewal_order_id = renewal_order_id,
                    original_order_id = original_order_id,
                    product_id = product_id,
                    role = role.as_str(),
                    "Renewal order created"
                );
                self.add_order_meta(ctx, renewal_order_id)
                    .await
                    .map(EventOutcome::OrderTagged)
            }
            HostEvent::OrderStatusChanged { order_id, from, to } => self
                .on_order_status_changed(order_id, from, to)
                .await
                .map(EventOutcome::Schedule),
            HostEvent::OrderItemCreated { order_id, item } => self
                .new_order_item(order_id, &item)
                .await
                .map(EventOutcome::ItemRenamed),
        }
    }
}
