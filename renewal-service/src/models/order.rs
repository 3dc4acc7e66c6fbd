//! Order model.

use super::subscription::SubscriptionKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::str::FromStr;

pub type OrderId = u64;
pub type ProductId = u64;
pub type CustomerId = u64;
pub type ItemId = u64;

/// Value the host metadata store holds for a set flag.
pub const META_TRUE: &str = "true";

/// Role of a renewal order relative to the order that carries the subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenewalRole {
    Parent,
    Child,
}

impl RenewalRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenewalRole::Parent => "parent",
            RenewalRole::Child => "child",
        }
    }
}

/// Order status as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Pending,
    OnHold,
    Processing,
    Completed,
    Cancelled,
    Refunded,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::OnHold => "on-hold",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Failed => "failed",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "on-hold" => Ok(OrderStatus::OnHold),
            "processing" => Ok(OrderStatus::Processing),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "refunded" => Ok(OrderStatus::Refunded),
            "failed" => Ok(OrderStatus::Failed),
            other => Err(AppError::BadRequest(anyhow::anyhow!(
                "Unknown order status: {}",
                other
            ))),
        }
    }
}

/// Order item type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderItemType {
    LineItem,
    Fee,
    Shipping,
    Tax,
    Coupon,
}

impl OrderItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderItemType::LineItem => "line_item",
            OrderItemType::Fee => "fee",
            OrderItemType::Shipping => "shipping",
            OrderItemType::Tax => "tax",
            OrderItemType::Coupon => "coupon",
        }
    }
}

impl FromStr for OrderItemType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "line_item" => Ok(OrderItemType::LineItem),
            "fee" => Ok(OrderItemType::Fee),
            "shipping" => Ok(OrderItemType::Shipping),
            "tax" => Ok(OrderItemType::Tax),
            "coupon" => Ok(OrderItemType::Coupon),
            other => Err(AppError::BadRequest(anyhow::anyhow!(
                "Unknown order item type: {}",
                other
            ))),
        }
    }
}

/// Order item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub item_id: ItemId,
    pub item_type: OrderItemType,
    pub name: String,
    pub product_id: Option<ProductId>,
}

impl OrderItem {
    pub fn line_item(item_id: ItemId, product_id: ProductId, name: impl Into<String>) -> Self {
        Self {
            item_id,
            item_type: OrderItemType::LineItem,
            name: name.into(),
            product_id: Some(product_id),
        }
    }
}

/// Order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub order_date: DateTime<Utc>,
    pub parent_order_id: Option<OrderId>,
    pub renewal_role: Option<RenewalRole>,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// True when this order renews a subscription in the given role.
    pub fn is_renewal_with_role(&self, role: RenewalRole) -> bool {
        self.renewal_role == Some(role)
    }

    pub fn line_items(&self) -> impl Iterator<Item = &OrderItem> {
        self.items
            .iter()
            .filter(|item| item.item_type == OrderItemType::LineItem)
    }
}

/// Metadata keys this extension reads or writes on orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderMetaKey {
    /// The order renews a subscription that was still active.
    ActiveSubscriptionRenewal,
    /// The next payment date was already pushed forward for this order.
    NextPaymentAdvanced,
    /// Set by the host on renewal orders; points at the original order.
    OriginalOrder,
}

impl OrderMetaKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderMetaKey::ActiveSubscriptionRenewal => "_is_renew_activate_subscription",
            OrderMetaKey::NextPaymentAdvanced => "_updated_next_payment_date_original_order",
            OrderMetaKey::OriginalOrder => "_original_order",
        }
    }

    /// Marker set on a renewal order once one of its subscriptions was advanced.
    pub fn subscription_advanced(key: &SubscriptionKey) -> String {
        format!("{}_{}", OrderMetaKey::NextPaymentAdvanced.as_str(), key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_order_status_parses_host_strings() {
        assert_eq!("on-hold".parse::<OrderStatus>().unwrap(), OrderStatus::OnHold);
        assert_eq!(
            "completed".parse::<OrderStatus>().unwrap(),
            OrderStatus::Completed
        );
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_subscription_marker_is_keyed_per_subscription() {
        assert_eq!(
            OrderMetaKey::subscription_advanced(&SubscriptionKey::new(100, 7)),
            "_updated_next_payment_date_original_order_100_7"
        );
    }

    #[test]
    fn test_line_items_skip_other_item_types() {
        let order = Order {
            order_id: 10,
            customer_id: 1,
            order_date: Utc.with_ymd_and_hms(2013, 1, 1, 0, 0, 0).unwrap(),
            parent_order_id: None,
            renewal_role: None,
            items: vec![
                OrderItem::line_item(1, 99, "Monthly box"),
                OrderItem {
                    item_id: 2,
                    item_type: OrderItemType::Shipping,
                    name: "Flat rate".to_string(),
                    product_id: None,
                },
            ],
        };

        let names: Vec<_> = order.line_items().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Monthly box"]);
        assert!(!order.is_renewal_with_role(RenewalRole::Child));
    }
}
