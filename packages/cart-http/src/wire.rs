//! Storefront API payloads.
//!
//! Cart items arrive with the product populated (`productId` is an object,
//! not an id), and every cart response also carries server-computed `stats`
//! which the core ignores in favor of its own projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_cart::{
    AvailabilityReport, Cart, CartId, CartLineItem, MutationReceipt, ProductId, UnavailableItem,
    UserId,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireProduct {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub stock: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCartItem {
    pub product_id: WireProduct,
    pub quantity: u32,
    /// Unit price captured when the item was added
    pub price: f64,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCart {
    #[serde(alias = "_id")]
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub items: Vec<WireCartItem>,
    pub total_items: u32,
    pub total_amount: f64,
    pub updated_at: DateTime<Utc>,
}

/// `{ cart, stats }` or `{ message, cart, stats }`
#[derive(Debug, Clone, Deserialize)]
pub struct CartEnvelope {
    pub cart: WireCart,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireUnavailableItem {
    pub product_id: String,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub requested_quantity: Option<i64>,
    #[serde(default)]
    pub available_stock: Option<i64>,
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAvailability {
    pub available: bool,
    #[serde(default)]
    pub unavailable_items: Vec<WireUnavailableItem>,
    #[serde(default)]
    pub total_items: u32,
}

/// `{ error, details? }`
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Body of `POST cart/add` and `PUT cart/update`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityBody<'a> {
    pub product_id: &'a str,
    pub quantity: u32,
}

fn non_negative(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

impl From<WireCartItem> for CartLineItem {
    fn from(item: WireCartItem) -> Self {
        CartLineItem {
            product_id: ProductId::new(item.product_id.id),
            product_name: item.product_id.name,
            unit_price: item.price,
            quantity: item.quantity,
            stock_at_product: non_negative(item.product_id.stock),
            added_at: item.added_at,
        }
    }
}

impl From<WireCart> for Cart {
    fn from(cart: WireCart) -> Self {
        Cart {
            id: CartId::new(cart.id),
            owner_id: UserId::new(cart.user_id),
            items: cart.items.into_iter().map(CartLineItem::from).collect(),
            total_items: cart.total_items,
            total_amount: cart.total_amount,
            updated_at: cart.updated_at,
        }
    }
}

impl From<CartEnvelope> for MutationReceipt {
    fn from(envelope: CartEnvelope) -> Self {
        MutationReceipt {
            cart: envelope.cart.into(),
            message: envelope.message.unwrap_or_default(),
        }
    }
}

impl From<WireAvailability> for AvailabilityReport {
    fn from(report: WireAvailability) -> Self {
        AvailabilityReport {
            available: report.available,
            unavailable_items: report
                .unavailable_items
                .into_iter()
                .map(|item| UnavailableItem {
                    product_name: item
                        .product_name
                        .unwrap_or_else(|| item.product_id.clone()),
                    product_id: ProductId::new(item.product_id),
                    requested_quantity: non_negative(item.requested_quantity.unwrap_or(0)),
                    available_stock: non_negative(item.available_stock.unwrap_or(0)),
                    reason: item.reason,
                })
                .collect(),
            total_items: report.total_items,
        }
    }
}
