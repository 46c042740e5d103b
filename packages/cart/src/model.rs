//! # Cart Value Model
//!
//! Immutable snapshots of the authoritative cart as confirmed by the remote
//! service.
//!
//! A [`Cart`] is never patched in place: every successful mutation response
//! and every re-fetch replaces it wholesale, so a rendered line item is never
//! older than the last confirmed server state.
//!
//! ## Totals
//!
//! `total_items` and `total_amount` are computed by the server and treated as
//! ground truth. [`CartStats`] is a separate client-side projection for the
//! summary view and is recomputed on every read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tolerance used when comparing monetary totals
const AMOUNT_EPSILON: f64 = 1e-6;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Catalog product identifier
    ProductId
);
string_id!(
    /// Server-assigned cart identifier
    CartId
);
string_id!(
    /// Identifier of the cart owner
    UserId
);

/// One line of the authoritative cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: f64,
    pub quantity: u32,
    /// Stock the server reported for the product when this snapshot was taken
    pub stock_at_product: u32,
    pub added_at: DateTime<Utc>,
}

impl CartLineItem {
    pub fn line_total(&self) -> f64 {
        f64::from(self.quantity) * self.unit_price
    }
}

/// Authoritative cart snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: CartId,
    pub owner_id: UserId,
    pub items: Vec<CartLineItem>,
    pub total_items: u32,
    pub total_amount: f64,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Empty cart for `owner_id`
    pub fn empty(id: CartId, owner_id: UserId) -> Self {
        Self {
            id,
            owner_id,
            items: Vec::new(),
            total_items: 0,
            total_amount: 0.0,
            updated_at: Utc::now(),
        }
    }

    pub fn line(&self, product_id: &ProductId) -> Option<&CartLineItem> {
        self.items.iter().find(|item| &item.product_id == product_id)
    }

    /// Quantity currently confirmed for `product_id` (0 when absent)
    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.line(product_id).map(|item| item.quantity).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Check the server totals against the line items.
    pub fn totals_consistent(&self) -> bool {
        let items: u64 = self.items.iter().map(|item| u64::from(item.quantity)).sum();
        let amount: f64 = self.items.iter().map(CartLineItem::line_total).sum();

        items == u64::from(self.total_items) && (amount - self.total_amount).abs() < AMOUNT_EPSILON
    }
}

/// Summary projection over a cart, recomputed on every read
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartStats {
    pub total_items: u32,
    pub total_amount: f64,
    pub unique_products: usize,
    pub average_item_price: f64,
}

impl CartStats {
    pub fn project(cart: &Cart) -> Self {
        let total_items: u32 = cart.items.iter().map(|item| item.quantity).sum();
        let total_amount: f64 = cart.items.iter().map(CartLineItem::line_total).sum();
        let average_item_price = if total_items == 0 {
            0.0
        } else {
            total_amount / f64::from(total_items)
        };

        Self {
            total_items,
            total_amount,
            unique_products: cart.items.len(),
            average_item_price,
        }
    }
}

/// Direct response of a mutation endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationReceipt {
    pub cart: Cart,
    /// Human-readable confirmation from the server
    pub message: String,
}

/// One line the server reports as not satisfiable from current stock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnavailableItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub requested_quantity: u32,
    pub available_stock: u32,
    pub reason: String,
}

/// Result of a stock check. Produced fresh on every check and never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityReport {
    pub available: bool,
    pub unavailable_items: Vec<UnavailableItem>,
    pub total_items: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, quantity: u32, unit_price: f64) -> CartLineItem {
        CartLineItem {
            product_id: ProductId::from(id),
            product_name: format!("Product {}", id),
            unit_price,
            quantity,
            stock_at_product: 10,
            added_at: Utc::now(),
        }
    }

    fn cart_with(items: Vec<CartLineItem>, total_items: u32, total_amount: f64) -> Cart {
        Cart {
            items,
            total_items,
            total_amount,
            ..Cart::empty(CartId::from("c1"), UserId::from("u1"))
        }
    }

    #[test]
    fn test_stats_projection() {
        let cart = cart_with(vec![line("p1", 1, 10.0), line("p2", 2, 5.0)], 3, 20.0);
        let stats = CartStats::project(&cart);

        assert_eq!(stats.total_items, 3);
        assert!((stats.total_amount - 20.0).abs() < 1e-9);
        assert_eq!(stats.unique_products, 2);
        assert!((stats.average_item_price - 20.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_stats_of_empty_cart() {
        let cart = Cart::empty(CartId::from("c1"), UserId::from("u1"));
        let stats = CartStats::project(&cart);

        assert_eq!(stats.total_items, 0);
        assert_eq!(stats.unique_products, 0);
        assert_eq!(stats.average_item_price, 0.0);
    }

    #[test]
    fn test_totals_consistency() {
        let good = cart_with(vec![line("p1", 2, 2.5)], 2, 5.0);
        assert!(good.totals_consistent());

        let bad = cart_with(vec![line("p1", 2, 2.5)], 3, 5.0);
        assert!(!bad.totals_consistent());
    }

    #[test]
    fn test_quantity_of_missing_line_is_zero() {
        let cart = cart_with(vec![line("p1", 4, 1.0)], 4, 4.0);
        assert_eq!(cart.quantity_of(&ProductId::from("p1")), 4);
        assert_eq!(cart.quantity_of(&ProductId::from("nope")), 0);
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&ProductId::from("sku-9")).unwrap();
        assert_eq!(json, "\"sku-9\"");
    }
}
