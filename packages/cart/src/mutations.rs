//! # Cart Mutations
//!
//! Intent-level operations that change the authoritative cart.
//!
//! ## Mutation Semantics
//!
//! ### Add
//! - Requires a quantity of at least 1
//! - Server merges into an existing line for the same product
//!
//! ### Update
//! - Sets the absolute quantity of a line
//! - Quantity 0 deletes the line (not a zero-quantity line)
//!
//! ### Remove
//! - Same effect as `Update` to 0, kept distinct so logs show intent
//!
//! ### Clear
//! - Removes every line; whole-cart operation

use crate::model::{Cart, ProductId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic cart mutations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CartMutation {
    Add { product_id: ProductId, quantity: u32 },
    Update { product_id: ProductId, quantity: u32 },
    Remove { product_id: ProductId },
    Clear,
}

impl CartMutation {
    pub fn kind(&self) -> MutationKind {
        match self {
            CartMutation::Add { .. } => MutationKind::Add,
            CartMutation::Update { .. } => MutationKind::Update,
            CartMutation::Remove { .. } => MutationKind::Remove,
            CartMutation::Clear => MutationKind::Clear,
        }
    }

    pub fn product_id(&self) -> Option<&ProductId> {
        match self {
            CartMutation::Add { product_id, .. }
            | CartMutation::Update { product_id, .. }
            | CartMutation::Remove { product_id } => Some(product_id),
            CartMutation::Clear => None,
        }
    }

    /// Serializer token this mutation holds while in flight
    pub fn token(&self) -> MutationToken {
        match self.product_id() {
            Some(product_id) => MutationToken::Item(product_id.clone()),
            None => MutationToken::WholeCart,
        }
    }
}

/// Coarse operation label carried by errors and events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationKind {
    Add,
    Update,
    Remove,
    Clear,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MutationKind::Add => "add",
            MutationKind::Update => "update",
            MutationKind::Remove => "remove",
            MutationKind::Clear => "clear",
        };
        f.write_str(name)
    }
}

/// Identifies the single operation in flight on a cart
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "productId", rename_all = "camelCase")]
pub enum MutationToken {
    /// A mutation targeting one line
    Item(ProductId),
    /// Clear or availability check
    WholeCart,
}

impl fmt::Display for MutationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationToken::Item(product_id) => write!(f, "item {}", product_id),
            MutationToken::WholeCart => f.write_str("whole cart"),
        }
    }
}

/// Result of a mutation call on the synchronizer
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    /// The server accepted the mutation; `cart` is what is now published
    Applied { cart: Cart, message: String },
    /// The requested state was already in effect; no network call was made
    Unchanged,
}

impl MutationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MutationOutcome::Applied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens() {
        let update = CartMutation::Update {
            product_id: ProductId::from("p1"),
            quantity: 3,
        };
        assert_eq!(update.token(), MutationToken::Item(ProductId::from("p1")));
        assert_eq!(CartMutation::Clear.token(), MutationToken::WholeCart);
    }

    #[test]
    fn test_kind_labels() {
        let remove = CartMutation::Remove {
            product_id: ProductId::from("p1"),
        };
        assert_eq!(remove.kind(), MutationKind::Remove);
        assert_eq!(remove.kind().to_string(), "remove");
    }

    #[test]
    fn test_mutation_wire_shape() {
        let add = CartMutation::Add {
            product_id: ProductId::from("p9"),
            quantity: 2,
        };
        let json = serde_json::to_value(&add).unwrap();
        assert_eq!(json["type"], "add");
        assert_eq!(json["product_id"], "p9");
        assert_eq!(json["quantity"], 2);
    }
}
