//! Error types for the cart core

use crate::mutations::{MutationKind, MutationToken};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CartError {
    /// Authoritative load failed; the previous cart is retained
    #[error("Failed to load cart: {reason}")]
    Fetch { reason: String },

    /// Server rejected or failed a mutation; the cart is unchanged
    #[error("Cart {kind} failed: {reason}")]
    Mutation { kind: MutationKind, reason: String },

    /// Another operation holds the serializer
    #[error("Cart is busy with {held}")]
    Busy { held: MutationToken },

    /// Availability is unknown, not "available"
    #[error("Availability check failed: {reason}")]
    Check { reason: String },

    #[error("Invalid quantity {0}: must be at least 1")]
    InvalidQuantity(u32),
}

impl CartError {
    /// Local contention only; retry later rather than treat as terminal
    pub fn is_retryable(&self) -> bool {
        matches!(self, CartError::Busy { .. })
    }

    /// Reason to surface to the presentation layer
    pub fn reason(&self) -> String {
        match self {
            CartError::Fetch { reason }
            | CartError::Mutation { reason, .. }
            | CartError::Check { reason } => reason.clone(),
            other => other.to_string(),
        }
    }
}

pub type CartResult<T> = Result<T, CartError>;
