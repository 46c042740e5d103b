//! # Remote Cart Service
//!
//! Boundary to the authoritative cart resource. The core treats the service
//! as a black box: it never inspects failure reasons beyond surfacing them.

mod memory;

pub use memory::{CatalogProduct, MemoryCartService, ServiceOp};

use crate::model::{AvailabilityReport, Cart, MutationReceipt, ProductId};
use async_trait::async_trait;
use thiserror::Error;

/// Failures reported by a [`CartService`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// Server answered with an `error` payload
    #[error("{reason}")]
    Rejected { status: u16, reason: String },

    #[error("Not authenticated")]
    Unauthorized,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl ServiceError {
    pub fn rejected(status: u16, reason: impl Into<String>) -> Self {
        ServiceError::Rejected {
            status,
            reason: reason.into(),
        }
    }

    /// Human-readable reason, unchanged from the server when it sent one
    pub fn reason(&self) -> String {
        match self {
            ServiceError::Rejected { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }
}

/// The remote cart endpoints
#[async_trait]
pub trait CartService: Send + Sync {
    /// `GET cart`
    async fn fetch(&self) -> Result<Cart, ServiceError>;

    /// `POST cart/add`
    async fn add(&self, product_id: &ProductId, quantity: u32)
        -> Result<MutationReceipt, ServiceError>;

    /// `PUT cart/update`; quantity 0 removes the line
    async fn update(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<MutationReceipt, ServiceError>;

    /// `DELETE cart/remove/{productId}`
    async fn remove(&self, product_id: &ProductId) -> Result<MutationReceipt, ServiceError>;

    /// `DELETE cart/clear`
    async fn clear(&self) -> Result<MutationReceipt, ServiceError>;

    /// `GET cart/check-availability`
    async fn check_availability(&self) -> Result<AvailabilityReport, ServiceError>;
}
