//! # Storefront Cart
//!
//! Keeps a locally held, editable view of a shopping cart consistent with
//! the authoritative remote cart.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ EditBuffer: staged per-line quantities      │
//! └─────────────────────────────────────────────┘
//!                     ↓ commit
//! ┌─────────────────────────────────────────────┐
//! │ MutationSerializer: one operation in flight │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ CartSynchronizer                            │
//! │  - remote mutation → apply direct response  │
//! │  - full re-fetch → apply again              │
//! │  - publish events / stats                   │
//! └─────────────────────────────────────────────┘
//!                     ↑
//! ┌─────────────────────────────────────────────┐
//! │ AvailabilityReconciler: check + auto-fix    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Server authority**: the published cart is always a server snapshot
//! 2. **Wholesale replacement**: carts are replaced, never patched
//! 3. **One mutation at a time**: concurrent attempts fail with `Busy`
//! 4. **No silent divergence**: failed edits revert the buffer
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storefront_cart::{CartSynchronizer, EditBuffer, SyncConfig};
//!
//! let sync = CartSynchronizer::new(service, SyncConfig::default());
//! let cart = sync.load().await?;
//!
//! let mut buffer = EditBuffer::seeded(&cart);
//! buffer.stage(&product_id, "3");
//! buffer.commit(&product_id, &sync).await?;
//! ```

mod buffer;
mod config;
mod errors;
mod model;
mod mutations;
mod reconcile;
mod serializer;
mod session;
mod sync;

pub mod service;

pub use buffer::{parse_quantity, CommitOutcome, EditBuffer};
pub use config::SyncConfig;
pub use errors::{CartError, CartResult};
pub use model::{
    AvailabilityReport, Cart, CartId, CartLineItem, CartStats, MutationReceipt, ProductId,
    UnavailableItem, UserId,
};
pub use mutations::{CartMutation, MutationKind, MutationOutcome, MutationToken};
pub use reconcile::{plan, AvailabilityReconciler, FixAction, FixError, FixSummary};
pub use serializer::{MutationGuard, MutationSerializer, SyncState, SyncTransition};
pub use service::{CartService, ServiceError};
pub use session::{CartSession, Identity};
pub use sync::{CartEvent, CartSynchronizer};
