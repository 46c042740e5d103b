//! # Cart Synchronizer
//!
//! Single source of truth for the authoritative cart and the gateway for
//! every mutation.
//!
//! ## Optimistic-then-reconcile
//!
//! Each accepted mutation publishes twice:
//!
//! 1. the mutation endpoint's direct response (fast path), then
//! 2. a full re-fetch of the cart, which picks up server-side effects the
//!    direct response may not carry (price changes, stock moves from other
//!    sessions).
//!
//! Step 1 is always observed before step 2, and both reach subscribers as
//! separate [`CartEvent`]s. If the re-fetch fails the step 1 cart stays in
//! effect.
//!
//! ## Failure
//!
//! A rejected mutation leaves the published cart untouched. Nothing is
//! retried automatically.

use crate::config::SyncConfig;
use crate::errors::{CartError, CartResult};
use crate::model::{AvailabilityReport, Cart, CartStats, MutationReceipt, ProductId};
use crate::mutations::{CartMutation, MutationKind, MutationOutcome, MutationToken};
use crate::serializer::{MutationSerializer, SyncState};
use crate::service::{CartService, ServiceError};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, watch};

/// Ordered notifications for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum CartEvent {
    /// `load()` published a fresh cart
    Loaded(Arc<Cart>),

    /// Direct response of a mutation was applied
    MutationApplied {
        kind: MutationKind,
        product_id: Option<ProductId>,
        message: String,
        cart: Arc<Cart>,
    },

    /// The post-mutation re-fetch replaced the cart
    Refreshed { kind: MutationKind, cart: Arc<Cart> },

    MutationFailed { kind: MutationKind, reason: String },

    /// All cart state was discarded (sign-out)
    Reset,
}

/// Holds the authoritative cart for one signed-in identity
pub struct CartSynchronizer {
    service: Arc<dyn CartService>,
    config: SyncConfig,
    serializer: MutationSerializer,
    cart: watch::Sender<Option<Arc<Cart>>>,
    events: broadcast::Sender<CartEvent>,
    last_error: Mutex<Option<String>>,
    /// Bumped by `reset()` so late results from a previous identity are dropped
    epoch: AtomicU64,
    /// Bumped on every mutation publish; a `load()` that started before the
    /// latest mutation result must not replace it
    revision: AtomicU64,
}

/// Where a cart about to be published came from
#[derive(Debug, Clone, Copy)]
enum Origin {
    /// A plain `load()`, started when the publish revision was `revision`
    Load { revision: u64 },
    /// A mutation response or its follow-up re-fetch
    Mutation,
}

impl CartSynchronizer {
    pub fn new(service: Arc<dyn CartService>, config: SyncConfig) -> Self {
        let (cart, _) = watch::channel(None);
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        Self {
            service,
            config,
            serializer: MutationSerializer::new(),
            cart,
            events,
            last_error: Mutex::new(None),
            epoch: AtomicU64::new(0),
            revision: AtomicU64::new(0),
        }
    }

    /// Fetch the authoritative cart.
    ///
    /// On failure the previously published cart (or `None` before the first
    /// successful load) stays in place. A fetch overtaken by a mutation
    /// result is discarded and the newer cart is returned instead.
    pub async fn load(&self) -> CartResult<Arc<Cart>> {
        let epoch = self.epoch();
        let origin = Origin::Load {
            revision: self.revision.load(Ordering::SeqCst),
        };
        match self.call(self.service.fetch()).await {
            Ok(cart) => {
                let cart = Arc::new(cart);
                if self.publish(epoch, origin, cart.clone()) {
                    self.emit(CartEvent::Loaded(cart.clone()));
                    self.set_error(None);
                    return Ok(cart);
                }
                tracing::debug!("stale cart load discarded");
                Ok(self.cart().unwrap_or(cart))
            }
            Err(reason) => {
                tracing::debug!(%reason, "cart load failed");
                self.set_error(Some(reason.clone()));
                Err(CartError::Fetch { reason })
            }
        }
    }

    /// Add `quantity` units of `product_id`
    pub async fn add(&self, product_id: &ProductId, quantity: u32) -> CartResult<MutationOutcome> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity(quantity));
        }
        self.mutate(CartMutation::Add {
            product_id: product_id.clone(),
            quantity,
        })
        .await
    }

    /// Set the quantity of a line; 0 deletes it.
    ///
    /// Asking for the quantity already in effect succeeds without a network
    /// call.
    pub async fn update_quantity(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> CartResult<MutationOutcome> {
        self.mutate(CartMutation::Update {
            product_id: product_id.clone(),
            quantity,
        })
        .await
    }

    pub async fn remove(&self, product_id: &ProductId) -> CartResult<MutationOutcome> {
        self.mutate(CartMutation::Remove {
            product_id: product_id.clone(),
        })
        .await
    }

    /// Remove every line. Confirmation is the caller's job.
    pub async fn clear(&self) -> CartResult<MutationOutcome> {
        self.mutate(CartMutation::Clear).await
    }

    /// Read-only stock check against the remote service.
    ///
    /// Holds the whole-cart token so it cannot interleave with a mutation.
    pub async fn check_availability(&self) -> CartResult<AvailabilityReport> {
        let _guard = self.serializer.acquire(MutationToken::WholeCart)?;

        match self.call(self.service.check_availability()).await {
            Ok(report) => Ok(report),
            Err(reason) => {
                self.set_error(Some(reason.clone()));
                Err(CartError::Check { reason })
            }
        }
    }

    /// Current authoritative cart
    pub fn cart(&self) -> Option<Arc<Cart>> {
        self.cart.borrow().clone()
    }

    /// Summary projection of the current cart
    pub fn stats(&self) -> Option<CartStats> {
        self.cart.borrow().as_deref().map(CartStats::project)
    }

    pub fn in_flight(&self) -> SyncState {
        self.serializer.current()
    }

    /// Most recent error reason surfaced by an operation
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn clear_error(&self) {
        self.set_error(None);
    }

    /// Discard all cart state
    pub fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.cart.send_replace(None);
        self.set_error(None);
        self.emit(CartEvent::Reset);
        tracing::debug!("cart state reset");
    }

    /// Ordered cart events (never coalesced)
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.events.subscribe()
    }

    /// Latest-value view of the cart
    pub fn watch_cart(&self) -> watch::Receiver<Option<Arc<Cart>>> {
        self.cart.subscribe()
    }

    /// Latest-value view of the in-flight operation
    pub fn watch_in_flight(&self) -> watch::Receiver<SyncState> {
        self.serializer.watch()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    async fn mutate(&self, mutation: CartMutation) -> CartResult<MutationOutcome> {
        let _guard = self.serializer.acquire(mutation.token())?;
        let kind = mutation.kind();
        let epoch = self.epoch();

        if let CartMutation::Update {
            product_id,
            quantity,
        } = &mutation
        {
            if let Some(cart) = self.cart() {
                if cart.quantity_of(product_id) == *quantity {
                    tracing::debug!(%product_id, quantity, "quantity already in effect");
                    return Ok(MutationOutcome::Unchanged);
                }
            }
        }

        tracing::debug!(%kind, product_id = ?mutation.product_id(), "cart mutation started");

        let MutationReceipt { cart, message } = match self.send(&mutation).await {
            Ok(receipt) => receipt,
            Err(reason) => {
                tracing::debug!(%kind, %reason, "cart mutation rejected");
                self.set_error(Some(reason.clone()));
                self.emit(CartEvent::MutationFailed {
                    kind,
                    reason: reason.clone(),
                });
                return Err(CartError::Mutation { kind, reason });
            }
        };

        let applied = Arc::new(cart);
        if !self.publish(epoch, Origin::Mutation, applied.clone()) {
            // Identity changed mid-flight; the result belongs to nobody.
            return Ok(MutationOutcome::Applied {
                cart: (*applied).clone(),
                message,
            });
        }
        tracing::info!(%kind, %message, "cart mutation applied");
        self.emit(CartEvent::MutationApplied {
            kind,
            product_id: mutation.product_id().cloned(),
            message: message.clone(),
            cart: applied.clone(),
        });

        let settled = if self.config.refetch_after_mutation {
            self.refresh_after(kind, epoch).await.unwrap_or(applied)
        } else {
            applied
        };

        self.set_error(None);
        Ok(MutationOutcome::Applied {
            cart: (*settled).clone(),
            message,
        })
    }

    async fn send(&self, mutation: &CartMutation) -> Result<MutationReceipt, String> {
        match mutation {
            CartMutation::Add {
                product_id,
                quantity,
            } => self.call(self.service.add(product_id, *quantity)).await,
            CartMutation::Update {
                product_id,
                quantity,
            } => self.call(self.service.update(product_id, *quantity)).await,
            CartMutation::Remove { product_id } => self.call(self.service.remove(product_id)).await,
            CartMutation::Clear => self.call(self.service.clear()).await,
        }
    }

    async fn refresh_after(&self, kind: MutationKind, epoch: u64) -> Option<Arc<Cart>> {
        match self.call(self.service.fetch()).await {
            Ok(fresh) => {
                let fresh = Arc::new(fresh);
                if self.publish(epoch, Origin::Mutation, fresh.clone()) {
                    self.emit(CartEvent::Refreshed {
                        kind,
                        cart: fresh.clone(),
                    });
                }
                Some(fresh)
            }
            Err(reason) => {
                tracing::warn!(%kind, %reason, "re-fetch after mutation failed; keeping direct response");
                None
            }
        }
    }

    async fn call<T, F>(&self, request: F) -> Result<T, String>
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        match self.config.request_timeout() {
            Some(limit) => match tokio::time::timeout(limit, request).await {
                Ok(result) => result.map_err(|err| err.reason()),
                Err(_) => Err(format!("request timed out after {} ms", limit.as_millis())),
            },
            None => request.await.map_err(|err| err.reason()),
        }
    }

    fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Replace the published cart unless a reset happened since `epoch` or,
    /// for a load, a mutation result was published after it started.
    ///
    /// The checks run inside the watch sender's lock so they cannot race
    /// another publish.
    fn publish(&self, epoch: u64, origin: Origin, cart: Arc<Cart>) -> bool {
        let mut accepted = false;
        self.cart.send_if_modified(|current| {
            if self.epoch() != epoch {
                return false;
            }
            match origin {
                Origin::Load { revision } => {
                    if self.revision.load(Ordering::SeqCst) != revision {
                        return false;
                    }
                }
                Origin::Mutation => {
                    self.revision.fetch_add(1, Ordering::SeqCst);
                }
            }
            *current = Some(cart.clone());
            accepted = true;
            true
        });
        if !accepted {
            return false;
        }

        if !cart.totals_consistent() {
            tracing::warn!(
                cart_id = %cart.id,
                total_items = cart.total_items,
                total_amount = cart.total_amount,
                "server totals disagree with line items"
            );
        }
        true
    }

    fn emit(&self, event: CartEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn set_error(&self, error: Option<String>) {
        *self
            .last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = error;
    }
}

impl std::fmt::Debug for CartSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartSynchronizer")
            .field("config", &self.config)
            .field("in_flight", &self.serializer.current())
            .field("cart", &self.cart.borrow().as_ref().map(|cart| cart.id.clone()))
            .finish()
    }
}
