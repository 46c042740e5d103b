//! # Cart Session Management
//!
//! Ties a [`CartSynchronizer`] to the identity lifecycle.
//!
//! A synchronizer is constructed on sign-in, loaded immediately and handed
//! out explicitly to whoever needs it; sign-out resets and drops it. There is
//! no ambient global cart.

use crate::config::SyncConfig;
use crate::errors::CartResult;
use crate::model::UserId;
use crate::service::CartService;
use crate::sync::CartSynchronizer;
use std::fmt;
use std::sync::Arc;

/// Signed-in user as supplied by the auth subsystem
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    /// Opaque credential forwarded to the service factory
    pub token: Option<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("user_id", &self.user_id)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

struct ActiveCart {
    identity: Identity,
    sync: Arc<CartSynchronizer>,
}

/// Owns the per-identity synchronizer
pub struct CartSession<F> {
    factory: F,
    config: SyncConfig,
    active: Option<ActiveCart>,
}

impl<F> CartSession<F>
where
    F: Fn(&Identity) -> Arc<dyn CartService>,
{
    pub fn new(factory: F, config: SyncConfig) -> Self {
        Self {
            factory,
            config,
            active: None,
        }
    }

    /// React to the auth subsystem's identity signal.
    ///
    /// `Some` with a new identity builds and loads a fresh synchronizer;
    /// `None` discards all cart state. The same identity again is a no-op.
    /// A failed initial load is returned, but the session stays active with
    /// no cart so the caller can retry `load()`.
    pub async fn on_identity_changed(
        &mut self,
        identity: Option<Identity>,
    ) -> CartResult<Option<Arc<CartSynchronizer>>> {
        let Some(identity) = identity else {
            self.sign_out();
            return Ok(None);
        };

        if let Some(active) = &self.active {
            if active.identity == identity {
                return Ok(Some(active.sync.clone()));
            }
        }

        self.sign_out();
        tracing::debug!(user_id = %identity.user_id, "cart session started");

        let service = (self.factory)(&identity);
        let sync = Arc::new(CartSynchronizer::new(service, self.config.clone()));
        self.active = Some(ActiveCart {
            identity,
            sync: sync.clone(),
        });

        sync.load().await?;
        Ok(Some(sync))
    }

    /// Synchronizer for the signed-in identity
    pub fn active(&self) -> Option<Arc<CartSynchronizer>> {
        self.active.as_ref().map(|active| active.sync.clone())
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.active.as_ref().map(|active| &active.identity)
    }

    pub fn is_authenticated(&self) -> bool {
        self.active.is_some()
    }

    fn sign_out(&mut self) {
        if let Some(active) = self.active.take() {
            active.sync.reset();
            tracing::debug!(user_id = %active.identity.user_id, "cart session ended");
        }
    }
}
