//! # Mutation Serializer
//!
//! At most one operation may be in flight per cart. The holder is tracked
//! as an explicit state machine:
//!
//! ```text
//!            Begin(t)                 Resolve
//!   Idle ───────────────▶ Mutating(t) ───────▶ Idle
//!                             │
//!                             │ Begin(_)
//!                             ▼
//!                        Err(Busy)
//! ```
//!
//! Granularity is the whole cart: the re-fetch that follows every mutation
//! overwrites the entire cart, so a second concurrent mutation could have its
//! result clobbered. Per-row disabling in a UI is only an approximation of
//! this rule.

use crate::errors::CartError;
use crate::mutations::MutationToken;
use tokio::sync::watch;

/// Serializer state, published as the "mutation in flight" signal
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    Mutating(MutationToken),
}

impl SyncState {
    pub fn is_idle(&self) -> bool {
        matches!(self, SyncState::Idle)
    }

    pub fn token(&self) -> Option<&MutationToken> {
        match self {
            SyncState::Idle => None,
            SyncState::Mutating(token) => Some(token),
        }
    }

    /// Transition table
    pub fn transition(&self, event: SyncTransition) -> Result<SyncState, CartError> {
        match (self, event) {
            (SyncState::Idle, SyncTransition::Begin(token)) => Ok(SyncState::Mutating(token)),
            (SyncState::Mutating(held), SyncTransition::Begin(_)) => {
                Err(CartError::Busy { held: held.clone() })
            }
            (_, SyncTransition::Resolve) => Ok(SyncState::Idle),
        }
    }
}

/// Events driving [`SyncState`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncTransition {
    Begin(MutationToken),
    Resolve,
}

/// Single-holder gate for cart operations
#[derive(Debug)]
pub struct MutationSerializer {
    state: watch::Sender<SyncState>,
}

impl MutationSerializer {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SyncState::Idle);
        Self { state }
    }

    /// Take the gate for `token`, or fail with `Busy` if anything holds it.
    ///
    /// The gate is released when the returned guard is dropped.
    pub fn acquire(&self, token: MutationToken) -> Result<MutationGuard<'_>, CartError> {
        let mut outcome = Ok(());
        self.state.send_if_modified(|state| {
            match state.transition(SyncTransition::Begin(token.clone())) {
                Ok(next) => {
                    *state = next;
                    true
                }
                Err(err) => {
                    outcome = Err(err);
                    false
                }
            }
        });
        outcome?;

        tracing::trace!(%token, "serializer acquired");
        Ok(MutationGuard {
            serializer: self,
            token,
        })
    }

    fn release(&self) {
        self.state.send_if_modified(|state| {
            if state.is_idle() {
                return false;
            }
            // Resolve is valid from every state.
            *state = state
                .transition(SyncTransition::Resolve)
                .unwrap_or_default();
            true
        });
    }

    pub fn current(&self) -> SyncState {
        self.state.borrow().clone()
    }

    pub fn is_busy(&self) -> bool {
        !self.state.borrow().is_idle()
    }

    /// Subscribe to in-flight changes
    pub fn watch(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }
}

impl Default for MutationSerializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped hold on the serializer
#[derive(Debug)]
pub struct MutationGuard<'a> {
    serializer: &'a MutationSerializer,
    token: MutationToken,
}

impl MutationGuard<'_> {
    pub fn token(&self) -> &MutationToken {
        &self.token
    }
}

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        tracing::trace!(token = %self.token, "serializer released");
        self.serializer.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProductId;

    fn item(id: &str) -> MutationToken {
        MutationToken::Item(ProductId::from(id))
    }

    #[test]
    fn test_transition_table() {
        let idle = SyncState::Idle;
        let busy = idle.transition(SyncTransition::Begin(item("p1"))).unwrap();
        assert_eq!(busy, SyncState::Mutating(item("p1")));

        let err = busy
            .transition(SyncTransition::Begin(MutationToken::WholeCart))
            .unwrap_err();
        assert_eq!(err, CartError::Busy { held: item("p1") });

        assert_eq!(busy.transition(SyncTransition::Resolve).unwrap(), SyncState::Idle);
        assert_eq!(idle.transition(SyncTransition::Resolve).unwrap(), SyncState::Idle);
    }

    #[test]
    fn test_second_acquire_is_busy() {
        let serializer = MutationSerializer::new();
        let guard = serializer.acquire(item("p1")).unwrap();

        let err = serializer.acquire(item("p2")).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(guard.token(), &item("p1"));
        assert!(serializer.is_busy());
    }

    #[test]
    fn test_guard_drop_releases() {
        let serializer = MutationSerializer::new();
        {
            let _guard = serializer.acquire(MutationToken::WholeCart).unwrap();
            assert_eq!(serializer.current(), SyncState::Mutating(MutationToken::WholeCart));
        }
        assert!(!serializer.is_busy());
        assert!(serializer.acquire(item("p1")).is_ok());
    }

    #[test]
    fn test_release_on_panic() {
        let serializer = MutationSerializer::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = serializer.acquire(item("p1")).unwrap();
            panic!("mutation crashed");
        }));

        assert!(result.is_err());
        assert!(!serializer.is_busy());
    }

    #[test]
    fn test_watchers_see_transitions() {
        let serializer = MutationSerializer::new();
        let rx = serializer.watch();

        let guard = serializer.acquire(item("p1")).unwrap();
        assert_eq!(rx.borrow().token(), Some(&item("p1")));

        drop(guard);
        assert!(rx.borrow().is_idle());
    }
}
