//! Availability check and auto-fix against the in-memory store

use std::sync::Arc;
use storefront_cart::service::{CatalogProduct, MemoryCartService, ServiceOp};
use storefront_cart::{
    AvailabilityReconciler, CartError, CartSynchronizer, FixAction, MutationKind, ProductId,
    ServiceError, SyncConfig,
};

fn pid(id: &str) -> ProductId {
    ProductId::from(id)
}

/// Cart with p1 x5 and p2 x3, then stock drops to 2 and 0
fn stale_cart() -> (Arc<MemoryCartService>, CartSynchronizer) {
    let service = Arc::new(MemoryCartService::new("user-1").with_products([
        CatalogProduct::new("p1", "Complete Deck", 60.0, 10),
        CatalogProduct::new("p2", "Grip Tape", 8.0, 10),
        CatalogProduct::new("p3", "Hardware", 3.0, 10),
    ]));
    service.seed_line("p1", 5);
    service.seed_line("p2", 3);
    service.seed_line("p3", 1);
    service.set_stock(&pid("p1"), 2);
    service.set_stock(&pid("p2"), 0);

    let sync = CartSynchronizer::new(service.clone(), SyncConfig::default());
    (service, sync)
}

#[tokio::test]
async fn test_check_reports_shortfall() {
    let (_service, sync) = stale_cart();
    sync.load().await.unwrap();
    let before = sync.cart().unwrap();

    let report = AvailabilityReconciler::new(&sync).check().await.unwrap();

    assert!(!report.available);
    assert_eq!(report.total_items, 9);
    let p1 = report
        .unavailable_items
        .iter()
        .find(|item| item.product_id == pid("p1"))
        .unwrap();
    assert_eq!(p1.requested_quantity, 5);
    assert_eq!(p1.available_stock, 2);
    assert_eq!(p1.reason, "insufficient stock");

    // Checking never mutates the cart.
    assert_eq!(sync.cart().unwrap(), before);
}

#[tokio::test]
async fn test_auto_fix_reduces_and_removes() {
    let (_service, sync) = stale_cart();
    sync.load().await.unwrap();
    let reconciler = AvailabilityReconciler::new(&sync);

    let report = reconciler.check().await.unwrap();
    let summary = reconciler.auto_fix(&report).await.unwrap();

    assert_eq!(summary.applied.len(), 2);
    let cart = sync.cart().unwrap();
    assert_eq!(cart.quantity_of(&pid("p1")), 2);
    assert!(cart.line(&pid("p2")).is_none());
    assert_eq!(cart.quantity_of(&pid("p3")), 1);
    assert!(cart.totals_consistent());

    let recheck = reconciler.check().await.unwrap();
    assert!(recheck.available);
}

#[tokio::test]
async fn test_auto_fix_keeps_partial_progress() {
    let (service, sync) = stale_cart();
    sync.load().await.unwrap();
    let reconciler = AvailabilityReconciler::new(&sync);
    let report = reconciler.check().await.unwrap();

    service.fail_next(ServiceOp::Remove, ServiceError::Transport("connection reset".into()));
    let err = reconciler.auto_fix(&report).await.unwrap_err();

    assert_eq!(
        err.applied,
        vec![FixAction::Reduce {
            product_id: pid("p1"),
            to: 2,
        }]
    );
    assert_eq!(
        err.failed_at,
        FixAction::Remove {
            product_id: pid("p2"),
        }
    );
    assert!(matches!(
        err.source,
        CartError::Mutation {
            kind: MutationKind::Remove,
            ..
        }
    ));

    let cart = sync.cart().unwrap();
    assert_eq!(cart.quantity_of(&pid("p1")), 2);
    assert_eq!(cart.quantity_of(&pid("p2")), 3);
}

#[tokio::test]
async fn test_check_failure_is_unknown() {
    let (service, sync) = stale_cart();
    sync.load().await.unwrap();
    service.fail_next(
        ServiceOp::CheckAvailability,
        ServiceError::rejected(503, "inventory unavailable"),
    );

    let err = AvailabilityReconciler::new(&sync).check().await.unwrap_err();
    assert_eq!(
        err,
        CartError::Check {
            reason: "inventory unavailable".to_string(),
        }
    );
}
