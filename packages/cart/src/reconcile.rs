//! # Availability Reconciler
//!
//! Detects lines whose requested quantity exceeds live stock and, when the
//! user opts in, repairs them through the synchronizer.
//!
//! Repair is sequential and stops at the first failure. Lines already fixed
//! stay fixed: partial repair beats none.

use crate::errors::{CartError, CartResult};
use crate::model::{AvailabilityReport, ProductId};
use crate::sync::CartSynchronizer;
use std::fmt;
use thiserror::Error;

/// One corrective step derived from an availability report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixAction {
    /// Nothing left in stock
    Remove { product_id: ProductId },
    /// Lower the line to what is available
    Reduce { product_id: ProductId, to: u32 },
}

impl FixAction {
    pub fn product_id(&self) -> &ProductId {
        match self {
            FixAction::Remove { product_id } | FixAction::Reduce { product_id, .. } => product_id,
        }
    }
}

impl fmt::Display for FixAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixAction::Remove { product_id } => write!(f, "remove {}", product_id),
            FixAction::Reduce { product_id, to } => write!(f, "reduce {} to {}", product_id, to),
        }
    }
}

/// Everything `auto_fix` applied
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FixSummary {
    pub applied: Vec<FixAction>,
}

/// `auto_fix` stopped part way
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Auto-fix stopped at `{failed_at}` after {} fix(es): {source}", .applied.len())]
pub struct FixError {
    /// Fixes that went through before the failure; they are not rolled back
    pub applied: Vec<FixAction>,
    pub failed_at: FixAction,
    #[source]
    pub source: CartError,
}

/// Compute the fixes for `report`: `min(requested, available)`, removing the
/// line when that is 0.
pub fn plan(report: &AvailabilityReport) -> Vec<FixAction> {
    report
        .unavailable_items
        .iter()
        .map(|item| {
            let target = item.requested_quantity.min(item.available_stock);
            if target == 0 {
                FixAction::Remove {
                    product_id: item.product_id.clone(),
                }
            } else {
                FixAction::Reduce {
                    product_id: item.product_id.clone(),
                    to: target,
                }
            }
        })
        .collect()
}

/// Stock check and repair over one synchronizer
#[derive(Debug, Clone, Copy)]
pub struct AvailabilityReconciler<'a> {
    sync: &'a CartSynchronizer,
}

impl<'a> AvailabilityReconciler<'a> {
    pub fn new(sync: &'a CartSynchronizer) -> Self {
        Self { sync }
    }

    /// Read-only check. A failure means "unknown", never "available".
    pub async fn check(&self) -> CartResult<AvailabilityReport> {
        let report = self.sync.check_availability().await?;
        tracing::debug!(
            available = report.available,
            unavailable = report.unavailable_items.len(),
            "availability checked"
        );
        Ok(report)
    }

    /// Apply [`plan`] for `report`, one mutation at a time.
    pub async fn auto_fix(&self, report: &AvailabilityReport) -> Result<FixSummary, FixError> {
        let mut applied = Vec::new();

        for action in plan(report) {
            let result = match &action {
                FixAction::Remove { product_id } => self.sync.remove(product_id).await,
                FixAction::Reduce { product_id, to } => {
                    self.sync.update_quantity(product_id, *to).await
                }
            };

            if let Err(source) = result {
                tracing::warn!(%action, reason = %source, "auto-fix stopped");
                return Err(FixError {
                    applied,
                    failed_at: action,
                    source,
                });
            }
            tracing::info!(%action, "availability fix applied");
            applied.push(action);
        }

        Ok(FixSummary { applied })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UnavailableItem;

    fn unavailable(id: &str, requested: u32, available: u32) -> UnavailableItem {
        UnavailableItem {
            product_id: ProductId::from(id),
            product_name: id.to_string(),
            requested_quantity: requested,
            available_stock: available,
            reason: "insufficient stock".to_string(),
        }
    }

    #[test]
    fn test_plan() {
        let report = AvailabilityReport {
            available: false,
            unavailable_items: vec![unavailable("p1", 5, 2), unavailable("p2", 3, 0)],
            total_items: 8,
        };

        assert_eq!(
            plan(&report),
            vec![
                FixAction::Reduce {
                    product_id: ProductId::from("p1"),
                    to: 2,
                },
                FixAction::Remove {
                    product_id: ProductId::from("p2"),
                },
            ]
        );
    }

    #[test]
    fn test_plan_of_available_cart_is_empty() {
        let report = AvailabilityReport {
            available: true,
            unavailable_items: vec![],
            total_items: 4,
        };
        assert!(plan(&report).is_empty());
    }

    #[test]
    fn test_zero_requested_removes() {
        let report = AvailabilityReport {
            available: false,
            unavailable_items: vec![unavailable("p3", 0, 7)],
            total_items: 0,
        };
        assert!(matches!(plan(&report)[0], FixAction::Remove { .. }));
    }
}
