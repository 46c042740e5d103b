//! # Quantity Edit Buffer
//!
//! Per-line scratch state for quantity edits. Keystrokes only touch the
//! buffer; the network is involved once per discrete intent (blur, commit
//! key, increment/decrement button) through [`EditBuffer::commit`].
//!
//! ## Design
//!
//! - Entries are reseeded from every new authoritative cart
//! - Lines the user is editing keep their staged value across reseeds
//! - A failed commit reverts the entry to the authoritative quantity, so the
//!   displayed value never silently disagrees with the server

use crate::errors::CartResult;
use crate::model::{Cart, ProductId};
use crate::sync::CartSynchronizer;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BufferEntry {
    staged: u32,
    /// Last quantity confirmed by the server
    confirmed: u32,
    /// Stock ceiling for staging
    ceiling: u32,
    editing: bool,
}

/// What a commit did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Staged value matched the cart; nothing was sent
    Unchanged,
    Committed { quantity: u32 },
    /// Staged value was 0 and the line is gone
    Removed,
}

/// Pending quantity edits keyed by product
#[derive(Debug, Default)]
pub struct EditBuffer {
    entries: HashMap<ProductId, BufferEntry>,
}

impl EditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer seeded from `cart`
    pub fn seeded(cart: &Cart) -> Self {
        let mut buffer = Self::new();
        buffer.reseed(cart);
        buffer
    }

    /// Rebuild entries from a new authoritative cart.
    ///
    /// Lines no longer in the cart are dropped.
    pub fn reseed(&mut self, cart: &Cart) {
        let mut entries = HashMap::with_capacity(cart.items.len());

        for item in &cart.items {
            let entry = match self.entries.get(&item.product_id) {
                Some(previous) if previous.editing => {
                    let staged = previous.staged.min(item.stock_at_product);
                    BufferEntry {
                        staged,
                        confirmed: item.quantity,
                        ceiling: item.stock_at_product,
                        editing: staged != item.quantity,
                    }
                }
                _ => BufferEntry {
                    staged: item.quantity,
                    confirmed: item.quantity,
                    ceiling: item.stock_at_product,
                    editing: false,
                },
            };
            entries.insert(item.product_id.clone(), entry);
        }

        self.entries = entries;
    }

    /// Stage raw user input for `product_id`. Never fails.
    ///
    /// Non-numeric and negative input stage 0; values above the known stock
    /// stage the stock.
    pub fn stage(&mut self, product_id: &ProductId, raw_input: &str) -> u32 {
        self.stage_value(product_id, parse_quantity(raw_input))
    }

    pub fn staged(&self, product_id: &ProductId) -> Option<u32> {
        self.entries.get(product_id).map(|entry| entry.staged)
    }

    /// Whether `product_id` holds an uncommitted edit
    pub fn is_editing(&self, product_id: &ProductId) -> bool {
        self.entries
            .get(product_id)
            .map(|entry| entry.editing)
            .unwrap_or(false)
    }

    /// Send the staged value for `product_id` if it differs from the cart.
    ///
    /// On failure the entry reverts to the authoritative quantity and the
    /// error is returned unchanged.
    pub async fn commit(
        &mut self,
        product_id: &ProductId,
        sync: &CartSynchronizer,
    ) -> CartResult<CommitOutcome> {
        let authoritative = sync.cart().map(|cart| cart.quantity_of(product_id));
        let Some(staged) = self.staged(product_id) else {
            return Ok(CommitOutcome::Unchanged);
        };

        if Some(staged) == authoritative {
            self.settle(product_id);
            return Ok(CommitOutcome::Unchanged);
        }

        match sync.update_quantity(product_id, staged).await {
            Ok(_) => {
                self.settle(product_id);
                if let Some(cart) = sync.cart() {
                    self.reseed(&cart);
                }
                if staged == 0 {
                    self.forget(product_id);
                    Ok(CommitOutcome::Removed)
                } else {
                    Ok(CommitOutcome::Committed { quantity: staged })
                }
            }
            Err(err) => {
                // A product with no cart line has nothing to revert to.
                let confirmed = sync
                    .cart()
                    .and_then(|cart| cart.line(product_id).map(|line| line.quantity));
                self.revert(product_id, confirmed);
                Err(err)
            }
        }
    }

    /// Increment button: authoritative quantity + 1, clamped to stock
    pub async fn increment(
        &mut self,
        product_id: &ProductId,
        sync: &CartSynchronizer,
    ) -> CartResult<CommitOutcome> {
        let current = sync.cart().map(|cart| cart.quantity_of(product_id)).unwrap_or(0);
        self.stage_value(product_id, current.saturating_add(1));
        self.commit(product_id, sync).await
    }

    /// Decrement button: authoritative quantity - 1; reaching 0 removes the line
    pub async fn decrement(
        &mut self,
        product_id: &ProductId,
        sync: &CartSynchronizer,
    ) -> CartResult<CommitOutcome> {
        let current = sync.cart().map(|cart| cart.quantity_of(product_id)).unwrap_or(0);
        self.stage_value(product_id, current.saturating_sub(1));
        self.commit(product_id, sync).await
    }

    /// Remove the line through the synchronizer and drop its entry
    pub async fn remove_line(
        &mut self,
        product_id: &ProductId,
        sync: &CartSynchronizer,
    ) -> CartResult<CommitOutcome> {
        sync.remove(product_id).await?;
        self.forget(product_id);
        Ok(CommitOutcome::Removed)
    }

    pub fn forget(&mut self, product_id: &ProductId) {
        self.entries.remove(product_id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn stage_value(&mut self, product_id: &ProductId, requested: u32) -> u32 {
        let entry = self
            .entries
            .entry(product_id.clone())
            .or_insert(BufferEntry {
                staged: 0,
                confirmed: 0,
                ceiling: u32::MAX,
                editing: false,
            });

        entry.staged = requested.min(entry.ceiling);
        entry.editing = entry.staged != entry.confirmed;
        entry.staged
    }

    fn settle(&mut self, product_id: &ProductId) {
        if let Some(entry) = self.entries.get_mut(product_id) {
            entry.editing = false;
        }
    }

    fn revert(&mut self, product_id: &ProductId, authoritative: Option<u32>) {
        match authoritative {
            Some(quantity) => {
                if let Some(entry) = self.entries.get_mut(product_id) {
                    entry.staged = quantity;
                    entry.confirmed = quantity;
                    entry.editing = false;
                }
            }
            // Nothing confirmed to fall back to.
            None => self.forget(product_id),
        }
    }
}

/// Leading-integer parse: `"12abc"` is 12, `"3.9"` is 3, anything without
/// leading digits or with a minus sign is 0. Overflow saturates.
pub fn parse_quantity(raw: &str) -> u32 {
    let trimmed = raw.trim_start();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    let digits = &unsigned[..end];

    if negative || digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CartId, CartLineItem, UserId};
    use chrono::Utc;

    fn cart(lines: &[(&str, u32, u32)]) -> Cart {
        let items: Vec<CartLineItem> = lines
            .iter()
            .map(|(id, quantity, stock)| CartLineItem {
                product_id: ProductId::from(*id),
                product_name: id.to_string(),
                unit_price: 1.0,
                quantity: *quantity,
                stock_at_product: *stock,
                added_at: Utc::now(),
            })
            .collect();
        Cart {
            total_items: items.iter().map(|i| i.quantity).sum(),
            total_amount: items.iter().map(CartLineItem::line_total).sum(),
            items,
            ..Cart::empty(CartId::from("c1"), UserId::from("u1"))
        }
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("7"), 7);
        assert_eq!(parse_quantity("  12abc"), 12);
        assert_eq!(parse_quantity("3.9"), 3);
        assert_eq!(parse_quantity("+4"), 4);
        assert_eq!(parse_quantity("-5"), 0);
        assert_eq!(parse_quantity("abc"), 0);
        assert_eq!(parse_quantity(""), 0);
        assert_eq!(parse_quantity("99999999999999"), u32::MAX);
    }

    #[test]
    fn test_stage_clamps() {
        let p = ProductId::from("p");
        let mut buffer = EditBuffer::seeded(&cart(&[("p", 1, 3)]));

        assert_eq!(buffer.stage(&p, "-5"), 0);
        assert_eq!(buffer.stage(&p, "9999"), 3);
        assert_eq!(buffer.stage(&p, "abc"), 0);
        assert_eq!(buffer.stage(&p, "2"), 2);
        assert_eq!(buffer.staged(&p), Some(2));
        assert!(buffer.is_editing(&p));
    }

    #[test]
    fn test_reseed_follows_cart() {
        let mut buffer = EditBuffer::seeded(&cart(&[("a", 1, 5), ("b", 2, 5)]));
        buffer.reseed(&cart(&[("a", 4, 5)]));

        assert_eq!(buffer.staged(&ProductId::from("a")), Some(4));
        assert_eq!(buffer.staged(&ProductId::from("b")), None);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_reseed_preserves_active_edit() {
        let a = ProductId::from("a");
        let mut buffer = EditBuffer::seeded(&cart(&[("a", 1, 5)]));
        buffer.stage(&a, "4");

        buffer.reseed(&cart(&[("a", 1, 3)]));
        assert_eq!(buffer.staged(&a), Some(3));
        assert!(buffer.is_editing(&a));
    }

    #[test]
    fn test_stage_unknown_product_has_no_ceiling() {
        let mut buffer = EditBuffer::new();
        assert_eq!(buffer.stage(&ProductId::from("x"), "40"), 40);
    }
}
