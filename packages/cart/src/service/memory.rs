//! In-process cart service.
//!
//! Behaves like the storefront API for one signed-in user: enforces stock on
//! add/update, deletes lines updated to zero and reports availability against
//! the live catalog. Tests use the failure queue and the pause latch to
//! script server behavior.

use super::{CartService, ServiceError};
use crate::model::{
    AvailabilityReport, Cart, CartId, CartLineItem, MutationReceipt, ProductId, UnavailableItem,
    UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use tokio::sync::watch;

/// Product as known to the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogProduct {
    pub id: ProductId,
    pub name: String,
    pub price: f64,
    pub stock: u32,
}

impl CatalogProduct {
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: f64, stock: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            stock,
        }
    }
}

/// Endpoint selector for failure injection and call counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceOp {
    Fetch,
    Add,
    Update,
    Remove,
    Clear,
    CheckAvailability,
}

#[derive(Debug, Clone)]
struct StoredLine {
    product_id: ProductId,
    quantity: u32,
    /// Price captured when the line was first added
    price: f64,
    added_at: DateTime<Utc>,
}

#[derive(Debug)]
struct MemoryState {
    cart_id: CartId,
    owner_id: UserId,
    catalog: BTreeMap<ProductId, CatalogProduct>,
    lines: Vec<StoredLine>,
    updated_at: DateTime<Utc>,
    failures: HashMap<ServiceOp, VecDeque<ServiceError>>,
    calls: HashMap<ServiceOp, usize>,
}

impl MemoryState {
    fn snapshot(&self) -> Cart {
        let items: Vec<CartLineItem> = self
            .lines
            .iter()
            .map(|line| {
                let product = self.catalog.get(&line.product_id);
                CartLineItem {
                    product_id: line.product_id.clone(),
                    product_name: product
                        .map(|p| p.name.clone())
                        .unwrap_or_else(|| line.product_id.to_string()),
                    unit_price: line.price,
                    quantity: line.quantity,
                    stock_at_product: product.map(|p| p.stock).unwrap_or(0),
                    added_at: line.added_at,
                }
            })
            .collect();

        Cart {
            id: self.cart_id.clone(),
            owner_id: self.owner_id.clone(),
            total_items: items.iter().map(|item| item.quantity).sum(),
            total_amount: items.iter().map(CartLineItem::line_total).sum(),
            items,
            updated_at: self.updated_at,
        }
    }

    fn record_call(&mut self, op: ServiceOp) -> Result<(), ServiceError> {
        *self.calls.entry(op).or_insert(0) += 1;
        match self.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn product(&self, product_id: &ProductId) -> Result<&CatalogProduct, ServiceError> {
        self.catalog
            .get(product_id)
            .ok_or_else(|| ServiceError::rejected(404, "product not found"))
    }

    fn line_index(&self, product_id: &ProductId) -> Result<usize, ServiceError> {
        self.lines
            .iter()
            .position(|line| &line.product_id == product_id)
            .ok_or_else(|| ServiceError::rejected(404, "item not found"))
    }

    fn receipt(&mut self, message: &str) -> MutationReceipt {
        self.updated_at = Utc::now();
        MutationReceipt {
            cart: self.snapshot(),
            message: message.to_string(),
        }
    }
}

/// Cart service backed by process memory
#[derive(Debug)]
pub struct MemoryCartService {
    state: Mutex<MemoryState>,
    paused: watch::Sender<bool>,
}

impl MemoryCartService {
    pub fn new(owner_id: impl Into<UserId>) -> Self {
        let owner_id = owner_id.into();
        let (paused, _) = watch::channel(false);

        Self {
            state: Mutex::new(MemoryState {
                cart_id: CartId::new(format!("cart-{}", owner_id)),
                owner_id,
                catalog: BTreeMap::new(),
                lines: Vec::new(),
                updated_at: Utc::now(),
                failures: HashMap::new(),
                calls: HashMap::new(),
            }),
            paused,
        }
    }

    /// Register `products` in the catalog
    pub fn with_products(self, products: impl IntoIterator<Item = CatalogProduct>) -> Self {
        {
            let mut state = self.lock();
            for product in products {
                state.catalog.insert(product.id.clone(), product);
            }
        }
        self
    }

    /// Put a line straight into the stored cart, bypassing stock checks
    pub fn seed_line(&self, product_id: impl Into<ProductId>, quantity: u32) {
        let product_id = product_id.into();
        let mut state = self.lock();
        let price = state.catalog.get(&product_id).map(|p| p.price).unwrap_or(0.0);
        state.lines.retain(|line| line.product_id != product_id);
        state.lines.push(StoredLine {
            product_id,
            quantity,
            price,
            added_at: Utc::now(),
        });
    }

    pub fn set_stock(&self, product_id: &ProductId, stock: u32) {
        if let Some(product) = self.lock().catalog.get_mut(product_id) {
            product.stock = stock;
        }
    }

    /// Queue a failure for the next call to `op`
    pub fn fail_next(&self, op: ServiceOp, error: ServiceError) {
        self.lock().failures.entry(op).or_default().push_back(error);
    }

    /// Hold all mutation endpoints until [`resume`](Self::resume)
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    /// Number of calls made to `op`, including failed ones
    pub fn calls(&self, op: ServiceOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Current server-side cart
    pub fn snapshot(&self) -> Cart {
        self.lock().snapshot()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A panicking test thread must not wedge every later call.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn wait_until_resumed(&self) {
        let mut rx = self.paused.subscribe();
        // The sender lives as long as `self`, so this only returns once resumed.
        let _ = rx.wait_for(|paused| !*paused).await;
    }
}

#[async_trait]
impl CartService for MemoryCartService {
    async fn fetch(&self) -> Result<Cart, ServiceError> {
        let mut state = self.lock();
        state.record_call(ServiceOp::Fetch)?;
        Ok(state.snapshot())
    }

    async fn add(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<MutationReceipt, ServiceError> {
        self.wait_until_resumed().await;
        let mut state = self.lock();
        state.record_call(ServiceOp::Add)?;

        if quantity == 0 {
            return Err(ServiceError::rejected(400, "quantity must be at least 1"));
        }
        let product = state.product(product_id)?.clone();

        match state.line_index(product_id) {
            Ok(index) => {
                let wanted = state.lines[index]
                    .quantity
                    .checked_add(quantity)
                    .filter(|wanted| *wanted <= product.stock)
                    .ok_or_else(|| ServiceError::rejected(400, "insufficient stock"))?;
                state.lines[index].quantity = wanted;
            }
            Err(_) => {
                if quantity > product.stock {
                    return Err(ServiceError::rejected(400, "insufficient stock"));
                }
                state.lines.push(StoredLine {
                    product_id: product_id.clone(),
                    quantity,
                    price: product.price,
                    added_at: Utc::now(),
                });
            }
        }

        Ok(state.receipt("Product added to cart"))
    }

    async fn update(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<MutationReceipt, ServiceError> {
        self.wait_until_resumed().await;
        let mut state = self.lock();
        state.record_call(ServiceOp::Update)?;

        let index = state.line_index(product_id)?;
        if quantity == 0 {
            state.lines.remove(index);
            return Ok(state.receipt("Product removed from cart"));
        }

        let stock = state.product(product_id)?.stock;
        if quantity > stock {
            return Err(ServiceError::rejected(400, "insufficient stock"));
        }
        state.lines[index].quantity = quantity;

        Ok(state.receipt("Cart updated"))
    }

    async fn remove(&self, product_id: &ProductId) -> Result<MutationReceipt, ServiceError> {
        self.wait_until_resumed().await;
        let mut state = self.lock();
        state.record_call(ServiceOp::Remove)?;

        let index = state.line_index(product_id)?;
        state.lines.remove(index);

        Ok(state.receipt("Product removed from cart"))
    }

    async fn clear(&self) -> Result<MutationReceipt, ServiceError> {
        self.wait_until_resumed().await;
        let mut state = self.lock();
        state.record_call(ServiceOp::Clear)?;

        state.lines.clear();

        Ok(state.receipt("Cart cleared"))
    }

    async fn check_availability(&self) -> Result<AvailabilityReport, ServiceError> {
        let mut state = self.lock();
        state.record_call(ServiceOp::CheckAvailability)?;

        let mut unavailable_items = Vec::new();
        for line in &state.lines {
            let (name, stock) = match state.catalog.get(&line.product_id) {
                Some(product) => (product.name.clone(), product.stock),
                None => (line.product_id.to_string(), 0),
            };
            if stock >= line.quantity {
                continue;
            }
            let reason = if stock == 0 {
                "out of stock"
            } else {
                "insufficient stock"
            };
            unavailable_items.push(UnavailableItem {
                product_id: line.product_id.clone(),
                product_name: name,
                requested_quantity: line.quantity,
                available_stock: stock,
                reason: reason.to_string(),
            });
        }

        Ok(AvailabilityReport {
            available: unavailable_items.is_empty(),
            unavailable_items,
            total_items: state.lines.iter().map(|line| line.quantity).sum(),
        })
    }
}
