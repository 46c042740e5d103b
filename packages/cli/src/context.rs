use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::sync::Arc;
use storefront_cart::service::{CatalogProduct, MemoryCartService};
use storefront_cart::{CartService, CartSession, CartSynchronizer, Identity, SyncConfig};
use storefront_cart_http::{ClientConfig, HttpCartService};

/// Environment variable holding the bearer token
pub const TOKEN_ENV: &str = "STOREFRONT_TOKEN";

type ServiceFactory = Box<dyn Fn(&Identity) -> Arc<dyn CartService>>;

pub struct ContextOptions {
    pub dir: PathBuf,
    pub demo: bool,
    pub user: String,
}

/// Signed-in cart for the duration of one command
pub struct CartContext {
    session: CartSession<ServiceFactory>,
    sync: Arc<CartSynchronizer>,
}

impl CartContext {
    pub async fn open(options: ContextOptions) -> Result<Self> {
        let mut identity = Identity::new(options.user);

        let (factory, sync_config): (ServiceFactory, SyncConfig) = if options.demo {
            let service: Arc<dyn CartService> = Arc::new(demo_store(&identity));
            (Box::new(move |_: &Identity| service.clone()), SyncConfig::default())
        } else {
            let config = ClientConfig::load(&options.dir)?;
            let token = std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty());
            if let Some(token) = &token {
                identity = identity.with_token(token.clone());
            }
            tracing::debug!(api_url = %config.api_url, "using storefront API");

            let service: Arc<dyn CartService> = Arc::new(HttpCartService::new(&config, token)?);
            (Box::new(move |_: &Identity| service.clone()), config.sync)
        };

        let mut session = CartSession::new(factory, sync_config);
        let sync = session
            .on_identity_changed(Some(identity))
            .await?
            .ok_or_else(|| anyhow!("No cart session"))?;

        Ok(Self { session, sync })
    }

    pub fn sync(&self) -> &CartSynchronizer {
        &self.sync
    }

    pub fn user(&self) -> String {
        self.session
            .identity()
            .map(|identity| identity.user_id.to_string())
            .unwrap_or_default()
    }
}

/// Sample store: a few products, one of which is oversold
fn demo_store(identity: &Identity) -> MemoryCartService {
    let service = MemoryCartService::new(identity.user_id.clone()).with_products([
        CatalogProduct::new("deck-825", "Complete Deck 8.25", 59.99, 12),
        CatalogProduct::new("wheels-54", "Street Wheels 54mm", 32.5, 8),
        CatalogProduct::new("bearings-7", "Abec 7 Bearings", 18.0, 1),
        CatalogProduct::new("grip-tape", "Grip Tape", 7.99, 0),
    ]);
    service.seed_line("deck-825", 1);
    service.seed_line("bearings-7", 3);
    service.seed_line("grip-tape", 2);
    service
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_cart::AvailabilityReconciler;

    fn demo_options() -> ContextOptions {
        ContextOptions {
            dir: PathBuf::from("."),
            demo: true,
            user: "demo".to_string(),
        }
    }

    #[tokio::test]
    async fn test_demo_context_loads_cart() {
        let ctx = CartContext::open(demo_options()).await.unwrap();
        let cart = ctx.sync().cart().unwrap();

        assert_eq!(ctx.user(), "demo");
        assert_eq!(cart.items.len(), 3);
        assert!(cart.totals_consistent());
    }

    #[tokio::test]
    async fn test_demo_store_is_oversold() {
        let ctx = CartContext::open(demo_options()).await.unwrap();
        let report = AvailabilityReconciler::new(ctx.sync()).check().await.unwrap();

        assert!(!report.available);
        assert_eq!(report.unavailable_items.len(), 2);
    }
}
