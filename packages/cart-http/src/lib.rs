//! # Storefront Cart HTTP
//!
//! [`CartService`](storefront_cart::CartService) backed by the storefront
//! REST API, plus the client configuration file loader.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storefront_cart::{CartSynchronizer};
//! use storefront_cart_http::{ClientConfig, HttpCartService};
//!
//! let config = ClientConfig::load(&cwd)?;
//! let service = HttpCartService::new(&config, Some(token))?;
//! let sync = CartSynchronizer::new(Arc::new(service), config.sync.clone());
//! ```

mod client;
mod config;
mod error;
mod wire;

pub use client::HttpCartService;
pub use config::{ClientConfig, API_URL_ENV, DEFAULT_CONFIG_NAME};
pub use error::{HttpError, HttpResult};
