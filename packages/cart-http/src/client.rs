use crate::config::ClientConfig;
use crate::error::{HttpError, HttpResult};
use crate::wire::{CartEnvelope, ErrorBody, QuantityBody, WireAvailability};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use storefront_cart::{
    AvailabilityReport, Cart, CartService, MutationReceipt, ProductId, ServiceError,
};

/// REST client for the storefront cart endpoints
pub struct HttpCartService {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl HttpCartService {
    pub fn new(config: &ClientConfig, token: Option<String>) -> HttpResult<Self> {
        let base = Url::parse(&config.api_url).map_err(|e| HttpError::InvalidUrl {
            url: config.api_url.clone(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(HttpError::InvalidUrl {
                url: config.api_url.clone(),
                reason: "URL cannot have path segments".to_string(),
            });
        }

        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            base,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Append path segments to the base URL, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ServiceError> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        if status == StatusCode::UNAUTHORIZED {
            return Err(ServiceError::Unauthorized);
        }
        if !status.is_success() {
            let reason = serde_json::from_slice::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
                });
            tracing::debug!(status = status.as_u16(), %reason, "cart request rejected");
            return Err(ServiceError::rejected(status.as_u16(), reason));
        }

        serde_json::from_slice(&body).map_err(|e| ServiceError::Decode(e.to_string()))
    }

    async fn mutation(&self, request: RequestBuilder) -> Result<MutationReceipt, ServiceError> {
        self.send::<CartEnvelope>(request).await.map(Into::into)
    }
}

#[async_trait]
impl CartService for HttpCartService {
    async fn fetch(&self) -> Result<Cart, ServiceError> {
        let request = self.client.get(self.endpoint(&["cart"]));
        let envelope: CartEnvelope = self.send(request).await?;
        Ok(envelope.cart.into())
    }

    async fn add(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<MutationReceipt, ServiceError> {
        let request = self
            .client
            .post(self.endpoint(&["cart", "add"]))
            .json(&QuantityBody {
                product_id: product_id.as_str(),
                quantity,
            });
        self.mutation(request).await
    }

    async fn update(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<MutationReceipt, ServiceError> {
        let request = self
            .client
            .put(self.endpoint(&["cart", "update"]))
            .json(&QuantityBody {
                product_id: product_id.as_str(),
                quantity,
            });
        self.mutation(request).await
    }

    async fn remove(&self, product_id: &ProductId) -> Result<MutationReceipt, ServiceError> {
        let request = self
            .client
            .delete(self.endpoint(&["cart", "remove", product_id.as_str()]));
        self.mutation(request).await
    }

    async fn clear(&self) -> Result<MutationReceipt, ServiceError> {
        let request = self.client.delete(self.endpoint(&["cart", "clear"]));
        self.mutation(request).await
    }

    async fn check_availability(&self) -> Result<AvailabilityReport, ServiceError> {
        let request = self
            .client
            .get(self.endpoint(&["cart", "check-availability"]));
        let report: WireAvailability = self.send(request).await?;
        Ok(report.into())
    }
}

impl std::fmt::Debug for HttpCartService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCartService")
            .field("base", &self.base.as_str())
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(api_url: &str) -> HttpCartService {
        let config = ClientConfig {
            api_url: api_url.to_string(),
            ..ClientConfig::default()
        };
        HttpCartService::new(&config, None).unwrap()
    }

    #[test]
    fn test_endpoint_joins_base_path() {
        let service = service("http://localhost:5000/api");
        assert_eq!(
            service.endpoint(&["cart", "add"]).as_str(),
            "http://localhost:5000/api/cart/add"
        );
    }

    #[test]
    fn test_endpoint_ignores_trailing_slash() {
        let service = service("https://shop.example/api/");
        assert_eq!(
            service.endpoint(&["cart"]).as_str(),
            "https://shop.example/api/cart"
        );
    }

    #[test]
    fn test_endpoint_encodes_product_id() {
        let service = service("http://localhost:5000/api");
        assert_eq!(
            service.endpoint(&["cart", "remove", "deck 8/25"]).as_str(),
            "http://localhost:5000/api/cart/remove/deck%208%2F25"
        );
    }

    #[test]
    fn test_rejects_invalid_url() {
        let config = ClientConfig {
            api_url: "not a url".to_string(),
            ..ClientConfig::default()
        };
        let err = HttpCartService::new(&config, None).unwrap_err();
        assert!(matches!(err, HttpError::InvalidUrl { .. }));

        let config = ClientConfig {
            api_url: "mailto:shop@example.com".to_string(),
            ..ClientConfig::default()
        };
        assert!(HttpCartService::new(&config, None).is_err());
    }

    #[test]
    fn test_debug_hides_token() {
        let service = HttpCartService::new(&ClientConfig::default(), Some("secret".into())).unwrap();
        let debug = format!("{:?}", service);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("authenticated: true"));
    }
}
