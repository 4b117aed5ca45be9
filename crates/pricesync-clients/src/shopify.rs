//! Shopify Admin API catalog client
//!
//! Finds product variants by SKU and updates their price fields. All
//! network calls are dispatched through the client's own [`RequestQueue`];
//! the full product catalog is paginated once per client instance and
//! matched in memory afterwards, so a sync run works against a snapshot
//! taken at its start.

use crate::error::{Error, Result};
use crate::queue::RequestQueue;
use crate::traits::CatalogApi;
use crate::types::{Product, Variant};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Header carrying the Admin API access token.
const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

fn default_api_version() -> String {
    "2024-01".to_string()
}

/// Shopify client configuration
#[derive(Debug, Clone)]
pub struct ShopifyConfig {
    /// Shop domain, e.g. `my-store.myshopify.com`
    pub shop_domain: String,
    /// Admin API access token
    pub access_token: String,
    /// Admin API version segment
    pub api_version: String,
    /// Products per catalog listing page
    pub page_size: u32,
    /// Minimum delay between API calls
    pub request_delay: Duration,
}

impl ShopifyConfig {
    /// Create a config with default API version, page size and delay.
    #[must_use]
    pub fn new(shop_domain: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            shop_domain: shop_domain.into(),
            access_token: access_token.into(),
            api_version: default_api_version(),
            page_size: 250,
            request_delay: Duration::from_millis(500),
        }
    }

    /// Set the Admin API version
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Set the catalog listing page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the minimum delay between API calls
    #[must_use]
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    fn base_url(&self) -> String {
        format!("https://{}/admin/api/{}", self.shop_domain, self.api_version)
    }
}

#[derive(Debug, Deserialize)]
struct ProductsPage {
    products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
struct VariantEnvelope {
    variant: Variant,
}

#[derive(Debug, Deserialize)]
struct ShopEnvelope {
    shop: ShopInfo,
}

#[derive(Debug, Deserialize)]
struct ShopInfo {
    name: String,
}

/// Shopify Admin API client.
///
/// One instance per sync run: the catalog snapshot and rate-limit queue
/// are scoped to the instance and never shared across runs or shops.
pub struct ShopifyClient {
    config: ShopifyConfig,
    http: reqwest::Client,
    queue: RequestQueue,
    /// Catalog snapshot, filled on the first SKU lookup.
    products: OnceCell<Vec<Product>>,
}

impl ShopifyClient {
    /// Create a client for one shop.
    pub fn new(config: ShopifyConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Config(format!("failed to build http client: {e}")))?;
        let queue = RequestQueue::new(config.request_delay);

        Ok(Self {
            config,
            http,
            queue,
            products: OnceCell::new(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        let http = self.http.clone();
        let token = self.config.access_token.clone();
        let response = self
            .queue
            .enqueue(async move {
                http.get(&url)
                    .header(ACCESS_TOKEN_HEADER, token)
                    .send()
                    .await
            })
            .await?;
        Self::decode(response).await
    }

    async fn put_json<T: DeserializeOwned>(
        &self,
        url: String,
        body: serde_json::Value,
    ) -> Result<T> {
        let http = self.http.clone();
        let token = self.config.access_token.clone();
        let response = self
            .queue
            .enqueue(async move {
                http.put(&url)
                    .header(ACCESS_TOKEN_HEADER, token)
                    .json(&body)
                    .send()
                    .await
            })
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    /// Page through the whole catalog; a short page signals the end.
    async fn fetch_all_products(&self) -> Result<Vec<Product>> {
        let mut products: Vec<Product> = Vec::new();
        let mut since_id: i64 = 0;

        loop {
            let url = format!(
                "{}/products.json?limit={}&since_id={}&fields=id,title,variants",
                self.config.base_url(),
                self.config.page_size,
                since_id
            );
            let page: ProductsPage = self.get_json(url).await?;
            let fetched = page.products.len();
            if let Some(last) = page.products.last() {
                since_id = last.id;
            }
            products.extend(page.products);
            if fetched < self.config.page_size as usize {
                break;
            }
        }

        info!(
            shop = %self.config.shop_domain,
            products = products.len(),
            "catalog snapshot loaded"
        );
        Ok(products)
    }

    async fn catalog(&self) -> Result<&[Product]> {
        let products = self
            .products
            .get_or_try_init(|| self.fetch_all_products())
            .await?;
        Ok(products.as_slice())
    }
}

/// Scan products, then their variants, in listing order; the first exact
/// match wins, so duplicate SKUs resolve to the earliest listing entry.
fn find_in_products<'a>(products: &'a [Product], sku: &str) -> Option<&'a Variant> {
    products
        .iter()
        .flat_map(|product| product.variants.iter())
        .find(|variant| variant.sku.as_deref() == Some(sku))
}

/// Format a price the way the Admin API expects it: exactly two decimals.
fn format_price(price: f64) -> String {
    format!("{:.2}", price)
}

/// Build the variant update payload. The compare-at key is absent when no
/// value was supplied so an existing remote value is not cleared.
fn variant_payload(variant_id: i64, price: f64, compare_at_price: Option<f64>) -> serde_json::Value {
    let mut variant = json!({
        "id": variant_id,
        "price": format_price(price),
    });
    if let Some(compare_at) = compare_at_price {
        variant["compare_at_price"] = json!(format_price(compare_at));
    }
    json!({ "variant": variant })
}

#[async_trait]
impl CatalogApi for ShopifyClient {
    async fn test_connection(&self) -> bool {
        let url = format!("{}/shop.json", self.config.base_url());
        match self.get_json::<ShopEnvelope>(url).await {
            Ok(envelope) => {
                debug!(shop = %envelope.shop.name, "catalog connection ok");
                true
            }
            Err(e) => {
                warn!(
                    shop = %self.config.shop_domain,
                    error = %e,
                    "catalog connection test failed"
                );
                false
            }
        }
    }

    async fn find_variant_by_sku(&self, sku: &str) -> Result<Option<Variant>> {
        let products = self.catalog().await?;
        Ok(find_in_products(products, sku).cloned())
    }

    async fn update_variant_price(
        &self,
        variant_id: i64,
        price: f64,
        compare_at_price: Option<f64>,
    ) -> Result<Variant> {
        let url = format!("{}/variants/{}.json", self.config.base_url(), variant_id);
        let payload = variant_payload(variant_id, price, compare_at_price);
        let envelope: VariantEnvelope = self.put_json(url, payload).await?;
        debug!(variant_id, price = %envelope.variant.price, "variant price updated");
        Ok(envelope.variant)
    }
}
