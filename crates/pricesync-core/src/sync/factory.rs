//! Per-run client construction.

use crate::config::{SheetsSettings, ShopifySettings};
use crate::error::Result;
use crate::types::Shop;
use pricesync_clients::sheets::{ServiceAccountKey, SheetsClient, SheetsConfig};
use pricesync_clients::shopify::{ShopifyClient, ShopifyConfig};
use pricesync_clients::traits::{CatalogApi, SheetApi};
use std::sync::Arc;
use std::time::Duration;

/// Builds the client pair for one sync run.
///
/// One catalog client and one sheet client are created per run, so the
/// catalog snapshot and the rate-limit queues never outlive the run or
/// leak across shops.
pub trait ClientFactory: Send + Sync {
    /// Catalog client bound to the shop's credentials.
    fn catalog(&self, shop: &Shop) -> Result<Arc<dyn CatalogApi>>;

    /// Sheet client for the shop, resolving credential precedence
    /// (per-shop payload over the process-wide fallback).
    fn sheet(&self, shop: &Shop) -> Result<Arc<dyn SheetApi>>;
}

/// Live factory wiring the real Shopify and Sheets clients.
pub struct LiveClientFactory {
    shopify: ShopifySettings,
    sheets: SheetsSettings,
}

impl LiveClientFactory {
    /// Create a factory from the configured platform settings.
    #[must_use]
    pub fn new(shopify: ShopifySettings, sheets: SheetsSettings) -> Self {
        Self { shopify, sheets }
    }
}

impl ClientFactory for LiveClientFactory {
    fn catalog(&self, shop: &Shop) -> Result<Arc<dyn CatalogApi>> {
        let config = ShopifyConfig::new(&shop.domain, &shop.access_token)
            .with_api_version(&self.shopify.api_version)
            .with_page_size(self.shopify.page_size)
            .with_request_delay(Duration::from_millis(self.shopify.request_delay_ms));
        Ok(Arc::new(ShopifyClient::new(config)?))
    }

    fn sheet(&self, shop: &Shop) -> Result<Arc<dyn SheetApi>> {
        let instance_key = shop
            .service_account_json
            .as_deref()
            .map(ServiceAccountKey::from_json)
            .transpose()?;
        let config = SheetsConfig::resolve(
            instance_key,
            self.sheets.service_account_path.as_deref(),
        )?
        .with_request_delay(self.sheets.request_delay());
        Ok(Arc::new(SheetsClient::new(config)?))
    }
}
