//! Client seams used by the sync engine.
//!
//! The reconciliation loop talks to the external platforms through these
//! traits so runs can be driven against test doubles. Live implementations
//! are [`ShopifyClient`](crate::shopify::ShopifyClient) and
//! [`SheetsClient`](crate::sheets::SheetsClient).

use crate::error::Result;
use crate::types::{SheetRow, Variant};
use async_trait::async_trait;

/// Product-variant platform operations needed by a sync run.
#[cfg_attr(feature = "mocks", mockall::automock)]
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Lightweight authenticated reachability probe. Never errors; a
    /// failure is logged and reported as `false`.
    async fn test_connection(&self) -> bool;

    /// Find the first variant whose SKU matches exactly (case-sensitive),
    /// in catalog listing order.
    async fn find_variant_by_sku(&self, sku: &str) -> Result<Option<Variant>>;

    /// Update a variant's price fields and return the variant as confirmed
    /// by the platform.
    ///
    /// `compare_at_price` is omitted from the write entirely when `None`;
    /// an existing remote value is left untouched in that case.
    async fn update_variant_price(
        &self,
        variant_id: i64,
        price: f64,
        compare_at_price: Option<f64>,
    ) -> Result<Variant>;
}

/// Spreadsheet platform operations needed by a sync run.
#[cfg_attr(feature = "mocks", mockall::automock)]
#[async_trait]
pub trait SheetApi: Send + Sync {
    /// Read and validate the pricing rows of the given tab.
    ///
    /// Rows failing validation (empty SKU, non-positive price) are dropped
    /// here; there is no separate validation pass downstream.
    async fn read_rows(&self, sheet_id: &str, sheet_name: &str) -> Result<Vec<SheetRow>>;

    /// Idempotently ensure the tracking column header cell holds the
    /// expected marker value.
    async fn ensure_tracking_header(&self, sheet_id: &str, sheet_name: &str) -> Result<()>;

    /// Write a catalog variant id into the tracking column of one row.
    async fn write_variant_id(
        &self,
        sheet_id: &str,
        sheet_name: &str,
        row_number: u32,
        variant_id: i64,
    ) -> Result<()>;

    /// Reachability probe for the spreadsheet. Never errors; a failure is
    /// logged and reported as `false`.
    async fn test_access(&self, sheet_id: &str) -> bool;
}
