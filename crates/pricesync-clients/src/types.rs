//! Wire and transit types shared by the catalog and sheet clients.

use serde::{Deserialize, Serialize};

/// One validated pricing row read from the spreadsheet.
///
/// Transient: produced by the sheet client, consumed by the sync loop,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetRow {
    /// Stock-keeping unit used to match a catalog variant
    pub sku: String,
    /// Target price to write
    pub price: f64,
    /// Target compare-at ("was") price, if the sheet provides one
    pub compare_at_price: Option<f64>,
    /// 1-based row position in the source sheet, used for write-back
    pub row_number: u32,
}

/// A product as returned by the catalog listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    /// Catalog product id
    pub id: i64,
    /// Product title
    pub title: String,
    /// Variants in listing order
    #[serde(default)]
    pub variants: Vec<Variant>,
}

/// A sellable variant of a product.
///
/// The Admin API returns prices as strings; [`Variant::price_value`] and
/// [`Variant::compare_at_value`] parse them on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    /// Catalog variant id
    pub id: i64,
    /// Owning product id
    pub product_id: i64,
    /// Stock-keeping unit; may be empty or absent in the catalog
    #[serde(default)]
    pub sku: Option<String>,
    /// Current price, as the API serializes it
    pub price: String,
    /// Current compare-at price, if set
    #[serde(default)]
    pub compare_at_price: Option<String>,
    /// Variant title
    #[serde(default)]
    pub title: Option<String>,
}

impl Variant {
    /// Current price as a decimal number.
    #[must_use]
    pub fn price_value(&self) -> Option<f64> {
        self.price.parse().ok()
    }

    /// Current compare-at price as a decimal number.
    #[must_use]
    pub fn compare_at_value(&self) -> Option<f64> {
        self.compare_at_price.as_deref().and_then(|p| p.parse().ok())
    }
}
