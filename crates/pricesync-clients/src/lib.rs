//! PriceSync Clients - external platform adapters
//!
//! This crate wraps the two remote platforms a sync run talks to:
//! - Shopify Admin API (find variant by SKU, update variant price)
//! - Google Sheets (read pricing rows, write back variant ids)
//!
//! Both clients dispatch every call through their own [`RequestQueue`] so
//! outbound requests to one endpoint are serialized and spaced out.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod queue;
pub mod sheets;
pub mod shopify;
pub mod traits;
pub mod types;

pub(crate) mod util;

pub use error::{Error, Result};
pub use queue::RequestQueue;
pub use sheets::{ServiceAccountKey, SheetsClient, SheetsConfig, TRACKING_HEADER};
pub use shopify::{ShopifyClient, ShopifyConfig};
pub use traits::{CatalogApi, SheetApi};
pub use types::{Product, SheetRow, Variant};

#[cfg(feature = "mocks")]
pub use traits::{MockCatalogApi, MockSheetApi};
