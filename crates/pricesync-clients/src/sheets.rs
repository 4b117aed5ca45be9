//! Google Sheets pricing-sheet client
//!
//! Reads the 4-column pricing range of a named tab, keeps the tracking
//! header present and writes catalog variant ids back per row. Sheets API
//! calls are serialized through the client's own [`RequestQueue`]; access
//! tokens come from a service-account JWT-bearer exchange and are cached
//! until shortly before expiry.

use crate::error::{Error, Result};
use crate::queue::RequestQueue;
use crate::traits::SheetApi;
use crate::types::SheetRow;
use crate::util::truncate_safe;
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Marker value expected in the tracking column's header cell.
pub const TRACKING_HEADER: &str = "Shopify Variant ID";

/// OAuth scope covering value reads and writes.
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Refresh the cached token this long before it actually expires.
const TOKEN_EXPIRY_SLACK: Duration = Duration::from_secs(60);

/// Everything that is not a digit, decimal point or sign: currency
/// symbols, thousands separators, stray whitespace.
static PRICE_JUNK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9.\-]").expect("static pattern"));

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// Service-account credentials payload (the JSON Google hands out).
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// Service-account email, used as the JWT issuer
    pub client_email: String,
    /// PEM-encoded RSA private key
    pub private_key: String,
    /// Token endpoint to exchange assertions at
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    /// Parse a service-account payload from its JSON form.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| Error::Config(format!("invalid service account payload: {e}")))
    }

    /// Read and parse a service-account payload from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "cannot read service account file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&raw)
    }
}

/// Sheets client configuration
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    /// Credentials used for the token exchange
    pub credentials: ServiceAccountKey,
    /// Minimum delay between Sheets API calls
    pub request_delay: Duration,
}

impl SheetsConfig {
    /// Create a config with the default request delay.
    #[must_use]
    pub fn new(credentials: ServiceAccountKey) -> Self {
        Self {
            credentials,
            request_delay: Duration::from_millis(1000),
        }
    }

    /// Set the minimum delay between Sheets API calls
    #[must_use]
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Resolve credentials: an instance-level payload always wins over the
    /// process-wide fallback file.
    pub fn resolve(instance: Option<ServiceAccountKey>, fallback: Option<&Path>) -> Result<Self> {
        let credentials = match instance {
            Some(key) => key,
            None => {
                let path = fallback.ok_or_else(|| {
                    Error::Config(
                        "no sheet credentials supplied and no fallback configured".to_string(),
                    )
                })?;
                ServiceAccountKey::from_file(path)?
            }
        };
        Ok(Self::new(credentials))
    }
}

#[derive(Debug, Serialize)]
struct BearerClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Google Sheets client.
///
/// One instance per sync run, with its own rate-limit queue and token
/// cache.
pub struct SheetsClient {
    config: SheetsConfig,
    http: reqwest::Client,
    queue: RequestQueue,
    token: Mutex<Option<CachedToken>>,
}

impl SheetsClient {
    /// Create a client from resolved credentials.
    pub fn new(config: SheetsConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Config(format!("failed to build http client: {e}")))?;
        let queue = RequestQueue::new(config.request_delay);

        Ok(Self {
            config,
            http,
            queue,
            token: Mutex::new(None),
        })
    }

    /// Current bearer token, exchanging a fresh one when the cached token
    /// is missing or close to expiry.
    async fn bearer(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_EXPIRY_SLACK {
                return Ok(token.token.clone());
            }
        }
        let fresh = self.exchange_token().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    /// JWT-bearer grant against the service account's token endpoint.
    ///
    /// The token endpoint is not the Sheets API, so this call does not go
    /// through the rate-limit queue.
    async fn exchange_token(&self) -> Result<CachedToken> {
        let key = &self.config.credentials;
        let now = Utc::now().timestamp();
        let claims = BearerClaims {
            iss: &key.client_email,
            scope: SHEETS_SCOPE,
            aud: &key.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| Error::Auth(format!("invalid service account private key: {e}")))?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
            .map_err(|e| Error::Auth(format!("failed to sign token assertion: {e}")))?;

        debug!(email = %key.client_email, "exchanging service account assertion");
        let response = self
            .http
            .post(&key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(Error::Auth(format!(
                "token exchange failed (http {status}): {}",
                truncate_safe(&body, 200)
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Auth(format!("malformed token response: {e}")))?;
        Ok(CachedToken {
            token: parsed.access_token,
            expires_at: Instant::now() + Duration::from_secs(parsed.expires_in),
        })
    }

    fn values_url(&self, sheet_id: &str, range: &str) -> String {
        format!(
            "https://sheets.googleapis.com/v4/spreadsheets/{}/values/{}",
            sheet_id,
            range.replace(' ', "%20")
        )
    }

    async fn get_values(&self, sheet_id: &str, range: &str) -> Result<ValueRange> {
        let token = self.bearer().await?;
        let url = self.values_url(sheet_id, range);
        let http = self.http.clone();
        let response = self
            .queue
            .enqueue(async move { http.get(&url).bearer_auth(&token).send().await })
            .await?;

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

    async fn put_values(
        &self,
        sheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<()> {
        let token = self.bearer().await?;
        let url = format!(
            "{}?valueInputOption=RAW",
            self.values_url(sheet_id, range)
        );
        let body = json!({ "values": values });
        let http = self.http.clone();
        let response = self
            .queue
            .enqueue(async move { http.put(&url).bearer_auth(&token).json(&body).send().await })
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Strip currency symbols and separators, then parse as a decimal.
fn parse_price(text: &str) -> Option<f64> {
    let cleaned = PRICE_JUNK.replace_all(text.trim(), "");
    cleaned.parse::<f64>().ok()
}

/// Text content of a cell; numeric cells are rendered back to text.
fn cell_text(cell: Option<&serde_json::Value>) -> String {
    match cell {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(value) => value.to_string(),
        None => String::new(),
    }
}

/// Validation lives in the read itself: the header row is skipped, a SKU
/// is required and the price must parse strictly positive. Anything else
/// is dropped silently. Original 1-based row numbers are retained for the
/// later write-back.
fn parse_rows(values: &[Vec<serde_json::Value>]) -> Vec<SheetRow> {
    let mut rows = Vec::new();
    for (index, row) in values.iter().enumerate() {
        if index == 0 {
            continue;
        }
        let row_number = (index + 1) as u32;
        let raw_sku = cell_text(row.first());
        let sku = raw_sku.trim();
        if sku.is_empty() {
            continue;
        }
        let Some(price) = parse_price(&cell_text(row.get(1))) else {
            continue;
        };
        if price <= 0.0 {
            continue;
        }
        let compare_at_price = parse_price(&cell_text(row.get(2)));
        rows.push(SheetRow {
            sku: sku.to_string(),
            price,
            compare_at_price,
            row_number,
        });
    }
    rows
}

#[async_trait]
impl SheetApi for SheetsClient {
    async fn read_rows(&self, sheet_id: &str, sheet_name: &str) -> Result<Vec<SheetRow>> {
        let range = format!("{sheet_name}!A1:D");
        let value_range = self.get_values(sheet_id, &range).await?;
        let rows = parse_rows(&value_range.values);
        debug!(sheet = sheet_id, tab = sheet_name, rows = rows.len(), "sheet rows loaded");
        Ok(rows)
    }

    async fn ensure_tracking_header(&self, sheet_id: &str, sheet_name: &str) -> Result<()> {
        let range = format!("{sheet_name}!D1");
        let current = self.get_values(sheet_id, &range).await?;
        let existing = current.values.first().and_then(|row| row.first());
        if cell_text(existing) == TRACKING_HEADER {
            return Ok(());
        }
        debug!(sheet = sheet_id, tab = sheet_name, "writing tracking header");
        self.put_values(sheet_id, &range, vec![vec![TRACKING_HEADER.to_string()]])
            .await
    }

    async fn write_variant_id(
        &self,
        sheet_id: &str,
        sheet_name: &str,
        row_number: u32,
        variant_id: i64,
    ) -> Result<()> {
        let range = format!("{sheet_name}!D{row_number}");
        self.put_values(sheet_id, &range, vec![vec![variant_id.to_string()]])
            .await
    }

    async fn test_access(&self, sheet_id: &str) -> bool {
        let probe = async {
            let token = self.bearer().await?;
            let url = format!(
                "https://sheets.googleapis.com/v4/spreadsheets/{sheet_id}?fields=spreadsheetId"
            );
            let http = self.http.clone();
            let response = self
                .queue
                .enqueue(async move { http.get(&url).bearer_auth(&token).send().await })
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(Error::Api {
                    status: status.as_u16(),
                    body: response.text().await.unwrap_or_default(),
                });
            }
            Ok::<(), Error>(())
        };

        match probe.await {
            Ok(()) => true,
            Err(e) => {
                warn!(sheet = sheet_id, error = %e, "sheet access test failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests;
