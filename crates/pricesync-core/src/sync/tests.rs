use super::*;
use crate::types::{LogOutcome, Shop, SyncStatus};
use async_trait::async_trait;
use pricesync_clients::traits::{CatalogApi, SheetApi};
use pricesync_clients::types::{SheetRow, Variant};
use pricesync_clients::{Error as ClientError, MockCatalogApi, MockSheetApi};
use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;

struct TestContext {
    service: SyncService,
    store: Arc<SyncStore>,
    shop: Shop,
    _dir: TempDir,
}

async fn context_with(catalog: Arc<dyn CatalogApi>, sheet: Arc<dyn SheetApi>) -> TestContext {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SyncStore::from_path(&dir.path().join("test.db")).await.unwrap());

    let shop = Shop::new("unit-test.myshopify.com", "shpat_test");
    store.create_shop(&shop).await.unwrap();

    let factory = Arc::new(FixedFactory { catalog, sheet });
    let config = SyncConfig {
        row_delay_ms: 0,
        event_capacity: 256,
    };
    let service = SyncService::new(Arc::clone(&store), factory, config);

    TestContext {
        service,
        store,
        shop,
        _dir: dir,
    }
}

struct FixedFactory {
    catalog: Arc<dyn CatalogApi>,
    sheet: Arc<dyn SheetApi>,
}

impl ClientFactory for FixedFactory {
    fn catalog(&self, _shop: &Shop) -> Result<Arc<dyn CatalogApi>> {
        Ok(Arc::clone(&self.catalog))
    }

    fn sheet(&self, _shop: &Shop) -> Result<Arc<dyn SheetApi>> {
        Ok(Arc::clone(&self.sheet))
    }
}

fn variant(id: i64, sku: &str, price: &str, compare_at: Option<&str>) -> Variant {
    Variant {
        id,
        product_id: id * 10,
        sku: Some(sku.to_string()),
        price: price.to_string(),
        compare_at_price: compare_at.map(str::to_string),
        title: None,
    }
}

fn sheet_row(sku: &str, price: f64, compare_at: Option<f64>, row_number: u32) -> SheetRow {
    SheetRow {
        sku: sku.to_string(),
        price,
        compare_at_price: compare_at,
        row_number,
    }
}

/// Stateful catalog double: a fixed variant set, optional per-SKU lookup
/// failures, optional lookup latency, and a record of issued updates.
#[derive(Default)]
struct FakeCatalog {
    variants: HashMap<String, Variant>,
    fail_skus: Vec<String>,
    lookup_delay: Duration,
    updates: StdMutex<Vec<(i64, f64, Option<f64>)>>,
}

impl FakeCatalog {
    fn with_variants(variants: Vec<Variant>) -> Self {
        let variants = variants
            .into_iter()
            .map(|v| (v.sku.clone().unwrap_or_default(), v))
            .collect();
        Self {
            variants,
            ..Self::default()
        }
    }
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn test_connection(&self) -> bool {
        true
    }

    async fn find_variant_by_sku(
        &self,
        sku: &str,
    ) -> pricesync_clients::Result<Option<Variant>> {
        if !self.lookup_delay.is_zero() {
            tokio::time::sleep(self.lookup_delay).await;
        }
        if self.fail_skus.iter().any(|s| s == sku) {
            return Err(ClientError::Api {
                status: 500,
                body: "lookup exploded".to_string(),
            });
        }
        Ok(self.variants.get(sku).cloned())
    }

    async fn update_variant_price(
        &self,
        variant_id: i64,
        price: f64,
        compare_at_price: Option<f64>,
    ) -> pricesync_clients::Result<Variant> {
        self.updates
            .lock()
            .unwrap()
            .push((variant_id, price, compare_at_price));
        let variant = self
            .variants
            .values()
            .find(|v| v.id == variant_id)
            .cloned()
            .expect("update issued for unknown variant");
        Ok(Variant {
            price: format!("{price:.2}"),
            compare_at_price: compare_at_price
                .map(|c| format!("{c:.2}"))
                .or(variant.compare_at_price.clone()),
            ..variant
        })
    }
}

/// Stateful sheet double: canned rows, optional read/write-back failures,
/// and a record of header and write-back calls.
#[derive(Default)]
struct FakeSheet {
    rows: Vec<SheetRow>,
    fail_read: bool,
    fail_writeback: bool,
    header_writes: StdMutex<u32>,
    writebacks: StdMutex<Vec<(u32, i64)>>,
}

impl FakeSheet {
    fn with_rows(rows: Vec<SheetRow>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }
}

#[async_trait]
impl SheetApi for FakeSheet {
    async fn read_rows(
        &self,
        _sheet_id: &str,
        _sheet_name: &str,
    ) -> pricesync_clients::Result<Vec<SheetRow>> {
        if self.fail_read {
            return Err(ClientError::Api {
                status: 403,
                body: "sheet read denied".to_string(),
            });
        }
        Ok(self.rows.clone())
    }

    async fn ensure_tracking_header(
        &self,
        _sheet_id: &str,
        _sheet_name: &str,
    ) -> pricesync_clients::Result<()> {
        *self.header_writes.lock().unwrap() += 1;
        Ok(())
    }

    async fn write_variant_id(
        &self,
        _sheet_id: &str,
        _sheet_name: &str,
        row_number: u32,
        variant_id: i64,
    ) -> pricesync_clients::Result<()> {
        if self.fail_writeback {
            return Err(ClientError::Api {
                status: 500,
                body: "write-back denied".to_string(),
            });
        }
        self.writebacks.lock().unwrap().push((row_number, variant_id));
        Ok(())
    }

    async fn test_access(&self, _sheet_id: &str) -> bool {
        true
    }
}

/// Wait for the run's terminal event, skipping progress/log chatter.
async fn wait_for_terminal(rx: &mut broadcast::Receiver<SyncEvent>) -> SyncEvent {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for terminal event")
            .expect("event bus closed");
        if matches!(event, SyncEvent::Complete { .. } | SyncEvent::Error { .. }) {
            return event;
        }
    }
}

#[tokio::test]
async fn test_full_run_reconciles_all_rows() {
    let catalog = Arc::new(FakeCatalog::with_variants(vec![
        variant(1, "A", "10.00", None),
        variant(3, "C", "20.00", Some("24.00")),
    ]));
    let sheet = Arc::new(FakeSheet::with_rows(vec![
        sheet_row("A", 11.0, None, 2),
        sheet_row("B", 12.5, None, 3),
        sheet_row("C", 22.0, Some(25.0), 4),
    ]));
    let ctx = context_with(catalog.clone(), sheet.clone()).await;

    let mut rx = ctx.service.events().subscribe();
    let session_id = ctx.service.start_sync(ctx.shop.id, "sheet-1").await.unwrap();

    let terminal = wait_for_terminal(&mut rx).await;
    match terminal {
        SyncEvent::Complete { session_id: event_session, status, .. } => {
            assert_eq!(event_session, Some(session_id));
            assert_eq!(status, Some(SyncStatus::Completed));
        }
        other => panic!("expected complete event, got {other:?}"),
    }

    let session = ctx.store.get_session(session_id).await.unwrap();
    assert_eq!(session.status, SyncStatus::Completed);
    assert_eq!(session.total_rows, 3);
    assert_eq!(session.processed_rows, 3);
    assert_eq!(session.updated_count, 2);
    assert_eq!(session.not_found_count, 1);
    assert_eq!(session.error_count, 0);
    assert!(session.completed_at.is_some());

    let logs = ctx.store.logs_for_session(session_id).await.unwrap();
    let outcomes: Vec<_> = logs.iter().map(|l| l.outcome).collect();
    assert_eq!(
        outcomes,
        vec![LogOutcome::Success, LogOutcome::NotFound, LogOutcome::Success]
    );

    // the success entry snapshots old and new prices
    assert_eq!(logs[0].old_price, Some(10.0));
    assert_eq!(logs[0].new_price, Some(11.0));
    assert_eq!(logs[0].variant_id, Some(1));
    // the miss still records the price that would have been written
    assert_eq!(logs[1].new_price, Some(12.5));
    assert!(logs[1].variant_id.is_none());

    // updates went out in row order, compare-at only where supplied
    let updates = catalog.updates.lock().unwrap().clone();
    assert_eq!(updates, vec![(1, 11.0, None), (3, 22.0, Some(25.0))]);

    // write-backs landed on the matched rows, header ensured once
    let writebacks = sheet.writebacks.lock().unwrap().clone();
    assert_eq!(writebacks, vec![(2, 1), (4, 3)]);
    assert_eq!(*sheet.header_writes.lock().unwrap(), 1);

    // terminal state also clears the live status
    assert!(ctx.service.get_sync_status(ctx.shop.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_events_follow_row_order() {
    let catalog = Arc::new(FakeCatalog::with_variants(vec![variant(1, "A", "10.00", None)]));
    let sheet = Arc::new(FakeSheet::with_rows(vec![
        sheet_row("A", 11.0, None, 2),
        sheet_row("B", 12.5, None, 3),
    ]));
    let ctx = context_with(catalog, sheet).await;

    let mut rx = ctx.service.events().subscribe();
    ctx.service.start_sync(ctx.shop.id, "sheet-1").await.unwrap();

    let mut sequence = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let done = matches!(event, SyncEvent::Complete { .. });
        sequence.push(event);
        if done {
            break;
        }
    }

    let shape: Vec<String> = sequence
        .iter()
        .map(|event| match event {
            SyncEvent::Progress { sku, .. } => format!("progress:{sku}"),
            SyncEvent::Log { entry, .. } => format!("log:{}", entry.sku),
            SyncEvent::Complete { .. } => "complete".to_string(),
            SyncEvent::Error { .. } => "error".to_string(),
        })
        .collect();
    assert_eq!(
        shape,
        vec!["progress:A", "log:A", "progress:B", "log:B", "complete"]
    );
}

#[tokio::test]
async fn test_start_twice_reports_already_running() {
    let catalog = Arc::new(FakeCatalog {
        variants: HashMap::new(),
        lookup_delay: Duration::from_millis(25),
        ..FakeCatalog::default()
    });
    let sheet = Arc::new(FakeSheet::with_rows(vec![
        sheet_row("A", 1.0, None, 2),
        sheet_row("B", 2.0, None, 3),
        sheet_row("C", 3.0, None, 4),
    ]));
    let ctx = context_with(catalog, sheet).await;

    let mut rx = ctx.service.events().subscribe();
    ctx.service.start_sync(ctx.shop.id, "sheet-1").await.unwrap();

    let second = ctx.service.start_sync(ctx.shop.id, "sheet-1").await;
    assert!(matches!(second, Err(Error::AlreadyRunning(_))));

    wait_for_terminal(&mut rx).await;

    // the losing call must not have created a second session
    let sessions = ctx.store.sessions_for_shop(ctx.shop.id, 10).await.unwrap();
    assert_eq!(sessions.len(), 1);
}

#[tokio::test]
async fn test_unknown_shop_is_not_found() {
    // mocks with zero expectations double as "must not be called" guards
    let ctx = context_with(Arc::new(MockCatalogApi::new()), Arc::new(MockSheetApi::new())).await;

    let missing = Uuid::new_v4();
    let result = ctx.service.start_sync(missing, "sheet-1").await;
    assert!(matches!(result, Err(Error::NotFound(_))));
    assert!(ctx
        .store
        .running_session_for_shop(missing)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_row_error_does_not_abort_run() {
    let catalog = Arc::new(FakeCatalog {
        variants: HashMap::from([
            ("A".to_string(), variant(1, "A", "10.00", None)),
            ("C".to_string(), variant(3, "C", "20.00", None)),
        ]),
        fail_skus: vec!["B".to_string()],
        ..FakeCatalog::default()
    });
    let sheet = Arc::new(FakeSheet::with_rows(vec![
        sheet_row("A", 11.0, None, 2),
        sheet_row("B", 12.5, None, 3),
        sheet_row("C", 22.0, None, 4),
    ]));
    let ctx = context_with(catalog, sheet).await;

    let mut rx = ctx.service.events().subscribe();
    let session_id = ctx.service.start_sync(ctx.shop.id, "sheet-1").await.unwrap();
    wait_for_terminal(&mut rx).await;

    let session = ctx.store.get_session(session_id).await.unwrap();
    assert_eq!(session.status, SyncStatus::Completed);
    assert_eq!(session.processed_rows, 3);
    assert_eq!(session.updated_count, 2);
    assert_eq!(session.error_count, 1);

    let logs = ctx.store.logs_for_session(session_id).await.unwrap();
    assert_eq!(logs[1].outcome, LogOutcome::Error);
    assert!(logs[1].message.as_deref().unwrap().contains("500"));
}

#[tokio::test]
async fn test_stop_finalizes_as_stopped() {
    let rows: Vec<SheetRow> = (0u32..20)
        .map(|i| sheet_row(&format!("SKU-{i}"), 1.0 + f64::from(i), None, i + 2))
        .collect();
    let catalog = Arc::new(FakeCatalog {
        variants: HashMap::new(),
        lookup_delay: Duration::from_millis(25),
        ..FakeCatalog::default()
    });
    let sheet = Arc::new(FakeSheet::with_rows(rows));
    let ctx = context_with(catalog, sheet).await;

    let mut rx = ctx.service.events().subscribe();
    let session_id = ctx.service.start_sync(ctx.shop.id, "sheet-1").await.unwrap();

    // let at least one row complete before asking for the stop
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        if matches!(event, SyncEvent::Log { .. }) {
            break;
        }
    }
    ctx.service.stop_sync(ctx.shop.id).await.unwrap();

    let terminal = wait_for_terminal(&mut rx).await;
    match terminal {
        SyncEvent::Complete { status, .. } => assert_eq!(status, Some(SyncStatus::Stopped)),
        other => panic!("expected complete event, got {other:?}"),
    }

    let session = ctx.store.get_session(session_id).await.unwrap();
    assert_eq!(session.status, SyncStatus::Stopped);
    assert!(session.processed_rows >= 1);
    assert!(session.processed_rows < session.total_rows);
    assert!(session.completed_at.is_some());

    // nothing was appended after the stop was observed
    let logs = ctx.store.logs_for_session(session_id).await.unwrap();
    assert_eq!(logs.len() as i64, session.processed_rows);
}

#[tokio::test]
async fn test_setup_failure_finalizes_as_failed() {
    let catalog = Arc::new(FakeCatalog::default());
    let sheet = Arc::new(FakeSheet {
        fail_read: true,
        ..FakeSheet::default()
    });
    let ctx = context_with(catalog, sheet).await;

    let mut rx = ctx.service.events().subscribe();
    let session_id = ctx.service.start_sync(ctx.shop.id, "sheet-1").await.unwrap();

    let terminal = wait_for_terminal(&mut rx).await;
    match terminal {
        SyncEvent::Error { session_id: event_session, message, .. } => {
            assert_eq!(event_session, Some(session_id));
            assert!(message.contains("403"));
        }
        other => panic!("expected error event, got {other:?}"),
    }

    let session = ctx.store.get_session(session_id).await.unwrap();
    assert_eq!(session.status, SyncStatus::Failed);
    assert!(ctx.store.logs_for_session(session_id).await.unwrap().is_empty());

    // the registry slot was released even though the run blew up
    let retry = ctx.service.start_sync(ctx.shop.id, "sheet-1").await;
    assert!(retry.is_ok());
    wait_for_terminal(&mut rx).await;
}

#[tokio::test]
async fn test_write_back_failure_is_ignored() {
    let catalog = Arc::new(FakeCatalog::with_variants(vec![variant(1, "A", "10.00", None)]));
    let sheet = Arc::new(FakeSheet {
        rows: vec![sheet_row("A", 11.0, None, 2)],
        fail_writeback: true,
        ..FakeSheet::default()
    });
    let ctx = context_with(catalog, sheet).await;

    let mut rx = ctx.service.events().subscribe();
    let session_id = ctx.service.start_sync(ctx.shop.id, "sheet-1").await.unwrap();
    wait_for_terminal(&mut rx).await;

    let session = ctx.store.get_session(session_id).await.unwrap();
    assert_eq!(session.status, SyncStatus::Completed);
    assert_eq!(session.updated_count, 1);
    assert_eq!(session.error_count, 0);

    let logs = ctx.store.logs_for_session(session_id).await.unwrap();
    assert_eq!(logs[0].outcome, LogOutcome::Success);
}

#[tokio::test]
async fn test_clear_session_broadcasts_reset_when_idle() {
    let ctx = context_with(Arc::new(MockCatalogApi::new()), Arc::new(MockSheetApi::new())).await;

    let mut rx = ctx.service.events().subscribe();
    ctx.service.clear_session(ctx.shop.id).await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    match event {
        SyncEvent::Complete { shop_id, session_id, status } => {
            assert_eq!(shop_id, ctx.shop.id);
            assert!(session_id.is_none());
            assert!(status.is_none());
        }
        other => panic!("expected complete event, got {other:?}"),
    }
}

#[tokio::test]
async fn test_status_snapshot_while_running() {
    let catalog = Arc::new(FakeCatalog {
        variants: HashMap::new(),
        lookup_delay: Duration::from_millis(25),
        ..FakeCatalog::default()
    });
    let sheet = Arc::new(FakeSheet::with_rows(vec![
        sheet_row("A", 1.0, None, 2),
        sheet_row("B", 2.0, None, 3),
    ]));
    let ctx = context_with(catalog, sheet).await;

    let mut rx = ctx.service.events().subscribe();
    let session_id = ctx.service.start_sync(ctx.shop.id, "sheet-1").await.unwrap();

    // wait until the loop is demonstrably inside the row phase
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        if matches!(event, SyncEvent::Progress { .. }) {
            break;
        }
    }

    let status = ctx.service.get_sync_status(ctx.shop.id).await.unwrap();
    let snapshot = status.expect("a running session should be visible");
    assert_eq!(snapshot.id, session_id);
    assert_eq!(snapshot.status, SyncStatus::Running);

    wait_for_terminal(&mut rx).await;
}
