//! Per-run reconciliation loop
//!
//! One runner per launched session, executing in a detached task. Rows are
//! processed strictly in sheet order, one at a time; a stop request is
//! observed at row boundaries only, so an update already issued for the
//! current row completes even after the request arrives.

use crate::error::Result;
use crate::event_bus::{EventBus, SyncEvent};
use crate::registry::RunRegistry;
use crate::store::SyncStore;
use crate::types::{LogOutcome, Shop, SyncLog, SyncStatus};
use pricesync_clients::traits::{CatalogApi, SheetApi};
use pricesync_clients::types::SheetRow;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Running totals for one session. `updated + not_found + errors` equals
/// `processed` after every row.
#[derive(Debug, Default, Clone, Copy)]
struct RunCounters {
    processed: i64,
    updated: i64,
    not_found: i64,
    errors: i64,
}

impl RunCounters {
    fn bucket(&mut self, outcome: LogOutcome) {
        self.processed += 1;
        match outcome {
            LogOutcome::Success => self.updated += 1,
            LogOutcome::NotFound => self.not_found += 1,
            LogOutcome::Error => self.errors += 1,
        }
    }
}

pub(super) struct SyncRunner {
    store: Arc<SyncStore>,
    registry: RunRegistry,
    events: EventBus,
    row_delay: Duration,
    shop: Shop,
    session_id: Uuid,
    sheet_id: String,
    catalog: Arc<dyn CatalogApi>,
    sheet: Arc<dyn SheetApi>,
}

impl SyncRunner {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        store: Arc<SyncStore>,
        registry: RunRegistry,
        events: EventBus,
        row_delay: Duration,
        shop: Shop,
        session_id: Uuid,
        sheet_id: String,
        catalog: Arc<dyn CatalogApi>,
        sheet: Arc<dyn SheetApi>,
    ) -> Self {
        Self {
            store,
            registry,
            events,
            row_delay,
            shop,
            session_id,
            sheet_id,
            catalog,
            sheet,
        }
    }

    /// Drive the run to a terminal state.
    ///
    /// The registry slot is released in the final step no matter which
    /// branch finished the run, so a stuck flag cannot survive the loop.
    pub(super) async fn run(self) {
        let shop_id = self.shop.id;
        match self.reconcile().await {
            Ok(status) => {
                info!(%shop_id, session_id = %self.session_id, %status, "sync run finished");
                self.events.publish(SyncEvent::Complete {
                    shop_id,
                    session_id: Some(self.session_id),
                    status: Some(status),
                });
            }
            Err(e) => {
                error!(%shop_id, session_id = %self.session_id, error = %e, "sync run failed");
                if let Err(db_err) = self
                    .store
                    .finalize_session(self.session_id, SyncStatus::Failed)
                    .await
                {
                    error!(session_id = %self.session_id, error = %db_err, "failed to record failed session");
                }
                self.events.publish(SyncEvent::Error {
                    shop_id,
                    session_id: Some(self.session_id),
                    message: e.to_string(),
                });
            }
        }
        self.registry.release(shop_id).await;
    }

    async fn reconcile(&self) -> Result<SyncStatus> {
        let shop_id = self.shop.id;

        self.sheet
            .ensure_tracking_header(&self.sheet_id, &self.shop.sheet_name)
            .await?;

        let rows = self
            .sheet
            .read_rows(&self.sheet_id, &self.shop.sheet_name)
            .await?;
        let total = rows.len() as i64;
        self.store.set_session_total(self.session_id, total).await?;
        info!(%shop_id, session_id = %self.session_id, total, "sheet loaded, reconciling rows");

        let mut counters = RunCounters::default();
        for row in rows {
            if !self.registry.is_running(shop_id).await {
                info!(
                    %shop_id,
                    session_id = %self.session_id,
                    processed = counters.processed,
                    "stop observed at row boundary"
                );
                break;
            }

            self.events.publish(SyncEvent::Progress {
                shop_id,
                session_id: self.session_id,
                sku: row.sku.clone(),
                processed: counters.processed,
                total,
            });

            let entry = self.process_row(&row).await;
            counters.bucket(entry.outcome);
            self.store.insert_log(&entry).await?;
            self.store
                .update_session_counts(
                    self.session_id,
                    counters.processed,
                    counters.updated,
                    counters.not_found,
                    counters.errors,
                )
                .await?;
            self.events.publish(SyncEvent::Log {
                shop_id,
                session_id: self.session_id,
                entry,
            });

            tokio::time::sleep(self.row_delay).await;
        }

        let status = if self.registry.is_running(shop_id).await {
            SyncStatus::Completed
        } else {
            SyncStatus::Stopped
        };
        self.store.finalize_session(self.session_id, status).await?;
        Ok(status)
    }

    /// Reconcile one row. Errors from the catalog step are downgraded to
    /// an `error` log entry and never abort the run; the sheet write-back
    /// is best-effort only.
    async fn process_row(&self, row: &SheetRow) -> SyncLog {
        match self.catalog.find_variant_by_sku(&row.sku).await {
            Ok(Some(variant)) => {
                let old_price = variant.price_value();
                let old_compare = variant.compare_at_value();
                match self
                    .catalog
                    .update_variant_price(variant.id, row.price, row.compare_at_price)
                    .await
                {
                    Ok(updated) => {
                        if let Err(e) = self
                            .sheet
                            .write_variant_id(
                                &self.sheet_id,
                                &self.shop.sheet_name,
                                row.row_number,
                                variant.id,
                            )
                            .await
                        {
                            // losing the link degrades a convenience
                            // feature, not the committed price update
                            warn!(
                                sku = %row.sku,
                                row = row.row_number,
                                error = %e,
                                "variant id write-back failed"
                            );
                        }
                        SyncLog::success(
                            self.session_id,
                            &row.sku,
                            old_price,
                            updated.price_value().unwrap_or(row.price),
                            old_compare,
                            updated.compare_at_value(),
                            variant.id,
                        )
                    }
                    Err(e) => SyncLog::error(self.session_id, &row.sku, e.to_string()),
                }
            }
            Ok(None) => {
                SyncLog::not_found(self.session_id, &row.sku, row.price, row.compare_at_price)
            }
            Err(e) => SyncLog::error(self.session_id, &row.sku, e.to_string()),
        }
    }
}
