use std::time::Duration;

use bank_payment_engine::{SqliteDatabase, SyncApi, SyncReport};
use log::*;
use tokio::{task::JoinHandle, time::MissedTickBehavior};

use crate::integrations::sepay::SepaySource;

/// Starts the periodic sync worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Each run pulls the `limit` most recent transactions from SePay and settles them. This catches transfers whose
/// webhook call never arrived. Transfers that were already settled are skipped by the engine.
pub fn start_sync_worker(api: SyncApi<SqliteDatabase, SepaySource>, interval: Duration, limit: usize) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("🕰️ Periodic SePay sync worker started. Interval: {}s, limit: {limit}", interval.as_secs());
        loop {
            timer.tick().await;
            debug!("🕰️ Running periodic SePay sync");
            match api.sync_recent(limit).await {
                Ok(report) => log_report(&report),
                Err(e) => error!("🕰️ Periodic SePay sync failed. {e}"),
            }
        }
    })
}

fn log_report(report: &SyncReport) {
    if report.settled.is_empty() && report.errors.is_empty() {
        debug!("🕰️ Sync complete. {} transactions fetched, nothing new", report.fetched);
        return;
    }
    let settled = report.settled.iter().map(|o| o.to_string()).collect::<Vec<String>>().join(", ");
    info!(
        "🕰️ Sync complete. fetched: {}, processed: {}, ignored: {}, ambiguous: {}, errors: {}. Settled: [{settled}]",
        report.fetched,
        report.processed,
        report.ignored,
        report.ambiguous,
        report.errors.len()
    );
}
