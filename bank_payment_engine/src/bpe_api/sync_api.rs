use std::fmt::Debug;

use log::*;
use serde::Serialize;

use crate::{
    bpe_api::{
        errors::PaymentGatewayError,
        settlement_api::SettlementApi,
        settlement_objects::{IncomingTransfer, SettlementOutcome},
    },
    db::traits::PaymentGatewayDatabase,
    db_types::OrderId,
};

/// A transaction as reported by a gateway, which can be turned into an [`IncomingTransfer`].
pub trait IntoIncomingTransfer {
    fn gateway_transaction_id(&self) -> String;

    fn try_into_transfer(self) -> Result<IncomingTransfer, PaymentGatewayError>;
}

impl IntoIncomingTransfer for IncomingTransfer {
    fn gateway_transaction_id(&self) -> String {
        self.gateway_transaction_id.clone()
    }

    fn try_into_transfer(self) -> Result<IncomingTransfer, PaymentGatewayError> {
        Ok(self)
    }
}

/// Somewhere recent bank transactions can be pulled from.
#[allow(async_fn_in_trait)]
pub trait TransactionSource {
    type Transaction: IntoIncomingTransfer;
    type Error: std::error::Error;

    /// Fetches up to `limit` of the most recent transactions.
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<Self::Transaction>, Self::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncItemError {
    pub gateway_transaction_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Transactions returned by the gateway
    pub fetched: usize,
    /// Transactions that were run through settlement without error
    pub processed: usize,
    /// Orders paid during this sync
    pub settled: Vec<OrderId>,
    pub ignored: usize,
    pub ambiguous: usize,
    pub errors: Vec<SyncItemError>,
}

impl SyncReport {
    fn record(&mut self, outcome: &SettlementOutcome) {
        self.processed += 1;
        match outcome {
            SettlementOutcome::Matched { order, .. } => self.settled.push(order.order_id.clone()),
            SettlementOutcome::Ignored(_) => self.ignored += 1,
            SettlementOutcome::Ambiguous { .. } => self.ambiguous += 1,
        }
    }

    fn record_error(&mut self, gateway_transaction_id: String, error: PaymentGatewayError) {
        warn!("🔄️📥️ Could not process transaction {gateway_transaction_id}. {error}");
        self.errors.push(SyncItemError { gateway_transaction_id, error: error.to_string() });
    }
}

/// Pulls recent transactions from a [`TransactionSource`] and runs each of them through settlement.
///
/// Transactions are settled one after the other. A failure on one transaction is recorded in the report and the
/// batch carries on. Running a sync while webhooks are arriving is safe, because settlement is atomic per transfer.
pub struct SyncApi<B, S> {
    settlement: SettlementApi<B>,
    source: S,
}

impl<B, S> Debug for SyncApi<B, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SyncApi")
    }
}

impl<B, S> SyncApi<B, S> {
    pub fn new(settlement: SettlementApi<B>, source: S) -> Self {
        Self { settlement, source }
    }
}

impl<B, S> SyncApi<B, S>
where
    B: PaymentGatewayDatabase,
    S: TransactionSource,
{
    /// Fetches up to `limit` recent transactions and settles each of them. If the fetch itself fails, nothing is
    /// settled and `UpstreamUnavailable` is returned.
    pub async fn sync_recent(&self, limit: usize) -> Result<SyncReport, PaymentGatewayError> {
        debug!("🔄️📥️ Fetching up to {limit} recent transactions");
        let transactions = self.source.fetch_recent(limit).await.map_err(|e| {
            warn!("🔄️📥️ Could not fetch recent transactions. {e}");
            PaymentGatewayError::UpstreamUnavailable(e.to_string())
        })?;
        let mut report = SyncReport { fetched: transactions.len(), ..Default::default() };
        for tx in transactions {
            let txid = tx.gateway_transaction_id();
            let transfer = match tx.try_into_transfer() {
                Ok(t) => t,
                Err(e) => {
                    report.record_error(txid, e);
                    continue;
                },
            };
            match self.settlement.settle(transfer).await {
                Ok(outcome) => {
                    trace!("🔄️📥️ Transaction {txid}: {outcome}");
                    report.record(&outcome);
                },
                Err(e) => report.record_error(txid, e),
            }
        }
        info!(
            "🔄️📥️ Sync complete. {} fetched, {} processed, {} settled, {} ignored, {} ambiguous, {} errors",
            report.fetched,
            report.processed,
            report.settled.len(),
            report.ignored,
            report.ambiguous,
            report.errors.len()
        );
        Ok(report)
    }
}
