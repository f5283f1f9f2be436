//! Glue between the SePay client and the settlement engine.
//!
//! SePay reports the same transfer in two shapes: the webhook payload and the transaction list entry. Both are turned
//! into an [`IncomingTransfer`] here, using the bank's reference code as the deduplication key. Where SePay has no
//! reference code, `SEPAY-<id>` stands in for it, on both paths, so that a transfer seen by the webhook and again by a
//! sync is only ever settled once.
use bank_payment_engine::{
    db_types::Amount,
    settlement_objects::{IncomingTransfer, TransferDirection},
    IntoIncomingTransfer,
    PaymentGatewayError,
    TransactionSource,
};
use log::*;
use sepay_tools::{SepayApi, SepayApiError, SepayTransaction, SepayWebhookPayload, TransferType};

pub fn reference_code_or_fallback(reference_code: Option<&str>, gateway_transaction_id: &str) -> String {
    match reference_code.map(str::trim).filter(|s| !s.is_empty()) {
        Some(code) => code.to_string(),
        None => {
            debug!("🏦️ SePay transaction {gateway_transaction_id} has no reference code. Using the SePay id instead.");
            format!("SEPAY-{gateway_transaction_id}")
        },
    }
}

fn direction(transfer_type: TransferType) -> TransferDirection {
    match transfer_type {
        TransferType::In => TransferDirection::In,
        TransferType::Out => TransferDirection::Out,
    }
}

fn amount(value: i64, gateway_transaction_id: &str) -> Result<Amount, PaymentGatewayError> {
    if value < 0 {
        return Err(PaymentGatewayError::TransferConversionError(format!(
            "SePay transaction {gateway_transaction_id} has a negative amount ({value})"
        )));
    }
    Ok(Amount::from(value))
}

pub fn transfer_from_webhook(payload: SepayWebhookPayload) -> Result<IncomingTransfer, PaymentGatewayError> {
    let reference_code = reference_code_or_fallback(payload.reference_code.as_deref(), &payload.id);
    let amount = amount(payload.transfer_amount, &payload.id)?;
    let transfer = IncomingTransfer::incoming(payload.id, amount, payload.content, reference_code)
        .with_direction(direction(payload.transfer_type));
    Ok(transfer)
}

/// A transaction from the SePay transaction list.
#[derive(Debug, Clone)]
pub struct SepayTransfer(pub SepayTransaction);

impl IntoIncomingTransfer for SepayTransfer {
    fn gateway_transaction_id(&self) -> String {
        self.0.id.clone()
    }

    fn try_into_transfer(self) -> Result<IncomingTransfer, PaymentGatewayError> {
        let tx = self.0;
        let transfer_direction = direction(tx.transfer_type());
        let amount = amount(tx.amount(), &tx.id)?;
        let reference_code = reference_code_or_fallback(tx.reference_number.as_deref(), &tx.id);
        let transfer = IncomingTransfer::incoming(tx.id, amount, tx.transaction_content, reference_code)
            .with_direction(transfer_direction);
        Ok(transfer)
    }
}

/// The SePay transaction list as a [`TransactionSource`] for the sync orchestrator.
#[derive(Clone)]
pub struct SepaySource {
    api: SepayApi,
}

impl SepaySource {
    pub fn new(api: SepayApi) -> Self {
        Self { api }
    }
}

impl TransactionSource for SepaySource {
    type Error = SepayApiError;
    type Transaction = SepayTransfer;

    async fn fetch_recent(&self, limit: usize) -> Result<Vec<Self::Transaction>, Self::Error> {
        let transactions = self.api.fetch_transactions(limit).await?;
        trace!("🏦️ SePay returned {} transactions", transactions.len());
        Ok(transactions.into_iter().map(SepayTransfer).collect())
    }
}
