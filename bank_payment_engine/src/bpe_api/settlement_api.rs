use std::fmt::Debug;

use log::*;

use crate::{
    bpe_api::{
        errors::PaymentGatewayError,
        settlement_objects::{IgnoreReason, IncomingTransfer, MatchMethod, SettlementOutcome, TransferDirection},
    },
    db::traits::{OrderQueryFilter, PaymentGatewayDatabase, SettleOrderResult},
    db_types::{NewSettlement, Order, PaymentStatus},
    events::{EventProducers, OrderPaidEvent},
    helpers::{InvalidReferencePrefix, ReferenceMatcher},
};

pub const DEFAULT_AMOUNT_TOLERANCE: u64 = 1_000;

#[derive(Debug, Clone)]
pub struct SettlementConfig {
    pub matcher: ReferenceMatcher,
    /// The largest accepted difference between an order's total and the amount received, in minor units.
    pub amount_tolerance: u64,
}

impl SettlementConfig {
    pub fn new(reference_prefix: &str, amount_tolerance: u64) -> Result<Self, InvalidReferencePrefix> {
        let matcher = ReferenceMatcher::new(reference_prefix)?;
        Ok(Self { matcher, amount_tolerance })
    }
}

enum Candidate {
    One(Order, MatchMethod),
    Many(Vec<Order>),
    None,
}

/// `SettlementApi` decides whether an incoming bank transfer pays for an order and, if it does, records the payment.
///
/// See [`SettlementApi::settle`] for the matching rules.
#[derive(Clone)]
pub struct SettlementApi<B> {
    db: B,
    config: SettlementConfig,
    producers: EventProducers,
}

impl<B> Debug for SettlementApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi ({:?})", self.config)
    }
}

impl<B> SettlementApi<B> {
    pub fn new(db: B, config: SettlementConfig, producers: EventProducers) -> Self {
        Self { db, config, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> SettlementApi<B>
where B: PaymentGatewayDatabase
{
    /// Settles an incoming transfer against an unpaid order, exactly once.
    ///
    /// The steps are
    /// 1. Outgoing transfers are ignored.
    /// 2. Transfers whose reference code has already been settled are ignored.
    /// 3. If the narration carries a payment reference, the unpaid order whose id ends with the reference suffix is the
    ///    candidate. Several such orders make the transfer ambiguous. If there are none, matching continues as if there
    ///    had been no reference.
    /// 4. Otherwise the unpaid order whose total equals the transfer amount is the candidate. None means there is no
    ///    candidate, several means the transfer is ambiguous.
    /// 5. The candidate's total must be within the configured tolerance of the amount received. Partial payments are
    ///    not accepted.
    /// 6. The order is marked as paid and the settlement recorded in a single database transaction.
    /// 7. Order-paid subscribers are notified without waiting on them.
    ///
    /// Only infrastructure failures produce an `Err`. Every deliberate refusal is an `Ok` outcome.
    pub async fn settle(&self, transfer: IncomingTransfer) -> Result<SettlementOutcome, PaymentGatewayError> {
        let txid = transfer.gateway_transaction_id.as_str();
        if transfer.direction != TransferDirection::In {
            debug!("🔄️💰️ Transfer {txid} is not incoming. Ignoring it.");
            return Ok(SettlementOutcome::Ignored(IgnoreReason::NotIncoming));
        }
        if transfer.reference_code.trim().is_empty() {
            return Err(PaymentGatewayError::TransferConversionError(format!(
                "Transfer {txid} has no reference code, so it cannot be settled exactly once"
            )));
        }
        if self.db.settlement_exists(&transfer.reference_code).await.map_err(db_error)? {
            debug!("🔄️💰️ Transfer {txid} ({}) has already been processed.", transfer.reference_code);
            return Ok(SettlementOutcome::Ignored(IgnoreReason::AlreadyProcessed));
        }
        let (order, matched_by) = match self.find_candidate(&transfer).await? {
            Candidate::One(order, method) => (order, method),
            Candidate::None => {
                info!("🔄️💰️ No unpaid order matches transfer {txid} of {}.", transfer.amount);
                return Ok(SettlementOutcome::Ignored(IgnoreReason::NoCandidate));
            },
            Candidate::Many(orders) => {
                let candidates = orders.into_iter().map(|o| o.order_id).collect::<Vec<_>>();
                let outcome = SettlementOutcome::Ambiguous { candidates };
                warn!("🔄️💰️ Transfer {txid} of {} needs manual review. {outcome}", transfer.amount);
                return Ok(outcome);
            },
        };
        if order.total_amount.abs_diff(transfer.amount) > self.config.amount_tolerance {
            let reason = IgnoreReason::AmountMismatch { expected: order.total_amount, received: transfer.amount };
            warn!("🔄️💰️ Transfer {txid} looks like a payment for order {}, but {reason}.", order.order_id);
            return Ok(SettlementOutcome::Ignored(reason));
        }
        let settlement = NewSettlement::success(order.order_id.clone(), transfer.reference_code.clone(), transfer.amount)
            .with_description(transfer.narration.clone());
        let result = self.db.settle_order(&order.order_id, settlement).await.map_err(db_error)?;
        match result {
            SettleOrderResult::Settled { order, settlement } => {
                info!(
                    "🔄️💰️ Order {} has been paid by transfer {txid} ({}) of {}",
                    order.order_id, settlement.transaction_code, settlement.amount
                );
                let event = OrderPaidEvent::new(order.clone(), settlement);
                let queued = self.producers.notify_order_paid(event);
                trace!("🔄️💰️ Order paid event queued for {queued} subscribers");
                Ok(SettlementOutcome::Matched { order, matched_by })
            },
            SettleOrderResult::OrderNotUnpaid => {
                info!("🔄️💰️ Order {} was paid before transfer {txid} could settle it.", order.order_id);
                Ok(SettlementOutcome::Ignored(IgnoreReason::OrderAlreadyPaid))
            },
            SettleOrderResult::DuplicateTransaction => {
                debug!("🔄️💰️ Transfer {txid} was settled concurrently.");
                Ok(SettlementOutcome::Ignored(IgnoreReason::AlreadyProcessed))
            },
        }
    }

    async fn find_candidate(&self, transfer: &IncomingTransfer) -> Result<Candidate, PaymentGatewayError> {
        if let Some(suffix) = self.config.matcher.extract_suffix(&transfer.narration) {
            let query = OrderQueryFilter::default().with_order_id_suffix(suffix.as_str()).with_status(PaymentStatus::Unpaid);
            let mut orders = self.db.fetch_orders(query).await.map_err(db_error)?;
            match orders.len() {
                0 => debug!(
                    "🔄️💰️ Reference {}{suffix} does not belong to an unpaid order. Trying to match by amount.",
                    self.config.matcher.prefix()
                ),
                1 => return Ok(Candidate::One(orders.remove(0), MatchMethod::Reference)),
                _ => return Ok(Candidate::Many(orders)),
            }
        }
        let query = OrderQueryFilter::default().with_total_amount(transfer.amount).with_status(PaymentStatus::Unpaid);
        let mut orders = self.db.fetch_orders(query).await.map_err(db_error)?;
        let candidate = match orders.len() {
            0 => Candidate::None,
            1 => Candidate::One(orders.remove(0), MatchMethod::Amount),
            _ => Candidate::Many(orders),
        };
        Ok(candidate)
    }
}

pub(crate) fn db_error<E: std::error::Error>(e: E) -> PaymentGatewayError {
    PaymentGatewayError::DatabaseError(e.to_string())
}
