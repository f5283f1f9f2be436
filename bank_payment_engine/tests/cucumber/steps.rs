use std::time::Duration;

use bank_payment_engine::{
    db_types::{Amount, NewOrder, OrderId, PaymentStatus},
    notifications::{ClientScope, Notification},
    settlement_objects::{IgnoreReason, IncomingTransfer, MatchMethod, SettlementOutcome, TransferDirection},
    OrderManagement,
    PaymentGatewayDatabase,
};
use cucumber::{given, then, when};

use crate::cucumber::SettlementWorld;

#[given(expr = "an unpaid order {word} for {int} VND")]
async fn guest_order(world: &mut SettlementWorld, order_id: String, amount: i64) {
    let order = NewOrder::new(OrderId::from(order_id), Amount::from(amount));
    world.system().db.insert_order(order).await.expect("Error inserting order");
}

#[given(expr = "an unpaid order {word} for {int} VND placed by '{word}'")]
async fn user_order(world: &mut SettlementWorld, order_id: String, amount: i64, user_id: String) {
    let order = NewOrder::new(OrderId::from(order_id), Amount::from(amount)).with_user(user_id);
    world.system().db.insert_order(order).await.expect("Error inserting order");
}

#[given(expr = "user '{word}' is listening for notifications on connection {word}")]
async fn user_listens(world: &mut SettlementWorld, user_id: String, connection_id: String) {
    world.connect_client(&connection_id, ClientScope::User(user_id));
}

#[given(expr = "an admin is listening for notifications on connection {word}")]
async fn admin_listens(world: &mut SettlementWorld, connection_id: String) {
    world.connect_client(&connection_id, ClientScope::Admin);
}

#[given(expr = "connection {word} has gone away")]
async fn connection_gone(world: &mut SettlementWorld, connection_id: String) {
    world.disconnect_client(&connection_id);
}

#[when(expr = "the gateway reports an incoming transfer {word} of {int} VND with content {string}")]
async fn incoming_transfer(world: &mut SettlementWorld, code: String, amount: i64, content: String) {
    report_transfer(world, code, amount, content, TransferDirection::In).await;
}

#[when(expr = "the gateway reports an outgoing transfer {word} of {int} VND with content {string}")]
async fn outgoing_transfer(world: &mut SettlementWorld, code: String, amount: i64, content: String) {
    report_transfer(world, code, amount, content, TransferDirection::Out).await;
}

async fn report_transfer(
    world: &mut SettlementWorld,
    code: String,
    amount: i64,
    content: String,
    direction: TransferDirection,
) {
    let transfer = IncomingTransfer::incoming(format!("gw-{code}"), Amount::from(amount), content, code)
        .with_direction(direction);
    let outcome = world.api().settle(transfer).await.expect("Settlement failed");
    world.last_outcome = Some(outcome);
}

#[when(expr = "I pause for {int}ms")]
async fn pause(_world: &mut SettlementWorld, ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

fn last_outcome(world: &SettlementWorld) -> &SettlementOutcome {
    world.last_outcome.as_ref().expect("No transfer has been reported yet")
}

#[then(expr = "order {word} is settled by its payment reference")]
async fn settled_by_reference(world: &mut SettlementWorld, order_id: String) {
    check_matched(world, &order_id, MatchMethod::Reference);
}

#[then(expr = "order {word} is settled by its amount")]
async fn settled_by_amount(world: &mut SettlementWorld, order_id: String) {
    check_matched(world, &order_id, MatchMethod::Amount);
}

fn check_matched(world: &SettlementWorld, order_id: &str, method: MatchMethod) {
    match last_outcome(world) {
        SettlementOutcome::Matched { order, matched_by } => {
            assert_eq!(order.order_id.as_str(), order_id);
            assert_eq!(*matched_by, method);
        },
        other => panic!("Expected order {order_id} to be settled, but got: {other}"),
    }
}

#[then(expr = "the transfer is ignored because it is {string}")]
async fn transfer_ignored(world: &mut SettlementWorld, reason: String) {
    match last_outcome(world) {
        SettlementOutcome::Ignored(r) => assert_eq!(r.to_string(), reason),
        other => panic!("Expected the transfer to be ignored, but got: {other}"),
    }
}

#[then("the transfer is ignored because of an amount mismatch")]
async fn amount_mismatch(world: &mut SettlementWorld) {
    let outcome = last_outcome(world);
    assert!(matches!(outcome, SettlementOutcome::Ignored(IgnoreReason::AmountMismatch { .. })), "{outcome}");
}

#[then(expr = "the transfer is ambiguous between {int} orders")]
async fn transfer_ambiguous(world: &mut SettlementWorld, count: usize) {
    match last_outcome(world) {
        SettlementOutcome::Ambiguous { candidates } => assert_eq!(candidates.len(), count),
        other => panic!("Expected an ambiguous outcome, but got: {other}"),
    }
}

#[then(expr = "order {word} has payment status {word}")]
async fn check_status(world: &mut SettlementWorld, order_id: String, status: String) {
    let expected = status.parse::<PaymentStatus>().expect("Not a valid payment status");
    let order = world
        .system()
        .db
        .order_by_id(&OrderId::from(order_id.clone()))
        .await
        .expect("Error fetching order")
        .unwrap_or_else(|| panic!("Order {order_id} does not exist"));
    assert_eq!(order.payment_status, expected);
}

#[then(expr = "order {word} has {int} settlement record(s)")]
async fn check_settlements(world: &mut SettlementWorld, order_id: String, count: usize) {
    let records =
        world.system().db.settlements_for_order(&OrderId::from(order_id)).await.expect("Error fetching settlements");
    assert_eq!(records.len(), count);
}

#[then(expr = "connection {word} receives an ORDER_PAID notification for {word}")]
async fn receives_notification(world: &mut SettlementWorld, connection_id: String, order_id: String) {
    let receiver = world.clients.get(&connection_id).expect("Unknown connection").clone();
    let mut receiver = receiver.lock().await;
    let notification = tokio::time::timeout(Duration::from_secs(2), receiver.recv())
        .await
        .expect("Timed out waiting for a notification")
        .expect("The notification stream was closed");
    match notification {
        Notification::OrderPaid { order_id: id, payment_status, .. } => {
            assert_eq!(id.as_str(), order_id);
            assert_eq!(payment_status, PaymentStatus::Paid);
        },
        other => panic!("Unexpected notification: {other:?}"),
    }
}

#[then(expr = "connection {word} receives nothing")]
async fn receives_nothing(world: &mut SettlementWorld, connection_id: String) {
    let receiver = world.clients.get(&connection_id).expect("Unknown connection").clone();
    let mut receiver = receiver.lock().await;
    assert!(receiver.try_recv().is_err(), "Connection {connection_id} received a notification");
}

#[then(expr = "connection {word} is no longer registered")]
async fn unregistered(world: &mut SettlementWorld, connection_id: String) {
    assert!(!world.system().registry.is_registered(&connection_id));
}
