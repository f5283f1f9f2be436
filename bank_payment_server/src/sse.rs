//! Server-sent event streams for notifications.
//!
//! Every stream is backed by a [`ChannelSink`] registered with the [`BroadcastRegistry`]. The receiving end of the
//! channel becomes the response body, one `data: <json>\n\n` frame per notification.
//!
//! A stream leaves the registry in one of three ways:
//! * the response body is dropped because the client went away ([`RegistrationGuard`]),
//! * a broadcast cannot write to its channel,
//! * the keep-alive heartbeat cannot write to its channel.
use std::time::Duration;

use bank_payment_engine::notifications::{
    new_connection_id,
    BroadcastRegistry,
    ChannelSink,
    ClientScope,
    Notification,
};
use bytes::Bytes;
use futures::{stream, Stream};
use log::*;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::errors::ServerError;

/// Notifications queued per client before the client is considered too slow and dropped.
pub const CLIENT_BUFFER_SIZE: usize = 32;

/// Removes a connection from the registry when dropped.
pub struct RegistrationGuard {
    registry: BroadcastRegistry,
    connection_id: String,
}

impl RegistrationGuard {
    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        if self.registry.unregister(&self.connection_id) {
            debug!("📡️ Stream {} closed", self.connection_id);
        }
    }
}

pub fn encode_frame(notification: &Notification) -> Result<Bytes, ServerError> {
    let json = serde_json::to_string(notification)
        .map_err(|e| ServerError::Unspecified(format!("Could not serialize notification. {e}")))?;
    Ok(Bytes::from(format!("data: {json}\n\n")))
}

/// Registers a new streaming client under `scope` and returns its connection id with the response body stream.
///
/// The first frame on the stream is always `CONNECTED`. After that, a `HEARTBEAT` goes out every `keep_alive`.
pub fn open_notification_stream(
    registry: &BroadcastRegistry,
    scope: ClientScope,
    keep_alive: Duration,
) -> (String, impl Stream<Item = Result<Bytes, ServerError>> + 'static) {
    let connection_id = new_connection_id();
    let (sink, receiver) = ChannelSink::new(CLIENT_BUFFER_SIZE);
    if registry.register(connection_id.clone(), scope.clone(), Box::new(sink)) {
        warn!("📡️ Connection id {connection_id} was already registered. The old stream has been replaced.");
    }
    info!("📡️ Stream {connection_id} opened for {scope}");
    registry.send_to(&connection_id, &Notification::Connected { connection_id: connection_id.clone() });
    start_keep_alive(registry.clone(), connection_id.clone(), keep_alive);
    let guard = RegistrationGuard { registry: registry.clone(), connection_id: connection_id.clone() };
    (connection_id, frames(receiver, guard))
}

fn frames(
    receiver: mpsc::Receiver<Notification>,
    guard: RegistrationGuard,
) -> impl Stream<Item = Result<Bytes, ServerError>> + 'static {
    stream::unfold((receiver, guard), |(mut receiver, guard)| async move {
        let notification = receiver.recv().await?;
        trace!("📡️ Sending {notification:?} to {}", guard.connection_id());
        Some((encode_frame(&notification), (receiver, guard)))
    })
}

/// Sends heartbeats until the client is no longer registered.
fn start_keep_alive(registry: BroadcastRegistry, connection_id: String, keep_alive: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(keep_alive);
        // The first tick completes immediately
        timer.tick().await;
        loop {
            timer.tick().await;
            if !registry.send_to(&connection_id, &Notification::heartbeat()) {
                trace!("📡️ Stopping heartbeats for {connection_id}");
                break;
            }
        }
    })
}

#[cfg(test)]
mod test {
    use bank_payment_engine::{
        db_types::{Amount, OrderId, PaymentStatus},
        notifications::BroadcastEvent,
    };
    use futures::StreamExt;

    use super::*;

    fn frame_json(frame: Bytes) -> serde_json::Value {
        let s = String::from_utf8(frame.to_vec()).unwrap();
        assert!(s.starts_with("data: ") && s.ends_with("\n\n"), "bad frame: {s:?}");
        serde_json::from_str(s.trim_start_matches("data: ").trim_end()).unwrap()
    }

    #[tokio::test]
    async fn stream_lifecycle() {
        let registry = BroadcastRegistry::new();
        let scope = ClientScope::User("alice".into());
        let (id, stream) = open_notification_stream(&registry, scope.clone(), Duration::from_secs(60));
        let mut stream = Box::pin(stream);
        assert!(registry.is_registered(&id));

        let connected = frame_json(stream.next().await.unwrap().unwrap());
        assert_eq!(connected["type"], "CONNECTED");
        assert_eq!(connected["connection_id"], id.as_str());

        let paid = Notification::OrderPaid {
            order_id: OrderId::from("ORD-7"),
            payment_status: PaymentStatus::Paid,
            amount: Amount::from(100_000),
            transaction_code: "FT123".into(),
        };
        let report = registry.broadcast(&BroadcastEvent::new(scope, paid));
        assert_eq!(report.delivered, 1);
        let frame = frame_json(stream.next().await.unwrap().unwrap());
        assert_eq!(frame["type"], "ORDER_PAID");
        assert_eq!(frame["order_id"], "ORD-7");

        drop(stream);
        assert!(!registry.is_registered(&id));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn heartbeats_are_sent() {
        let registry = BroadcastRegistry::new();
        let (_id, stream) = open_notification_stream(&registry, ClientScope::Admin, Duration::from_millis(20));
        let mut stream = Box::pin(stream);
        let _connected = stream.next().await.unwrap().unwrap();
        let heartbeat = frame_json(stream.next().await.unwrap().unwrap());
        assert_eq!(heartbeat["type"], "HEARTBEAT");
    }
}
