use std::{collections::HashMap, sync::Arc};

use log::*;
use parking_lot::Mutex;
use serde::Serialize;

use crate::notifications::{BroadcastEvent, ClientScope, ClientSink, Notification};

struct BroadcastClient {
    scope: ClientScope,
    sink: Box<dyn ClientSink>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    /// Clients in the target scope that accepted the notification.
    pub delivered: usize,
    /// Clients in the target scope whose sink failed. They have been unregistered.
    pub dropped: usize,
}

/// A fresh, random connection id.
pub fn new_connection_id() -> String {
    format!("{:016x}", rand::random::<u64>())
}

/// The directory of connected streaming clients.
///
/// Cloning is cheap and every clone refers to the same directory. All access goes through a single mutex. Sinks never
/// block, so the lock is only ever held for the duration of a map operation plus a round of non-blocking writes.
#[derive(Clone, Default)]
pub struct BroadcastRegistry {
    clients: Arc<Mutex<HashMap<String, BroadcastClient>>>,
}

impl BroadcastRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a client to the directory. If the connection id is already registered, the old entry is replaced and
    /// `true` is returned.
    pub fn register<S: Into<String>>(&self, connection_id: S, scope: ClientScope, sink: Box<dyn ClientSink>) -> bool {
        let connection_id = connection_id.into();
        debug!("📡️ Registering client {connection_id} ({scope})");
        let previous = self.clients.lock().insert(connection_id, BroadcastClient { scope, sink });
        previous.is_some()
    }

    /// Removes a client. Returns whether the client was registered. Calling this for an unknown id is harmless.
    pub fn unregister(&self, connection_id: &str) -> bool {
        let removed = self.clients.lock().remove(connection_id).is_some();
        if removed {
            debug!("📡️ Client {connection_id} unregistered");
        }
        removed
    }

    /// Delivers the notification to every client registered in the target scope. A client whose sink fails is
    /// unregistered. Other clients are unaffected.
    pub fn broadcast(&self, event: &BroadcastEvent) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut clients = self.clients.lock();
        let mut dead = Vec::new();
        for (id, client) in clients.iter().filter(|(_, c)| c.scope == event.target) {
            match client.sink.deliver(&event.notification) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    info!("📡️ Could not deliver to client {id}. {e}. Dropping it.");
                    dead.push(id.clone());
                },
            }
        }
        for id in &dead {
            clients.remove(id);
        }
        report.dropped = dead.len();
        trace!("📡️ Broadcast to {}: {report:?}", event.target);
        report
    }

    /// Delivers a notification to a single client. Returns false if the client is unknown or its sink failed, in
    /// which case it is no longer registered.
    pub fn send_to(&self, connection_id: &str, notification: &Notification) -> bool {
        let mut clients = self.clients.lock();
        let Some(client) = clients.get(connection_id) else {
            return false;
        };
        match client.sink.deliver(notification) {
            Ok(()) => true,
            Err(e) => {
                info!("📡️ Could not deliver to client {connection_id}. {e}. Dropping it.");
                clients.remove(connection_id);
                false
            },
        }
    }

    pub fn is_registered(&self, connection_id: &str) -> bool {
        self.clients.lock().contains_key(connection_id)
    }

    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.lock().is_empty()
    }
}
