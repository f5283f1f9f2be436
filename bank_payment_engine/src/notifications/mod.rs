//! # Notification broadcast registry
//!
//! An in-memory directory of connected streaming clients. Each client is registered under an ephemeral connection id
//! with a [`ClientScope`], either a specific user or the admin scope, and a [`ClientSink`] that writes to its stream.
//!
//! The registry is process-local and not a source of truth. Clients that lose their connection simply reconnect and
//! register again. A client whose sink fails on write is removed on the spot.
mod notification;
mod registry;
mod sink;

pub use notification::{BroadcastEvent, ClientScope, Notification};
pub use registry::{new_connection_id, BroadcastRegistry, BroadcastReport};
pub use sink::{ChannelSink, ClientSink, SinkError};
