use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::notifications::Notification;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SinkError {
    #[error("The client stream has been closed")]
    Closed,
    #[error("The client is not keeping up with its stream")]
    Full,
}

/// A write handle to a client's open stream.
///
/// `deliver` must not block. It is called while the registry lock is held.
pub trait ClientSink: Send + Sync {
    fn deliver(&self, notification: &Notification) -> Result<(), SinkError>;
}

/// A sink that feeds a bounded channel. The receiving end is turned into the client's response stream.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<Notification>,
}

impl ChannelSink {
    pub fn new(buffer_size: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        (Self { sender }, receiver)
    }
}

impl ClientSink for ChannelSink {
    fn deliver(&self, notification: &Notification) -> Result<(), SinkError> {
        self.sender.try_send(notification.clone()).map_err(|e| match e {
            TrySendError::Full(_) => SinkError::Full,
            TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}
