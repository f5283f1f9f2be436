//! Simple stateless pub-sub event handler
//!
//! This module provides a simple hook system that lets components of the system subscribe to payment engine events
//! and react to them. The event handler is stateless, i.e. the handlers have no access to the internal state of the
//! engine. All that is received is the event itself.
//!
//! Handlers can be async. The queue between producers and the handler is bounded.
use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
};

use log::*;
use tokio::sync::mpsc::{self, error::TrySendError};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        Self { listener: receiver, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    pub async fn start_handler(mut self) {
        debug!("📬️ Starting event handler");
        // drop the internal sender so that when the last subscriber is dropped, we can automatically shut down the
        // handler
        drop(self.sender);
        let jobs = Arc::new(AtomicI64::new(0));
        while let Some(ev) = self.listener.recv().await {
            trace!("📬️ Handling event");
            let handler = Arc::clone(&self.handler);
            jobs.fetch_add(1, Ordering::SeqCst);
            let job = jobs.clone();
            tokio::spawn(async move {
                (handler)(ev).await;
                job.fetch_sub(1, Ordering::SeqCst);
                trace!("📬️ Event handled");
            });
        }
        while jobs.load(Ordering::SeqCst) > 0 {
            debug!("📬️ Waiting for jobs to complete");
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        }
        debug!("📬️ Event handler has shut down");
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Failed to send event: {e}");
        }
    }

    /// Queues the event without waiting. Returns false, and drops the event, if the queue is full or closed.
    pub fn try_publish_event(&self, event: E) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("📬️ Event queue is full. The event has been dropped.");
                false
            },
            Err(TrySendError::Closed(_)) => {
                warn!("📬️ Event handler has shut down. The event has been dropped.");
                false
            },
        }
    }
}
