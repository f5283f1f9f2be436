use bank_payment_engine::{
    events::{EventHandlers, EventHooks},
    notifications::{BroadcastEvent, BroadcastRegistry},
};
use log::*;

/// Wires order-paid events into the broadcast registry.
///
/// Each paid order is announced to its owner's streams, if the order has an owner, and to every admin stream. Clients
/// whose stream has gone away are dropped from the registry as a side effect.
pub fn create_notification_event_handlers(registry: BroadcastRegistry, buffer_size: usize) -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_order_paid(move |ev| {
        let registry = registry.clone();
        Box::pin(async move {
            for event in BroadcastEvent::for_order_paid(&ev) {
                let report = registry.broadcast(&event);
                debug!(
                    "📡️ Order {} paid. Notified {} {} client(s), dropped {}",
                    ev.order.order_id, report.delivered, event.target, report.dropped
                );
            }
        })
    });
    EventHandlers::new(buffer_size, hooks)
}
