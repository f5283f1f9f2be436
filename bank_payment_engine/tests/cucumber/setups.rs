use bank_payment_engine::{
    events::{EventHandlers, EventHooks},
    notifications::{BroadcastEvent, BroadcastRegistry},
};
use cucumber::given;

use crate::cucumber::{world::SettlementSystem, SettlementWorld};

#[given("a fresh install")]
async fn fresh_install(world: &mut SettlementWorld) {
    let registry = BroadcastRegistry::new();
    let mut hooks = EventHooks::default();
    let hook_registry = registry.clone();
    hooks.on_order_paid(move |ev| {
        let registry = hook_registry.clone();
        Box::pin(async move {
            for event in BroadcastEvent::for_order_paid(&ev) {
                registry.broadcast(&event);
            }
        })
    });
    let handlers = EventHandlers::new(16, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    world.system = Some(SettlementSystem::new(producers, registry).await);
}
