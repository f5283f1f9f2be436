use std::{collections::HashMap, sync::Arc};

use bank_payment_engine::{
    events::EventProducers,
    notifications::{BroadcastRegistry, ChannelSink, ClientScope, Notification},
    settlement_objects::SettlementOutcome,
    test_utils::prepare_env::{create_database, random_db_path, run_migrations},
    SettlementApi,
    SettlementConfig,
    SqliteDatabase,
    DEFAULT_AMOUNT_TOLERANCE,
};
use cucumber::World;
use log::*;
use tokio::sync::{mpsc, Mutex};

#[derive(Default, Debug, World)]
pub struct SettlementWorld {
    pub system: Option<SettlementSystem>,
    pub last_outcome: Option<SettlementOutcome>,
    pub clients: HashMap<String, Arc<Mutex<mpsc::Receiver<Notification>>>>,
}

pub struct SettlementSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub api: SettlementApi<SqliteDatabase>,
    pub registry: BroadcastRegistry,
}

impl std::fmt::Debug for SettlementSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementSystem({})", self.db_path)
    }
}

impl SettlementWorld {
    pub fn system(&self) -> &SettlementSystem {
        self.system.as_ref().expect("The system has not been initialised")
    }

    pub fn api(&self) -> &SettlementApi<SqliteDatabase> {
        &self.system().api
    }

    pub fn connect_client(&mut self, connection_id: &str, scope: ClientScope) {
        let (sink, receiver) = ChannelSink::new(16);
        self.system().registry.register(connection_id, scope, Box::new(sink));
        self.clients.insert(connection_id.to_string(), Arc::new(Mutex::new(receiver)));
    }

    pub fn disconnect_client(&mut self, connection_id: &str) {
        // Dropping the receiver closes the stream, just as a browser going away would.
        self.clients.remove(connection_id);
    }
}

impl SettlementSystem {
    pub async fn new(producers: EventProducers, registry: BroadcastRegistry) -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 2).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let config = SettlementConfig::new("DH", DEFAULT_AMOUNT_TOLERANCE).expect("Invalid reference prefix");
        let api = SettlementApi::new(db.clone(), config, producers);
        Self { db_path: url, db, api, registry }
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}
