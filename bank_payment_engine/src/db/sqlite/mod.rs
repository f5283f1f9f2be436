mod db;
mod errors;

pub mod orders;
pub mod settlements;

use std::{env, str::FromStr};

pub use db::SqliteDatabase;
pub use errors::SqliteDatabaseError;
use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

const SQLITE_DB_URL: &str = "sqlite://data/bpg_store.db";

pub fn db_url() -> String {
    let result = env::var("BPG_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ BPG_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqliteDatabaseError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}
