use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Database query error: {0}")]
    QueryError(String),
    #[error("Could not run database migrations: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Cannot insert duplicate order {0}")]
    DuplicateOrder(String),
    #[error("A settlement for transaction {0} already exists")]
    DuplicateTransaction(String),
}

impl SqliteDatabaseError {
    pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
        matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
    }
}
