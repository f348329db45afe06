pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;

use thiserror::Error;

pub use manager::DatabaseManager;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use repository::{NotificationStore, ProfileStore, RequestStore, Store};

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}
