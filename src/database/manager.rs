use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::database::DatabaseError;

/// Idempotent schema, applied statement by statement
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS profiles (
        uid         TEXT PRIMARY KEY,
        first_name  TEXT NOT NULL DEFAULT '',
        last_name   TEXT NOT NULL DEFAULT '',
        email       TEXT NOT NULL DEFAULT '',
        role        TEXT NOT NULL DEFAULT '',
        promotion   TEXT NOT NULL DEFAULT '',
        specialty   TEXT NOT NULL DEFAULT '',
        status      TEXT NOT NULL DEFAULT 'inactive',
        created_at  TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS document_requests (
        id              UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        requester_id    TEXT NOT NULL,
        requester_role  TEXT NOT NULL,
        request_type    TEXT NOT NULL,
        message         TEXT NOT NULL,
        status          TEXT NOT NULL
            CHECK (status IN ('not-started', 'in-progress', 'completed', 'rejected')),
        created_at      TIMESTAMPTZ
    )
    "#,
    "CREATE INDEX IF NOT EXISTS document_requests_requester_idx ON document_requests (requester_id)",
    r#"
    CREATE TABLE IF NOT EXISTS notifications (
        id            UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        recipient_id  TEXT NOT NULL,
        request_id    UUID REFERENCES document_requests (id),
        message       TEXT NOT NULL,
        category      TEXT NOT NULL,
        status        TEXT NOT NULL,
        created_at    TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS notifications_recipient_idx ON notifications (recipient_id)",
];

/// Owns the connection pool for the gateway database
#[derive(Clone)]
pub struct DatabaseManager {
    pool: PgPool,
}

impl DatabaseManager {
    /// Connect using the configured URL and pool limits
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let url = config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;

        // Reject obviously malformed URLs before sqlx tries to dial them
        let parsed = url::Url::parse(url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        if !matches!(parsed.scheme(), "postgres" | "postgresql") {
            return Err(DatabaseError::InvalidDatabaseUrl);
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!(
            "Created database pool for: {}",
            parsed.path().trim_start_matches('/')
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables and indexes if they do not exist yet
    pub async fn apply_schema(&self) -> Result<(), DatabaseError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Database schema is up to date ({} statements)", SCHEMA.len());
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: Option<&str>) -> DatabaseConfig {
        DatabaseConfig {
            url: url.map(str::to_string),
            max_connections: 1,
            connection_timeout: 1,
            apply_schema: false,
        }
    }

    #[tokio::test]
    async fn missing_url_is_a_config_error() {
        let err = DatabaseManager::connect(&config(None)).await.err().unwrap();
        assert!(matches!(err, DatabaseError::ConfigMissing("DATABASE_URL")));
    }

    #[tokio::test]
    async fn non_postgres_url_is_rejected() {
        let err = DatabaseManager::connect(&config(Some("mysql://localhost/docs")))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DatabaseError::InvalidDatabaseUrl));
    }

    #[test]
    fn schema_statements_are_idempotent() {
        assert!(SCHEMA
            .iter()
            .all(|s| s.contains("IF NOT EXISTS")));
    }
}
