use anyhow::Context;
use serde_json::json;
use tracing::info;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::DatabaseManager;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    let manager = DatabaseManager::connect(&config.database)
        .await
        .context("connecting to the database")?;

    manager.apply_schema().await.context("applying schema")?;
    manager.close().await;
    info!("Schema applied");

    output_success(
        &output_format,
        "Database schema is up to date",
        Some(json!({ "tables": ["profiles", "document_requests", "notifications"] })),
    )
}
