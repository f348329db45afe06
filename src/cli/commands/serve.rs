use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::app::{build_router, AppState, Capabilities};
use crate::auth::JwtVerifier;
use crate::config::AppConfig;
use crate::database::{DatabaseManager, MemoryStore, PgStore, Store};
use crate::external::{
    BlobStore, CloudinaryBlobStore, IdentityToolkitClient, LogMailer, Mailer, MemoryBlobStore,
    SmtpMailer,
};

pub async fn handle(port: Option<u16>, in_memory: bool) -> anyhow::Result<()> {
    let mut config = AppConfig::from_env().context("loading configuration")?;
    if let Some(port) = port {
        config.server.port = port;
    }
    info!("Starting document request API in {:?} mode", config.environment);

    let caps = capabilities(&config, in_memory).await?;
    let app = build_router(AppState::new(caps, &config), &config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

/// Construct every external capability once; handlers only see the traits
async fn capabilities(config: &AppConfig, in_memory: bool) -> anyhow::Result<Capabilities> {
    let verifier = JwtVerifier::from_config(&config.identity)
        .context("configuring token verification (set IDENTITY_JWT_SECRET or IDENTITY_JWT_PUBLIC_KEY_PEM)")?;

    let (store, blobs, mailer): (Arc<dyn Store>, Arc<dyn BlobStore>, Arc<dyn Mailer>) = if in_memory {
        warn!("Running with in-memory store, blob store and logged mail; nothing is persisted or sent");
        (Arc::new(MemoryStore::new()), Arc::new(MemoryBlobStore::new()), Arc::new(LogMailer))
    } else {
        let manager = DatabaseManager::connect(&config.database)
            .await
            .context("connecting to the database")?;
        if config.database.apply_schema {
            manager.apply_schema().await.context("applying schema")?;
        }
        let blobs = CloudinaryBlobStore::from_config(&config.blob).context("configuring blob store")?;
        let mailer = SmtpMailer::from_config(&config.mail).context("configuring mail delivery")?;
        (Arc::new(PgStore::new(manager.pool().clone())), Arc::new(blobs), Arc::new(mailer))
    };

    let identity = IdentityToolkitClient::new(&config.identity);
    if !identity.has_service_credential() {
        warn!("No identity service credential configured; creating and deleting users will fail");
    }

    Ok(Capabilities {
        store,
        verifier: Arc::new(verifier),
        identity: Arc::new(identity),
        blobs,
        mailer,
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
