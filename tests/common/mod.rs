#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};

use docreq_api::app::{build_router, AppState, Capabilities};
use docreq_api::auth::{JwtVerifier, TokenClaims};
use docreq_api::config::{AppConfig, DatabaseConfig};
use docreq_api::database::models::ProfileFields;
use docreq_api::database::{DatabaseManager, MemoryStore, PgStore, ProfileStore};
use docreq_api::external::{
    BlobError, BlobStore, IdentityToolkitClient, MailError, MailMessage, Mailer, MemoryBlobStore,
    UploadedFile,
};
use docreq_api::services::WorkflowPolicy;

pub const JWT_SECRET: &str = "integration-test-secret";
pub const SERVICE_TOKEN: &str = "integration-service-token";

/// Records outgoing mail instead of sending it
#[derive(Clone, Default)]
pub struct RecordingMailer {
    pub sent: Arc<Mutex<Vec<MailMessage>>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

/// Blob store that is always down
pub struct FailingBlobStore;

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn upload(&self, _file: UploadedFile) -> Result<String, BlobError> {
        Err(BlobError::Rejected {
            status: 503,
            message: "blob store offline".into(),
        })
    }
}

pub struct TestOptions {
    pub policy: WorkflowPolicy,
    /// Identity provider base URL, e.g. a wiremock server plus `/v1`
    pub identity_base_url: Option<String>,
    pub failing_blobs: bool,
    pub max_upload_bytes: Option<usize>,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            policy: WorkflowPolicy::default(),
            identity_base_url: None,
            failing_blobs: false,
            max_upload_bytes: None,
        }
    }
}

pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub store: MemoryStore,
    pub blobs: MemoryBlobStore,
    pub mailer: RecordingMailer,
}

pub async fn spawn_app() -> Result<TestApp> {
    spawn_app_with(TestOptions::default()).await
}

/// Serve the real router on a free port, backed by in-memory capabilities
pub async fn spawn_app_with(options: TestOptions) -> Result<TestApp> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;

    let mut env = HashMap::new();
    env.insert("IDENTITY_JWT_SECRET".to_string(), JWT_SECRET.to_string());
    env.insert("IDENTITY_API_KEY".to_string(), "test-key".to_string());
    env.insert("IDENTITY_SERVICE_TOKEN".to_string(), SERVICE_TOKEN.to_string());
    env.insert(
        "IDENTITY_BASE_URL".to_string(),
        options
            .identity_base_url
            .clone()
            .unwrap_or_else(|| "http://127.0.0.1:9/v1".to_string()),
    );
    env.insert("MAIL_FROM".to_string(), "desk@school.test".to_string());
    let mut config = AppConfig::from_lookup(|key| env.get(key).cloned())?;
    config.server.port = port;
    config.workflow = options.policy;
    if let Some(limit) = options.max_upload_bytes {
        config.server.max_upload_bytes = limit;
    }

    let store = MemoryStore::new();
    let blobs = MemoryBlobStore::new();
    let mailer = RecordingMailer::default();

    let caps = Capabilities {
        store: Arc::new(store.clone()),
        verifier: Arc::new(JwtVerifier::from_config(&config.identity)?),
        identity: Arc::new(IdentityToolkitClient::new(&config.identity)),
        blobs: if options.failing_blobs {
            Arc::new(FailingBlobStore)
        } else {
            Arc::new(blobs.clone())
        },
        mailer: Arc::new(mailer.clone()),
    };
    let app = build_router(AppState::new(caps, &config), &config);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .context("failed to bind test listener")?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(TestApp {
        base_url: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
        store,
        blobs,
        mailer,
    })
}

// Schema creation is not safe to run from several connections at once
static SCHEMA_LOCK: Mutex<()> = Mutex::new(());

/// Connect to `DATABASE_URL` (from the environment or `.env`) with the schema
/// applied. Returns None when no database is configured, so callers skip.
pub async fn pg_store() -> Result<Option<(PgStore, DatabaseManager)>> {
    dotenvy::dotenv().ok();
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping PostgreSQL store test");
        return Ok(None);
    };

    let manager = DatabaseManager::connect(&DatabaseConfig {
        url: Some(url),
        max_connections: 5,
        connection_timeout: 10,
        apply_schema: true,
    })
    .await?;
    {
        let _guard = SCHEMA_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        manager.apply_schema().await?;
    }
    Ok(Some((PgStore::new(manager.pool().clone()), manager)))
}

/// Mint a bearer token the way the identity provider would
pub fn token(subject: &str, role: Option<&str>) -> String {
    token_with(subject, role, true, 3600)
}

pub fn token_with(subject: &str, role: Option<&str>, email_verified: bool, ttl_secs: i64) -> String {
    let claims = TokenClaims {
        sub: subject.to_string(),
        role: role.map(str::to_string),
        email: Some(format!("{}@school.test", subject)),
        email_verified,
        exp: Utc::now().timestamp() + ttl_secs,
        iat: Some(Utc::now().timestamp()),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_bytes()))
        .expect("token encoding")
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Store a profile `<uid>@school.test` with the given free-text role
    pub async fn add_profile(&self, uid: &str, role: &str) {
        let profile = ProfileFields {
            first_name: Some(uid.to_string()),
            email: Some(format!("{}@school.test", uid)),
            role: Some(role.to_string()),
            ..Default::default()
        }
        .into_profile(uid.to_string(), Utc::now());
        self.store.put_profile(&profile).await.expect("put profile");
    }

    pub fn get(&self, path: &str, bearer: &str) -> reqwest::RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(bearer)
    }

    pub fn post(&self, path: &str, bearer: &str) -> reqwest::RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(bearer)
    }

    pub fn patch(&self, path: &str, bearer: &str) -> reqwest::RequestBuilder {
        self.client.patch(self.url(path)).bearer_auth(bearer)
    }

    pub fn put(&self, path: &str, bearer: &str) -> reqwest::RequestBuilder {
        self.client.put(self.url(path)).bearer_auth(bearer)
    }

    pub fn delete(&self, path: &str, bearer: &str) -> reqwest::RequestBuilder {
        self.client.delete(self.url(path)).bearer_auth(bearer)
    }
}
