use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::auth::IdentityVerifier;
use crate::config::AppConfig;
use crate::database::Store;
use crate::external::{BlobStore, IdentityProvider, Mailer};
use crate::handlers::{protected, public};
use crate::middleware::require_bearer;
use crate::services::accounts::AccountService;
use crate::services::documents::DocumentService;
use crate::services::workflow::WorkflowEngine;

/// External capabilities, constructed once at startup
#[derive(Clone)]
pub struct Capabilities {
    pub store: Arc<dyn Store>,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub identity: Arc<dyn IdentityProvider>,
    pub blobs: Arc<dyn BlobStore>,
    pub mailer: Arc<dyn Mailer>,
}

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<WorkflowEngine>,
    pub documents: Arc<DocumentService>,
    pub accounts: Arc<AccountService>,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(caps: Capabilities, config: &AppConfig) -> Self {
        let policy = config.workflow.clone();
        Self {
            workflow: Arc::new(WorkflowEngine::new(policy.clone(), caps.store.clone())),
            documents: Arc::new(DocumentService::new(policy, caps.store.clone(), caps.blobs)),
            accounts: Arc::new(AccountService::new(
                caps.identity,
                caps.verifier.clone(),
                caps.store.clone(),
                caps.mailer,
                config.mail.from_address.clone(),
            )),
            verifier: caps.verifier,
            store: caps.store,
        }
    }
}

pub fn build_router(state: AppState, config: &AppConfig) -> Router {
    let protected = Router::new()
        .merge(account_routes())
        .merge(document_routes())
        .route("/notifications", get(protected::notifications::list))
        .route_layer(from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(auth_public_routes())
        // Bearer token required
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(config))
                .layer(DefaultBodyLimit::max(config.server.max_upload_bytes)),
        )
        .with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/auth/login", post(auth::admin_login))
        .route("/auth/user/login", post(auth::user_login))
        .route("/auth/password-reset", post(auth::password_reset))
        .route("/auth/reset-password", post(auth::reset_password))
}

fn account_routes() -> Router<AppState> {
    use protected::auth;

    Router::new()
        .route("/auth/profile", get(auth::profile))
        .route("/auth/admin", get(auth::admin_check))
        .route("/auth/users", get(auth::list_users).post(auth::add_user))
        .route("/auth/add-user", post(auth::add_user))
        .route(
            "/auth/users/:id",
            get(auth::get_user).put(auth::update_user).delete(auth::delete_user),
        )
}

fn document_routes() -> Router<AppState> {
    use protected::documents;

    Router::new()
        .route("/documents/upload", post(documents::upload))
        .route(
            "/documents/requests",
            get(documents::list_requests).post(documents::create_request),
        )
        .route(
            "/documents/requests/:id",
            get(documents::get_request).patch(documents::update_status),
        )
        .route("/documents/my-requests", get(documents::my_requests))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if !config.security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers(Any)
}
