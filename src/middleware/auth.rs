use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::app::AppState;
use crate::auth::Claims;
use crate::error::ApiError;
use crate::types::Role;

/// Authenticated caller, inserted as a request extension by [`require_bearer`]
#[derive(Clone, Debug)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn claims(&self) -> &Claims {
        &self.0
    }

    /// Reject callers whose claimed role is outside `roles`
    pub fn require_any(&self, roles: &[Role]) -> Result<(), ApiError> {
        if self.0.has_any_role(roles) {
            debug!("{} authorized as {:?}", self.0.subject, self.0.role);
            Ok(())
        } else {
            warn!(
                "Access denied for {} with role {:?}, required one of {:?}",
                self.0.subject, self.0.role, roles
            );
            Err(ApiError::forbidden("Access denied: insufficient role"))
        }
    }
}

/// Verify the bearer token on every request; no caching between requests
pub async fn require_bearer(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(&headers).map_err(ApiError::unauthorized)?;

    let claims = state.verifier.verify(&token).await.map_err(|e| {
        warn!("Rejected bearer token: {}", e);
        ApiError::unauthorized("Invalid or expired token")
    })?;

    request.extensions_mut().insert(AuthUser(claims));
    Ok(next.run(request).await)
}

/// Extract the token from an `Authorization: Bearer <token>` header
fn extract_bearer(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    // Auth schemes are case-insensitive
    let (scheme, token) = auth_str.trim().split_once(' ').unwrap_or((auth_str.trim(), ""));
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err("Authorization header must use Bearer token format".to_string());
    }

    match token.trim() {
        "" => Err("Empty bearer token".to_string()),
        token => Ok(token.to_string()),
    }
}
