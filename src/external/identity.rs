use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

use crate::config::IdentityConfig;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid or expired out-of-band code")]
    InvalidCode,

    #[error("an account with this email already exists")]
    AccountExists,

    #[error("account not found")]
    AccountNotFound,

    #[error("identity provider rejected the call: {0}")]
    Rejected(String),

    #[error("invalid identity provider URL: {0}")]
    InvalidUrl(String),

    #[error("no service credential configured for admin call accounts:{0} (set IDENTITY_SERVICE_TOKEN or IDENTITY_SERVICE_TOKEN_FILE)")]
    MissingCredential(&'static str),

    #[error("cannot read service credential: {0}")]
    Credential(String),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Successful password sign-in
#[derive(Debug, Clone)]
pub struct SignIn {
    pub uid: String,
    pub id_token: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

/// Account operations owned by the external identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignIn, IdentityError>;

    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError>;

    async fn reset_password(&self, oob_code: &str, new_password: &str) -> Result<(), IdentityError>;

    /// Returns the new account's subject id
    async fn create_account(&self, account: NewAccount) -> Result<String, IdentityError>;

    async fn delete_account(&self, uid: &str) -> Result<(), IdentityError>;
}

/// OAuth2 bearer used for admin-only `accounts:*` calls
#[derive(Debug, Clone)]
enum ServiceCredential {
    Token(String),
    File(PathBuf),
}

impl ServiceCredential {
    fn from_config(config: &IdentityConfig) -> Option<Self> {
        match (&config.service_token, &config.service_token_file) {
            (Some(token), _) => Some(ServiceCredential::Token(token.clone())),
            (None, Some(path)) => Some(ServiceCredential::File(PathBuf::from(path))),
            (None, None) => None,
        }
    }

    async fn bearer(&self) -> Result<String, IdentityError> {
        let token = match self {
            ServiceCredential::Token(token) => token.trim().to_string(),
            ServiceCredential::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| IdentityError::Credential(format!("{}: {}", path.display(), e)))?
                .trim()
                .to_string(),
        };
        if token.is_empty() {
            return Err(IdentityError::Credential("service token is empty".to_string()));
        }
        Ok(token)
    }
}

/// Identity Toolkit REST client. User-facing calls are API-key
/// authenticated; account creation and deletion also carry the service
/// credential.
pub struct IdentityToolkitClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    service: Option<ServiceCredential>,
    project_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    local_id: String,
    #[serde(default)]
    email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    local_id: String,
}

impl IdentityToolkitClient {
    pub fn new(config: &IdentityConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: &IdentityConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            service: ServiceCredential::from_config(config),
            project_id: config.project_id.clone(),
        }
    }

    pub fn has_service_credential(&self) -> bool {
        self.service.is_some()
    }

    fn endpoint(&self, method: &str) -> Result<url::Url, IdentityError> {
        // Endpoint names contain ':', so they cannot go through Url::join
        let raw = format!("{}/accounts:{}", self.base_url, method);
        let mut url = url::Url::parse(&raw).map_err(|_| IdentityError::InvalidUrl(raw.clone()))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    async fn call(&self, method: &str, body: Value) -> Result<Value, IdentityError> {
        self.send(method, body, None).await
    }

    /// Call an endpoint that needs project admin rights
    async fn admin_call(&self, method: &'static str, mut body: Value) -> Result<Value, IdentityError> {
        let credential = self
            .service
            .as_ref()
            .ok_or(IdentityError::MissingCredential(method))?;
        let bearer = credential.bearer().await?;
        if let (Some(project), Some(fields)) = (&self.project_id, body.as_object_mut()) {
            fields.insert("targetProjectId".to_string(), Value::String(project.clone()));
        }
        self.send(method, body, Some(bearer)).await
    }

    async fn send(&self, method: &str, body: Value, bearer: Option<String>) -> Result<Value, IdentityError> {
        let url = self.endpoint(method)?;
        debug!("Identity provider call: accounts:{}", method);

        let mut request = self.client.post(url).json(&body);
        if let Some(bearer) = bearer {
            request = request.bearer_auth(bearer);
        }
        let response = request.send().await?;
        let status = response.status();
        let payload: Value = response.json().await.unwrap_or(Value::Null);

        if status.is_success() {
            Ok(payload)
        } else {
            Err(classify_error(&payload))
        }
    }
}

/// Map an Identity Toolkit error body (`{"error": {"message": "CODE : detail"}}`)
fn classify_error(payload: &Value) -> IdentityError {
    let message = payload["error"]["message"].as_str().unwrap_or("UNKNOWN");
    let code = message.split_whitespace().next().unwrap_or(message);
    match code {
        "INVALID_PASSWORD" | "EMAIL_NOT_FOUND" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED"
        | "INVALID_EMAIL" | "MISSING_PASSWORD" => IdentityError::InvalidCredentials,
        "EXPIRED_OOB_CODE" | "INVALID_OOB_CODE" => IdentityError::InvalidCode,
        "EMAIL_EXISTS" => IdentityError::AccountExists,
        "USER_NOT_FOUND" => IdentityError::AccountNotFound,
        _ => IdentityError::Rejected(message.to_string()),
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignIn, IdentityError> {
        let payload = self
            .call(
                "signInWithPassword",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;
        let parsed: SignInResponse = serde_json::from_value(payload)
            .map_err(|e| IdentityError::Rejected(format!("unexpected sign-in response: {}", e)))?;

        Ok(SignIn {
            uid: parsed.local_id,
            id_token: parsed.id_token,
            email: if parsed.email.is_empty() { email.to_string() } else { parsed.email },
        })
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        self.call("sendOobCode", json!({ "requestType": "PASSWORD_RESET", "email": email }))
            .await?;
        Ok(())
    }

    async fn reset_password(&self, oob_code: &str, new_password: &str) -> Result<(), IdentityError> {
        self.call("resetPassword", json!({ "oobCode": oob_code, "newPassword": new_password }))
            .await?;
        Ok(())
    }

    async fn create_account(&self, account: NewAccount) -> Result<String, IdentityError> {
        let payload = self
            .admin_call(
                "signUp",
                json!({
                    "email": account.email,
                    "password": account.password,
                    "displayName": account.display_name,
                    "returnSecureToken": false,
                }),
            )
            .await?;
        let parsed: SignUpResponse = serde_json::from_value(payload)
            .map_err(|e| IdentityError::Rejected(format!("unexpected sign-up response: {}", e)))?;
        Ok(parsed.local_id)
    }

    async fn delete_account(&self, uid: &str) -> Result<(), IdentityError> {
        self.admin_call("delete", json!({ "localId": uid })).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> IdentityConfig {
        IdentityConfig {
            base_url: format!("{}/v1", server.uri()),
            api_key: "test-key".into(),
            ..Default::default()
        }
    }

    fn client_for(server: &MockServer) -> IdentityToolkitClient {
        IdentityToolkitClient::new(&config_for(server))
    }

    #[tokio::test]
    async fn sign_in_returns_token_and_uid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithPassword"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({ "email": "a@school.test", "returnSecureToken": true })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "idToken": "jwt-123",
                "localId": "uid-7",
                "email": "a@school.test"
            })))
            .mount(&server)
            .await;

        let signed = client_for(&server).sign_in("a@school.test", "pw").await.unwrap();
        assert_eq!(signed.uid, "uid-7");
        assert_eq!(signed.id_token, "jwt-123");
    }

    #[tokio::test]
    async fn bad_password_maps_to_invalid_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithPassword"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": 400, "message": "INVALID_LOGIN_CREDENTIALS" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).sign_in("a@school.test", "nope").await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidCredentials));
    }

    #[tokio::test]
    async fn password_reset_flow_calls_oob_endpoints() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:sendOobCode"))
            .and(body_partial_json(json!({ "requestType": "PASSWORD_RESET" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "email": "a@school.test" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:resetPassword"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "message": "EXPIRED_OOB_CODE" }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.send_password_reset("a@school.test").await.unwrap();
        let err = client.reset_password("old-code", "new-pw").await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidCode));
    }

    #[tokio::test]
    async fn admin_calls_send_service_bearer_and_project() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:delete"))
            .and(header("authorization", "Bearer svc-token"))
            .and(body_partial_json(json!({ "localId": "uid-7", "targetProjectId": "school-prod" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signUp"))
            .and(header("authorization", "Bearer svc-token"))
            .and(body_partial_json(json!({ "email": "n@school.test", "targetProjectId": "school-prod" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "localId": "uid-8" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = IdentityToolkitClient::new(&IdentityConfig {
            service_token: Some("svc-token".into()),
            project_id: Some("school-prod".into()),
            ..config_for(&server)
        });
        client.delete_account("uid-7").await.unwrap();
        let uid = client
            .create_account(NewAccount {
                email: "n@school.test".into(),
                password: "pw-123456".into(),
                display_name: "N".into(),
            })
            .await
            .unwrap();
        assert_eq!(uid, "uid-8");
    }

    #[tokio::test]
    async fn admin_calls_without_credential_never_reach_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(!client.has_service_credential());
        let err = client.delete_account("uid-7").await.unwrap_err();
        assert!(matches!(err, IdentityError::MissingCredential("delete")));
    }

    #[tokio::test]
    async fn service_token_file_is_read_per_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:delete"))
            .and(header("authorization", "Bearer rotated-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let token_path = std::env::temp_dir().join(format!("docreq-token-{}", uuid::Uuid::new_v4()));
        std::fs::write(&token_path, "rotated-token\n").unwrap();
        let client = IdentityToolkitClient::new(&IdentityConfig {
            service_token_file: Some(token_path.display().to_string()),
            ..config_for(&server)
        });
        client.delete_account("uid-7").await.unwrap();

        std::fs::remove_file(&token_path).unwrap();
        let err = client.delete_account("uid-7").await.unwrap_err();
        assert!(matches!(err, IdentityError::Credential(_)));
    }

    #[test]
    fn error_codes_with_detail_suffix_are_classified() {
        let err = classify_error(&json!({ "error": { "message": "EMAIL_EXISTS : already used" } }));
        assert!(matches!(err, IdentityError::AccountExists));
        let err = classify_error(&json!({ "error": { "message": "QUOTA_EXCEEDED" } }));
        assert!(matches!(err, IdentityError::Rejected(m) if m == "QUOTA_EXCEEDED"));
        assert!(matches!(classify_error(&Value::Null), IdentityError::Rejected(_)));
    }
}
