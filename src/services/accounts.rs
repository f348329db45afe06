use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::auth::{Claims, IdentityVerifier, VerifyError};
use crate::database::models::{Profile, ProfileFields};
use crate::database::{DatabaseError, ProfileStore, Store};
use crate::external::{IdentityError, IdentityProvider, MailMessage, Mailer, NewAccount};
use crate::types::Role;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Identity(IdentityError),

    #[error("issued token failed verification: {0}")]
    Verify(#[from] VerifyError),

    #[error(transparent)]
    Store(#[from] DatabaseError),
}

impl From<IdentityError> for AccountError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidCredentials => {
                AccountError::Unauthenticated("Invalid email or password".to_string())
            }
            IdentityError::InvalidCode => {
                AccountError::InvalidInput("Invalid or expired reset code".to_string())
            }
            IdentityError::AccountExists => {
                AccountError::Conflict("An account with this email already exists".to_string())
            }
            other => AccountError::Identity(other),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub uid: String,
    pub role: String,
    pub email: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Admin-supplied account details
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    pub password: Option<String>,
    #[serde(flatten)]
    pub profile: ProfileFields,
}

/// Login, password recovery and administrator user management, delegated
/// to the identity provider with profiles kept in the store.
pub struct AccountService {
    identity: Arc<dyn IdentityProvider>,
    verifier: Arc<dyn IdentityVerifier>,
    store: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    mail_from: String,
}

impl AccountService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        verifier: Arc<dyn IdentityVerifier>,
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        mail_from: impl Into<String>,
    ) -> Self {
        Self {
            identity,
            verifier,
            store,
            mailer,
            mail_from: mail_from.into(),
        }
    }

    pub async fn admin_login(&self, email: &str, password: &str) -> Result<LoginResponse, AccountError> {
        let signed = self.identity.sign_in(email, password).await?;
        let claims = self.verifier.verify(&signed.id_token).await?;

        if claims.role != Some(Role::Admin) {
            warn!("Admin login refused for {}: role {:?}", signed.uid, claims.role);
            return Err(AccountError::Forbidden("Access denied: admin role required".to_string()));
        }
        if !claims.email_verified {
            warn!("Admin login refused for {}: email not verified", signed.uid);
            return Err(AccountError::Forbidden("Email address not verified".to_string()));
        }

        info!("Admin {} logged in", signed.uid);
        Ok(LoginResponse {
            message: "Admin login successful".to_string(),
            uid: signed.uid,
            role: Role::Admin.to_string(),
            email: claims.email.unwrap_or(signed.email),
            token: signed.id_token,
        })
    }

    pub async fn user_login(&self, email: &str, password: &str) -> Result<LoginResponse, AccountError> {
        let signed = self.identity.sign_in(email, password).await?;
        let claims = self.verifier.verify(&signed.id_token).await?;

        let profile = self
            .store
            .get_profile(&claims.subject)
            .await?
            .ok_or_else(|| AccountError::NotFound("User profile not found".to_string()))?;

        info!("User {} logged in", claims.subject);
        Ok(LoginResponse {
            message: "Login successful".to_string(),
            uid: claims.subject,
            role: profile.role,
            email: profile.email,
            token: signed.id_token,
        })
    }

    pub async fn send_password_reset(&self, email: &str) -> Result<(), AccountError> {
        if email.trim().is_empty() {
            return Err(AccountError::InvalidInput("Email is required".to_string()));
        }
        self.identity.send_password_reset(email.trim()).await?;
        Ok(())
    }

    pub async fn reset_password(&self, oob_code: &str, new_password: &str) -> Result<(), AccountError> {
        if oob_code.is_empty() || new_password.is_empty() {
            return Err(AccountError::InvalidInput(
                "Reset code and new password are required".to_string(),
            ));
        }
        self.identity.reset_password(oob_code, new_password).await?;
        Ok(())
    }

    pub async fn profile(&self, claims: &Claims) -> Result<ProfileSummary, AccountError> {
        let profile = self.get_user(&claims.subject).await?;
        Ok(ProfileSummary {
            first_name: profile.first_name,
            last_name: profile.last_name,
            email: profile.email,
        })
    }

    /// Every profile except the caller's own
    pub async fn list_users(&self, claims: &Claims) -> Result<Vec<Profile>, AccountError> {
        let profiles = self.store.list_profiles().await?;
        Ok(profiles.into_iter().filter(|p| p.uid != claims.subject).collect())
    }

    pub async fn add_user(&self, claims: &Claims, input: NewUser) -> Result<Profile, AccountError> {
        let email = input.profile.email.clone().unwrap_or_default();
        let password = input.password.unwrap_or_default();
        if email.trim().is_empty() || password.is_empty() {
            return Err(AccountError::InvalidInput("Email and password are required".to_string()));
        }

        let display_name = format!(
            "{} {}",
            input.profile.first_name.as_deref().unwrap_or_default(),
            input.profile.last_name.as_deref().unwrap_or_default()
        )
        .trim()
        .to_string();

        let uid = self
            .identity
            .create_account(NewAccount {
                email: email.trim().to_string(),
                password,
                display_name,
            })
            .await?;

        let profile = input.profile.into_profile(uid, Utc::now());
        self.store.put_profile(&profile).await?;
        info!("{} created account {} ({})", claims.subject, profile.uid, profile.email);

        if let Err(e) = self
            .mailer
            .send(MailMessage::account_created(&self.mail_from, &profile.email))
            .await
        {
            error!("Account-created mail to {} failed: {}", profile.email, e);
        }

        Ok(profile)
    }

    pub async fn get_user(&self, uid: &str) -> Result<Profile, AccountError> {
        self.store
            .get_profile(uid)
            .await?
            .ok_or_else(|| AccountError::NotFound("User not found".to_string()))
    }

    pub async fn update_user(&self, uid: &str, fields: &ProfileFields) -> Result<Profile, AccountError> {
        if !self.store.update_profile(uid, fields).await? {
            return Err(AccountError::NotFound("User not found".to_string()));
        }
        self.get_user(uid).await
    }

    /// Remove the provider account, then the profile
    pub async fn delete_user(&self, uid: &str) -> Result<(), AccountError> {
        self.get_user(uid).await?;

        match self.identity.delete_account(uid).await {
            Ok(()) => {}
            Err(IdentityError::AccountNotFound) => {
                warn!("Provider account {} already gone, removing profile", uid);
            }
            Err(e) => return Err(e.into()),
        }

        self.store.delete_profile(uid).await?;
        info!("Deleted user {}", uid);
        Ok(())
    }
}
