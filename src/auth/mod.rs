use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::IdentityConfig;
use crate::types::Role;

/// Raw claims carried by identity-provider tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
}

/// Verified identity passed to every downstream operation
#[derive(Debug, Clone, PartialEq)]
pub struct Claims {
    pub subject: String,
    /// None when the token carries no role or one we do not recognise
    pub role: Option<Role>,
    pub email: Option<String>,
    pub email_verified: bool,
}

impl Claims {
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.role.map(|r| roles.contains(&r)).unwrap_or(false)
    }
}

impl From<TokenClaims> for Claims {
    fn from(raw: TokenClaims) -> Self {
        Self {
            subject: raw.sub,
            role: Role::parse_lenient(raw.role.as_deref()),
            email: raw.email,
            email_verified: raw.email_verified,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("token verification key not configured")]
    KeyMissing,

    #[error("invalid verification key: {0}")]
    InvalidKey(String),

    #[error("invalid token: {0}")]
    InvalidToken(String),
}

/// Validates bearer credentials and yields verified claims
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Claims, VerifyError>;
}

/// Verifies identity-provider JWTs locally with a configured key
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn from_config(config: &IdentityConfig) -> Result<Self, VerifyError> {
        let (key, algorithm) = if let Some(pem) = &config.jwt_public_key_pem {
            let key = DecodingKey::from_rsa_pem(pem.as_bytes())
                .map_err(|e| VerifyError::InvalidKey(e.to_string()))?;
            (key, Algorithm::RS256)
        } else if let Some(secret) = config.jwt_secret.as_deref().filter(|s| !s.is_empty()) {
            (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256)
        } else {
            return Err(VerifyError::KeyMissing);
        };

        let mut validation = Validation::new(algorithm);
        if let Some(issuer) = &config.jwt_issuer {
            validation.set_issuer(&[issuer]);
        }
        match &config.jwt_audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Ok(Self { key, validation })
    }

    pub fn from_secret(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, VerifyError> {
        let data = decode::<TokenClaims>(token, &self.key, &self.validation)
            .map_err(|e| VerifyError::InvalidToken(e.to_string()))?;
        Ok(data.claims.into())
    }
}
