use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use thiserror::Error;

use crate::services::policy::WorkflowPolicy;
use crate::types::{RequestStatus, Role};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },

    #[error("cannot read workflow policy file {path}: {source}")]
    PolicyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse workflow policy: {0}")]
    PolicyParse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub identity: IdentityConfig,
    pub blob: BlobConfig,
    pub mail: MailConfig,
    pub security: SecurityConfig,
    pub workflow: WorkflowPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub apply_schema: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Identity Toolkit REST base, e.g. https://identitytoolkit.googleapis.com/v1
    pub base_url: String,
    pub api_key: String,
    /// HS256 shared secret used to verify bearer tokens
    pub jwt_secret: Option<String>,
    /// RS256 public key (PEM); takes precedence over the shared secret
    pub jwt_public_key_pem: Option<String>,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,
    /// OAuth2 access token with admin rights on the project, sent as a
    /// bearer on account creation and deletion
    pub service_token: Option<String>,
    /// File holding that token, re-read on every admin call so an external
    /// refresher can rotate it
    pub service_token_file: Option<String>,
    /// Project the admin calls target (`targetProjectId`)
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobConfig {
    pub base_url: String,
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailConfig {
    pub from_address: String,
    /// Outgoing SMTP relay; unset means mail cannot be delivered
    pub smtp_host: Option<String>,
    /// Defaults to the standard port for `smtp_security`
    pub smtp_port: Option<u16>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_security: SmtpSecurity,
}

/// How the SMTP connection is secured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// Implicit TLS (port 465)
    #[default]
    Tls,
    /// Plain connection upgraded with STARTTLS (port 587)
    StartTls,
    /// Unencrypted; local relays and tests only
    None,
}

impl FromStr for SmtpSecurity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tls" | "ssl" => Ok(SmtpSecurity::Tls),
            "starttls" => Ok(SmtpSecurity::StartTls),
            "none" | "plain" => Ok(SmtpSecurity::None),
            other => Err(format!("unknown SMTP security '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

fn parse_value<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

fn parse_list<T: FromStr>(key: &'static str, raw: &str) -> Result<Vec<T>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_value(key, s))
        .collect()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup (the process
    /// environment in production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        let config = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        };
        config.with_overrides(&lookup)
    }

    fn with_overrides<F>(mut self, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(v) = lookup("DOCREQ_PORT").or_else(|| lookup("PORT")) {
            self.server.port = parse_value("DOCREQ_PORT", &v)?;
        }
        if let Some(v) = lookup("SERVER_MAX_UPLOAD_BYTES") {
            self.server.max_upload_bytes = parse_value("SERVER_MAX_UPLOAD_BYTES", &v)?;
        }

        // Database overrides
        if let Some(v) = lookup("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_value("DATABASE_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = lookup("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = parse_value("DATABASE_CONNECTION_TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("DATABASE_APPLY_SCHEMA") {
            self.database.apply_schema = parse_value("DATABASE_APPLY_SCHEMA", &v)?;
        }

        // Identity overrides
        if let Some(v) = lookup("IDENTITY_BASE_URL") {
            self.identity.base_url = v;
        }
        if let Some(v) = lookup("IDENTITY_API_KEY").or_else(|| lookup("FIREBASE_API_KEY")) {
            self.identity.api_key = v;
        }
        if let Some(v) = lookup("IDENTITY_JWT_SECRET") {
            self.identity.jwt_secret = Some(v);
        }
        if let Some(v) = lookup("IDENTITY_JWT_PUBLIC_KEY_PEM") {
            self.identity.jwt_public_key_pem = Some(v);
        }
        if let Some(v) = lookup("IDENTITY_JWT_ISSUER") {
            self.identity.jwt_issuer = Some(v);
        }
        if let Some(v) = lookup("IDENTITY_JWT_AUDIENCE") {
            self.identity.jwt_audience = Some(v);
        }
        if let Some(v) = lookup("IDENTITY_SERVICE_TOKEN") {
            self.identity.service_token = Some(v);
        }
        if let Some(v) = lookup("IDENTITY_SERVICE_TOKEN_FILE") {
            self.identity.service_token_file = Some(v);
        }
        if let Some(v) = lookup("IDENTITY_PROJECT_ID").or_else(|| lookup("FIREBASE_PROJECT_ID")) {
            self.identity.project_id = Some(v);
        }

        // Blob store overrides
        if let Some(v) = lookup("BLOB_BASE_URL") {
            self.blob.base_url = v;
        }
        if let Some(v) = lookup("BLOB_CLOUD_NAME").or_else(|| lookup("CLOUDINARY_CLOUD_NAME")) {
            self.blob.cloud_name = v;
        }
        if let Some(v) = lookup("BLOB_API_KEY").or_else(|| lookup("CLOUDINARY_API_KEY")) {
            self.blob.api_key = v;
        }
        if let Some(v) = lookup("BLOB_API_SECRET").or_else(|| lookup("CLOUDINARY_API_SECRET")) {
            self.blob.api_secret = v;
        }
        if let Some(v) = lookup("BLOB_FOLDER") {
            self.blob.folder = v;
        }

        // Mail overrides
        if let Some(v) = lookup("MAIL_FROM").or_else(|| lookup("EMAIL_USER")) {
            self.mail.from_address = v;
        }
        if let Some(v) = lookup("MAIL_SMTP_USERNAME").or_else(|| lookup("EMAIL_USER")) {
            self.mail.smtp_username = Some(v);
        }
        if let Some(v) = lookup("MAIL_SMTP_PASSWORD").or_else(|| lookup("EMAIL_PASSWORD")) {
            self.mail.smtp_password = Some(v);
        }
        match lookup("MAIL_SMTP_HOST") {
            Some(v) => self.mail.smtp_host = Some(v),
            // Legacy EMAIL_USER/EMAIL_PASSWORD deployments relay through Gmail
            None if lookup("EMAIL_PASSWORD").is_some() => {
                self.mail.smtp_host = Some("smtp.gmail.com".to_string());
            }
            None => {}
        }
        if let Some(v) = lookup("MAIL_SMTP_PORT") {
            self.mail.smtp_port = Some(parse_value("MAIL_SMTP_PORT", &v)?);
        }
        if let Some(v) = lookup("MAIL_SMTP_SECURITY") {
            self.mail.smtp_security = parse_value("MAIL_SMTP_SECURITY", &v)?;
        }

        // Security overrides
        if let Some(v) = lookup("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = parse_value("SECURITY_ENABLE_CORS", &v)?;
        }
        if let Some(v) = lookup("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Workflow: preset, then file, then per-field overrides
        if let Some(v) = lookup("WORKFLOW_VARIANT") {
            self.workflow = WorkflowPolicy::preset(v.trim()).ok_or(ConfigError::InvalidValue {
                key: "WORKFLOW_VARIANT",
                value: v.clone(),
            })?;
        }
        if let Some(path) = lookup("WORKFLOW_POLICY_FILE") {
            let raw = std::fs::read_to_string(&path)
                .map_err(|source| ConfigError::PolicyFile { path: path.clone(), source })?;
            self.workflow = serde_yaml::from_str(&raw)?;
        }
        if let Some(v) = lookup("WORKFLOW_INITIAL_STATUS") {
            self.workflow.initial_status = parse_value::<RequestStatus>("WORKFLOW_INITIAL_STATUS", &v)?;
        }
        if let Some(v) = lookup("WORKFLOW_REQUESTER_ROLES") {
            self.workflow.requester_roles = parse_list::<Role>("WORKFLOW_REQUESTER_ROLES", &v)?;
        }
        if let Some(v) = lookup("WORKFLOW_READER_ROLES") {
            self.workflow.reader_roles = parse_list::<Role>("WORKFLOW_READER_ROLES", &v)?;
        }
        if let Some(v) = lookup("WORKFLOW_TRANSITIONER_ROLES") {
            self.workflow.transitioner_roles = parse_list::<Role>("WORKFLOW_TRANSITIONER_ROLES", &v)?;
        }
        if let Some(v) = lookup("WORKFLOW_UPLOADER_ROLES") {
            self.workflow.uploader_roles = parse_list::<Role>("WORKFLOW_UPLOADER_ROLES", &v)?;
        }
        if let Some(v) = lookup("WORKFLOW_AUDIENCE_ROLES") {
            self.workflow.new_request_audience_roles = parse_list::<Role>("WORKFLOW_AUDIENCE_ROLES", &v)?;
        }
        if let Some(v) = lookup("WORKFLOW_ASSIGNABLE_STATUSES") {
            self.workflow.assignable_statuses =
                parse_list::<RequestStatus>("WORKFLOW_ASSIGNABLE_STATUSES", &v)?;
        }

        Ok(self)
    }

    fn base(environment: Environment) -> Self {
        Self {
            environment,
            server: ServerConfig {
                port: 5000,
                max_upload_bytes: 10 * 1024 * 1024, // 10MB
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                apply_schema: true,
            },
            identity: IdentityConfig {
                base_url: "https://identitytoolkit.googleapis.com/v1".to_string(),
                api_key: String::new(),
                jwt_secret: None,
                jwt_public_key_pem: None,
                jwt_issuer: None,
                jwt_audience: None,
                service_token: None,
                service_token_file: None,
                project_id: None,
            },
            blob: BlobConfig {
                base_url: "https://api.cloudinary.com".to_string(),
                cloud_name: String::new(),
                api_key: String::new(),
                api_secret: String::new(),
                folder: "documents".to_string(),
            },
            mail: MailConfig {
                from_address: "no-reply@localhost".to_string(),
                ..Default::default()
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
            },
            workflow: WorkflowPolicy::default(),
        }
    }

    fn development() -> Self {
        Self::base(Environment::Development)
    }

    fn staging() -> Self {
        let mut config = Self::base(Environment::Staging);
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config.database.apply_schema = false;
        config.server.max_upload_bytes = 5 * 1024 * 1024; // 5MB
        config.security.cors_origins = vec!["https://staging.example.com".to_string()];
        config
    }

    fn production() -> Self {
        let mut config = Self::base(Environment::Production);
        config.database.max_connections = 50;
        config.database.connection_timeout = 5;
        config.database.apply_schema = false;
        config.security.cors_origins = vec!["https://app.example.com".to_string()];
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.server.port, 5000);
        assert!(config.database.apply_schema);
        assert_eq!(config.workflow, WorkflowPolicy::admin_desk());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::from_lookup(lookup(&[("APP_ENV", "production")])).unwrap();
        assert_eq!(config.database.max_connections, 50);
        assert!(!config.database.apply_schema);
    }

    #[test]
    fn legacy_variable_names_are_honoured() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("FIREBASE_API_KEY", "key-1"),
            ("EMAIL_USER", "desk@school.test"),
        ]))
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.identity.api_key, "key-1");
        assert_eq!(config.mail.from_address, "desk@school.test");
    }

    #[test]
    fn smtp_settings_from_env() {
        let config = AppConfig::from_lookup(lookup(&[
            ("EMAIL_USER", "desk@school.test"),
            ("EMAIL_PASSWORD", "app-password"),
        ]))
        .unwrap();
        assert_eq!(config.mail.smtp_host.as_deref(), Some("smtp.gmail.com"));
        assert_eq!(config.mail.smtp_username.as_deref(), Some("desk@school.test"));
        assert_eq!(config.mail.smtp_password.as_deref(), Some("app-password"));
        assert_eq!(config.mail.smtp_security, SmtpSecurity::Tls);

        let config = AppConfig::from_lookup(lookup(&[
            ("MAIL_SMTP_HOST", "relay.school.test"),
            ("MAIL_SMTP_PORT", "2525"),
            ("MAIL_SMTP_SECURITY", "STARTTLS"),
        ]))
        .unwrap();
        assert_eq!(config.mail.smtp_host.as_deref(), Some("relay.school.test"));
        assert_eq!(config.mail.smtp_port, Some(2525));
        assert_eq!(config.mail.smtp_security, SmtpSecurity::StartTls);
        assert!(config.mail.smtp_password.is_none());

        let err = AppConfig::from_lookup(lookup(&[("MAIL_SMTP_SECURITY", "carrier-pigeon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "MAIL_SMTP_SECURITY", .. }));
    }

    #[test]
    fn workflow_overrides_apply_after_preset() {
        let config = AppConfig::from_lookup(lookup(&[
            ("WORKFLOW_VARIANT", "personnel-desk"),
            ("WORKFLOW_AUDIENCE_ROLES", "personnel"),
            ("WORKFLOW_ASSIGNABLE_STATUSES", "completed, rejected"),
        ]))
        .unwrap();
        assert_eq!(config.workflow.initial_status, RequestStatus::NotStarted);
        assert_eq!(config.workflow.new_request_audience_roles, vec![Role::Personnel]);
        assert_eq!(
            config.workflow.assignable_statuses,
            vec![RequestStatus::Completed, RequestStatus::Rejected]
        );
    }

    #[test]
    fn invalid_values_are_errors() {
        let err = AppConfig::from_lookup(lookup(&[("DOCREQ_PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "DOCREQ_PORT", .. }));

        let err = AppConfig::from_lookup(lookup(&[("WORKFLOW_READER_ROLES", "admin,janitor")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "WORKFLOW_READER_ROLES", .. }));

        let err = AppConfig::from_lookup(lookup(&[("WORKFLOW_POLICY_FILE", "/nonexistent/policy.yaml")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::PolicyFile { .. }));
    }
}
