//! Process configuration, read once at startup from the environment.
//!
//! `main` loads a `.env` file (if any) with `dotenvy` before calling
//! [`AppConfig::from_env`]; everything downstream receives the built config.

use std::net::SocketAddr;

use thiserror::Error;

use bytebasket_infra::{SmtpCredentials, SmtpSecurity, SmtpSettings};
use bytebasket_observability::LogFormat;

const DEVELOPMENT: &str = "development";
const DEV_JWT_SECRET: &str = "dev-JWT_SECRET-not-for-production";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be set in {environment} environment")]
    Missing { name: &'static str, environment: String },

    #[error("invalid value for {name}: '{value}' ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Seed administrator created at startup when both variables are set.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

#[derive(Clone)]
pub struct AppConfig {
    /// development | staging | production
    pub environment: String,
    pub bind_addr: SocketAddr,
    /// Unset means in-memory stores.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_expiration_minutes: i64,
    pub mail_from: String,
    /// Unset means mail is only logged, which is allowed in development only.
    pub smtp: Option<SmtpSettings>,
    /// Public base URL used in links sent by email.
    pub app_base_url: String,
    pub log_format: LogFormat,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let environment = var("ENVIRONMENT").unwrap_or_else(|| DEVELOPMENT.to_string());

        let bind_addr: SocketAddr = parse_or("BIND_ADDR", var("BIND_ADDR"), "0.0.0.0:8080".parse().ok())?;
        let database_max_connections: u32 =
            parse_or("DATABASE_MAX_CONNECTIONS", var("DATABASE_MAX_CONNECTIONS"), Some(10))?;
        if database_max_connections == 0 {
            return Err(invalid("DATABASE_MAX_CONNECTIONS", "0", "must be positive"));
        }
        let jwt_expiration_minutes: i64 =
            parse_or("JWT_EXPIRATION_MINUTES", var("JWT_EXPIRATION_MINUTES"), Some(1440))?;
        if jwt_expiration_minutes <= 0 {
            return Err(invalid(
                "JWT_EXPIRATION_MINUTES",
                &jwt_expiration_minutes.to_string(),
                "must be positive",
            ));
        }

        let log_format = match var("LOG_FORMAT") {
            Some(raw) => raw
                .parse::<LogFormat>()
                .map_err(|e| invalid("LOG_FORMAT", &raw, &e.to_string()))?,
            None => LogFormat::default(),
        };

        let jwt_secret = require_secret("JWT_SECRET", var("JWT_SECRET"), &environment, DEV_JWT_SECRET)?;
        let smtp = smtp_settings(&var, &environment)?;

        let bootstrap_admin = match (var("BOOTSTRAP_ADMIN_EMAIL"), var("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin { email, password }),
            _ => None,
        };

        Ok(Self {
            jwt_secret,
            environment,
            bind_addr,
            database_url: var("DATABASE_URL"),
            database_max_connections,
            jwt_issuer: var("JWT_ISSUER").unwrap_or_else(|| "bytebasket".to_string()),
            jwt_expiration_minutes,
            mail_from: var("MAIL_FROM").unwrap_or_else(|| "no-reply@bytebasket.local".to_string()),
            smtp,
            app_base_url: var("APP_BASE_URL")
                .unwrap_or_else(|| "http://localhost:8080".to_string())
                .trim_end_matches('/')
                .to_string(),
            log_format,
            bootstrap_admin,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == DEVELOPMENT
    }

    /// True when running on the built-in development JWT secret.
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    pub fn verification_url(&self, token: &str) -> String {
        format!("{}/api/auth/verify-email?token={token}", self.app_base_url)
    }
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("environment", &self.environment)
            .field("bind_addr", &self.bind_addr)
            .field("database", &self.database_url.as_ref().map(|_| "<set>"))
            .field("database_max_connections", &self.database_max_connections)
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_expiration_minutes", &self.jwt_expiration_minutes)
            .field("mail_from", &self.mail_from)
            .field("smtp", &self.smtp)
            .field("app_base_url", &self.app_base_url)
            .field("log_format", &self.log_format)
            .field("bootstrap_admin", &self.bootstrap_admin.as_ref().map(|a| &a.email))
            .finish_non_exhaustive()
    }
}

/// Secrets must be set outside development; development gets a marked default.
fn require_secret(
    name: &'static str,
    value: Option<String>,
    environment: &str,
    dev_default: &str,
) -> Result<String, ConfigError> {
    match value {
        Some(v) => Ok(v),
        None if environment == DEVELOPMENT => Ok(dev_default.to_string()),
        None => Err(ConfigError::Missing {
            name,
            environment: environment.to_string(),
        }),
    }
}

/// SMTP relay settings. Outside development a relay is mandatory.
fn smtp_settings<V>(var: &V, environment: &str) -> Result<Option<SmtpSettings>, ConfigError>
where
    V: Fn(&str) -> Option<String>,
{
    let Some(host) = var("SMTP_HOST") else {
        if environment == DEVELOPMENT {
            return Ok(None);
        }
        return Err(ConfigError::Missing {
            name: "SMTP_HOST",
            environment: environment.to_string(),
        });
    };

    let port: u16 = parse_or("SMTP_PORT", var("SMTP_PORT"), Some(587))?;
    let security = match var("SMTP_SECURITY") {
        Some(raw) => raw
            .parse::<SmtpSecurity>()
            .map_err(|e| invalid("SMTP_SECURITY", &raw, &e.to_string()))?,
        None => SmtpSecurity::for_port(port),
    };
    let credentials = match (var("SMTP_USERNAME"), var("SMTP_PASSWORD")) {
        (Some(username), Some(password)) => Some(SmtpCredentials { username, password }),
        (None, None) => None,
        (Some(_), None) => return Err(invalid("SMTP_PASSWORD", "", "required when SMTP_USERNAME is set")),
        (None, Some(_)) => return Err(invalid("SMTP_USERNAME", "", "required when SMTP_PASSWORD is set")),
    };

    Ok(Some(SmtpSettings {
        host,
        port,
        security,
        credentials,
    }))
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: Option<T>) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    match raw {
        Some(raw) => raw.parse::<T>().map_err(|e| invalid(name, &raw, &e.to_string())),
        None => default.ok_or_else(|| invalid(name, "", "no default available")),
    }
}

fn invalid(name: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_in_development() {
        let cfg = config(&[]).unwrap();
        assert!(cfg.is_development());
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.database_max_connections, 10);
        assert_eq!(cfg.jwt_issuer, "bytebasket");
        assert_eq!(cfg.jwt_expiration_minutes, 1440);
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert!(cfg.bootstrap_admin.is_none());
        assert!(cfg.uses_default_secret());
    }

    #[test]
    fn secret_is_required_outside_development() {
        let err = config(&[("ENVIRONMENT", "production")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Missing {
                name: "JWT_SECRET",
                environment: "production".to_string()
            }
        );

        let cfg = config(&[
            ("ENVIRONMENT", "production"),
            ("JWT_SECRET", "s3cret"),
            ("SMTP_HOST", "smtp.example.org"),
        ])
        .unwrap();
        assert_eq!(cfg.jwt_secret, "s3cret");
        assert!(!cfg.uses_default_secret());
    }

    #[test]
    fn mail_is_only_logged_in_development() {
        assert!(config(&[]).unwrap().smtp.is_none());

        let err = config(&[("ENVIRONMENT", "production"), ("JWT_SECRET", "s3cret")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Missing {
                name: "SMTP_HOST",
                environment: "production".to_string()
            }
        );
    }

    #[test]
    fn smtp_settings_are_read() {
        let smtp = config(&[
            ("SMTP_HOST", "smtp.example.org"),
            ("SMTP_USERNAME", "bytebasket"),
            ("SMTP_PASSWORD", "app-password"),
        ])
        .unwrap()
        .smtp
        .unwrap();
        assert_eq!(smtp.host, "smtp.example.org");
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.security, SmtpSecurity::StartTls);
        assert_eq!(smtp.credentials.map(|c| c.username), Some("bytebasket".to_string()));

        let smtp = config(&[("SMTP_HOST", "smtp.example.org"), ("SMTP_PORT", "465")])
            .unwrap()
            .smtp
            .unwrap();
        assert_eq!(smtp.security, SmtpSecurity::Tls);
        assert!(smtp.credentials.is_none());

        let smtp = config(&[
            ("SMTP_HOST", "localhost"),
            ("SMTP_PORT", "1025"),
            ("SMTP_SECURITY", "none"),
        ])
        .unwrap()
        .smtp
        .unwrap();
        assert_eq!(smtp.security, SmtpSecurity::None);
    }

    #[test]
    fn smtp_credentials_come_in_pairs() {
        assert!(matches!(
            config(&[("SMTP_HOST", "smtp.example.org"), ("SMTP_USERNAME", "bytebasket")]),
            Err(ConfigError::Invalid { name: "SMTP_PASSWORD", .. })
        ));
        assert!(matches!(
            config(&[("SMTP_HOST", "smtp.example.org"), ("SMTP_PORT", "smtp")]),
            Err(ConfigError::Invalid { name: "SMTP_PORT", .. })
        ));
        assert!(matches!(
            config(&[("SMTP_HOST", "smtp.example.org"), ("SMTP_SECURITY", "maybe")]),
            Err(ConfigError::Invalid { name: "SMTP_SECURITY", .. })
        ));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let cfg = config(&[
            ("JWT_SECRET", "jwt-top-secret"),
            ("SMTP_HOST", "smtp.example.org"),
            ("SMTP_USERNAME", "bytebasket"),
            ("SMTP_PASSWORD", "smtp-top-secret"),
        ])
        .unwrap();
        let debug = format!("{cfg:?}");
        assert!(debug.contains("smtp.example.org"));
        assert!(!debug.contains("jwt-top-secret"));
        assert!(!debug.contains("smtp-top-secret"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            config(&[("BIND_ADDR", "nowhere")]),
            Err(ConfigError::Invalid { name: "BIND_ADDR", .. })
        ));
        assert!(matches!(
            config(&[("JWT_EXPIRATION_MINUTES", "0")]),
            Err(ConfigError::Invalid { name: "JWT_EXPIRATION_MINUTES", .. })
        ));
        assert!(matches!(
            config(&[("LOG_FORMAT", "xml")]),
            Err(ConfigError::Invalid { name: "LOG_FORMAT", .. })
        ));
    }

    #[test]
    fn verification_url_uses_base_url() {
        let cfg = config(&[("APP_BASE_URL", "https://bytebasket.example/")]).unwrap();
        assert_eq!(
            cfg.verification_url("abc"),
            "https://bytebasket.example/api/auth/verify-email?token=abc"
        );
    }

    #[test]
    fn bootstrap_admin_needs_both_values() {
        assert!(config(&[("BOOTSTRAP_ADMIN_EMAIL", "root@example.org")])
            .unwrap()
            .bootstrap_admin
            .is_none());
        let cfg = config(&[
            ("BOOTSTRAP_ADMIN_EMAIL", "root@example.org"),
            ("BOOTSTRAP_ADMIN_PASSWORD", "change-me-now"),
        ])
        .unwrap();
        assert_eq!(cfg.bootstrap_admin.map(|a| a.email), Some("root@example.org".to_string()));
    }
}
