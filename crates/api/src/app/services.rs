//! Service wiring: stores, token service and mailer, built once at startup
//! and shared with every handler through an `Extension`.

use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::PgPool;

use bytebasket_auth::{hash_password, Hs256Jwt, NewUser, Role, User};
use bytebasket_infra::mail::verification_email;
use bytebasket_infra::{
    db, FoodbankStore, InMemoryFoodbankStore, InMemoryInventoryStore, InMemoryUserStore,
    InventoryStore, MailError, Mailer, PostgresFoodbankStore, PostgresInventoryStore,
    PostgresUserStore, SmtpMailer, TracingMailer, UserStore,
};

use crate::app::errors::ApiError;
use crate::config::AppConfig;

pub struct AppServices {
    pub config: AppConfig,
    pub jwt: Arc<Hs256Jwt>,
    pub users: Arc<dyn UserStore>,
    pub foodbanks: Arc<dyn FoodbankStore>,
    pub inventory: Arc<dyn InventoryStore>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppServices {
    /// Postgres-backed when `DATABASE_URL` is set, in-memory otherwise.
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let mailer = mailer_from(&config)?;
        match config.database_url.clone() {
            Some(url) => {
                let pool = db::connect(&url, config.database_max_connections).await?;
                db::ensure_schema(&pool).await?;
                tracing::info!("using postgres stores");
                Ok(Self::postgres(config, pool, mailer))
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory stores (data is not persisted)");
                Ok(Self::in_memory(config, mailer))
            }
        }
    }

    pub fn in_memory(config: AppConfig, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            jwt: Arc::new(jwt_from(&config)),
            config,
            users: Arc::new(InMemoryUserStore::new()),
            foodbanks: Arc::new(InMemoryFoodbankStore::new()),
            inventory: Arc::new(InMemoryInventoryStore::new()),
            mailer,
        }
    }

    pub fn postgres(config: AppConfig, pool: PgPool, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            jwt: Arc::new(jwt_from(&config)),
            config,
            users: Arc::new(PostgresUserStore::new(pool.clone())),
            foodbanks: Arc::new(PostgresFoodbankStore::new(pool.clone())),
            inventory: Arc::new(PostgresInventoryStore::new(pool)),
            mailer,
        }
    }

    pub fn issue_token(&self, user: &User) -> Result<String, ApiError> {
        Ok(self.jwt.issue(&user.principal(), Utc::now())?)
    }

    /// Delivery failures are logged and never surface to the caller.
    pub async fn send_verification(&self, user: &User) {
        let Some(token) = user.verification_token.as_deref() else {
            return;
        };
        let message = verification_email(
            &self.config.mail_from,
            &user.email,
            &user.name,
            &self.config.verification_url(token),
        );
        if let Err(e) = self.mailer.send(message).await {
            tracing::warn!(user_id = %user.id, error = %e, "verification email not sent");
        }
    }

    /// Create the configured seed admin unless an account with that email exists.
    pub async fn bootstrap_admin(&self) -> Result<(), ApiError> {
        let Some(admin) = self.config.bootstrap_admin.clone() else {
            return Ok(());
        };
        let email = bytebasket_auth::user::normalize_email(&admin.email)?;
        if self.users.find_by_email(&email).await?.is_some() {
            tracing::debug!(email = %email, "bootstrap admin already present");
            return Ok(());
        }

        let now = Utc::now();
        let mut user = User::register(
            NewUser {
                email,
                name: "Administrator".to_string(),
                password_hash: hash_password(&admin.password)?,
                role: Role::Admin,
                foodbank_id: None,
            },
            now,
        )?;
        user.mark_verified(now);
        let user = self.users.insert(user).await?;
        tracing::info!(user_id = %user.id, "bootstrap admin created");
        Ok(())
    }
}

/// SMTP when a relay is configured; otherwise messages are only logged.
pub fn mailer_from(config: &AppConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match &config.smtp {
        Some(smtp) => {
            tracing::info!(host = %smtp.host, port = smtp.port, "using smtp mailer");
            Ok(Arc::new(SmtpMailer::new(smtp)?))
        }
        None => {
            tracing::warn!("SMTP_HOST not set; emails are logged, not delivered");
            Ok(Arc::new(TracingMailer))
        }
    }
}

fn jwt_from(config: &AppConfig) -> Hs256Jwt {
    Hs256Jwt::new(
        config.jwt_secret.as_bytes(),
        config.jwt_issuer.clone(),
        Duration::minutes(config.jwt_expiration_minutes),
    )
}
