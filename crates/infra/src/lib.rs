//! Infrastructure layer: stores, database, mail and export adapters.

pub mod db;
pub mod error;
pub mod export;
pub mod foodbank_store;
pub mod inventory_store;
pub mod mail;
pub mod user_store;

pub use error::StoreError;
pub use foodbank_store::{FoodbankStore, InMemoryFoodbankStore, PostgresFoodbankStore};
pub use inventory_store::{InMemoryInventoryStore, InventoryStore, PostgresInventoryStore};
pub use mail::{
    EmailMessage, InMemoryMailer, MailError, Mailer, SmtpCredentials, SmtpMailer, SmtpSecurity,
    SmtpSettings, TracingMailer,
};
pub use user_store::{InMemoryUserStore, PostgresUserStore, UserStore};
