//! `bytebasket-auth` — authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it knows how
//! to hash passwords, issue and validate tokens, and decide what a principal
//! may do, but not where users live or how requests arrive.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod user;

pub use authorize::{authorize, ensure_can_mutate, resolve_scope, AuthzError, FoodbankScope};
pub use claims::{validate_claims, JwtClaims, TokenValidationError};
pub use jwt::{Hs256Jwt, JwtValidator};
pub use password::{hash_password, validate_password, verify_password, PasswordError};
pub use permissions::Capability;
pub use principal::Principal;
pub use roles::Role;
pub use user::{NewUser, User};
