//! HS256 token issuing and validation.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::{validate_claims, JwtClaims, Principal, TokenValidationError};

/// Decodes a bearer token into validated claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

/// Symmetric (HS256) token service: signs tokens at login and validates them
/// in the request middleware.
#[derive(Clone)]
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl: Duration,
}

impl Hs256Jwt {
    pub fn new(secret: &[u8], issuer: impl Into<String>, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            ttl,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `principal`, valid from `now` for the configured TTL.
    pub fn issue(&self, principal: &Principal, now: DateTime<Utc>) -> Result<String, TokenValidationError> {
        let claims = JwtClaims {
            sub: principal.user_id,
            email: principal.email.clone(),
            role: principal.role,
            foodbank_id: principal.foodbank_id,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            iss: self.issuer.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenValidationError::Malformed(format!("signing failed: {e}")))
    }
}

impl core::fmt::Debug for Hs256Jwt {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256Jwt")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        // Time checks are done by `validate_claims` against the caller's clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::new();
        validation.set_issuer(&[self.issuer.as_str()]);

        let data = decode::<JwtClaims>(token, &self.decoding, &validation)
            .map_err(|e| TokenValidationError::Malformed(e.to_string()))?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use bytebasket_core::{FoodbankId, UserId};

    fn service(secret: &str) -> Hs256Jwt {
        Hs256Jwt::new(secret.as_bytes(), "bytebasket", Duration::minutes(30))
    }

    fn staff() -> Principal {
        Principal::new(UserId::new(), "staff@example.org", Role::Staff, Some(FoodbankId::new()))
    }

    #[test]
    fn issued_token_validates() {
        let jwt = service("secret");
        let now = Utc::now();
        let principal = staff();

        let token = jwt.issue(&principal, now).unwrap();
        let claims = jwt.validate(&token, now).unwrap();

        assert_eq!(claims.sub, principal.user_id);
        assert_eq!(claims.role, principal.role);
        assert_eq!(claims.foodbank_id, principal.foodbank_id);
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let now = Utc::now();
        let token = service("secret-a").issue(&staff(), now).unwrap();
        let err = service("secret-b").validate(&token, now).unwrap_err();
        assert!(matches!(err, TokenValidationError::Malformed(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let jwt = service("secret");
        let issued = Utc::now() - Duration::hours(2);
        let token = jwt.issue(&staff(), issued).unwrap();
        assert_eq!(jwt.validate(&token, Utc::now()), Err(TokenValidationError::Expired));
    }

    #[test]
    fn foreign_issuer_is_rejected() {
        let now = Utc::now();
        let other = Hs256Jwt::new(b"secret", "someone-else", Duration::minutes(5));
        let token = other.issue(&staff(), now).unwrap();
        assert!(service("secret").validate(&token, now).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(service("secret").validate("not.a.token", Utc::now()).is_err());
    }
}
