//! Bearer-token identity provider (HS256 JWT).

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use astral_auth::{Identity, IdentityProvider, SessionClaims, TokenValidationError, validate_claims};

pub struct Hs256IdentityProvider {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256IdentityProvider {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // The time window is checked by `validate_claims` against the caller's instant.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl IdentityProvider for Hs256IdentityProvider {
    fn authenticate(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, TokenValidationError> {
        let data = decode::<SessionClaims>(token, &self.key, &self.validation)
            .map_err(|e| TokenValidationError::Malformed(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims.identity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token(secret: &str, claims: &SessionClaims) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_yields_subject() {
        let now = Utc::now();
        let claims = SessionClaims::new("auth|profesora", now - Duration::minutes(1), now + Duration::minutes(10));
        let provider = Hs256IdentityProvider::new(b"test-secret");

        let identity = provider.authenticate(&token("test-secret", &claims), now).unwrap();
        assert_eq!(identity.subject, "auth|profesora");
    }

    #[test]
    fn wrong_secret_is_malformed() {
        let now = Utc::now();
        let claims = SessionClaims::new("auth|x", now, now + Duration::minutes(10));
        let provider = Hs256IdentityProvider::new(b"test-secret");

        assert!(matches!(
            provider.authenticate(&token("other", &claims), now),
            Err(TokenValidationError::Malformed(_))
        ));
        assert!(matches!(
            provider.authenticate("not-a-jwt", now),
            Err(TokenValidationError::Malformed(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now();
        let claims = SessionClaims::new("auth|x", now - Duration::hours(2), now - Duration::hours(1));
        let provider = Hs256IdentityProvider::new(b"test-secret");

        assert_eq!(
            provider.authenticate(&token("test-secret", &claims), now),
            Err(TokenValidationError::Expired)
        );
    }
}
