use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::types::{AuthError, Claims, Principal};

/// How long a sign-in stays valid.
pub const SESSION_HOURS: i64 = 24;

/// Issues and verifies the HS256 tokens carried in the auth cookie.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    /// Builds a service signing with the given shared secret.
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Generates a session token for the principal.
    pub fn generate_token(&self, principal: &Principal) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: principal.id.to_string(),
            username: principal.username.clone(),
            exp: (now + Duration::hours(SESSION_HOURS)).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Verifies signature and expiry, returning the raw claims.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let token_data = decode::<Claims>(
            token,
            &self.decoding_key,
            &Validation::new(Algorithm::HS256),
        )?;

        Ok(token_data.claims)
    }

    /// Resolves the principal a token was issued for.
    pub fn principal_from_token(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = self.verify_token(token)?;
        let id = Uuid::parse_str(&claims.sub).map_err(|_| {
            AuthError::Jwt(jsonwebtoken::errors::Error::from(
                jsonwebtoken::errors::ErrorKind::InvalidSubject,
            ))
        })?;

        Ok(Principal {
            id,
            username: claims.username,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_resolves_to_the_same_principal() {
        let service = JwtService::new("test-secret");
        let principal = Principal {
            id: Uuid::new_v4(),
            username: "ranger".to_string(),
        };

        let token = service.generate_token(&principal).unwrap();
        assert_eq!(service.principal_from_token(&token).unwrap(), principal);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let principal = Principal {
            id: Uuid::new_v4(),
            username: "ranger".to_string(),
        };
        let token = JwtService::new("one").generate_token(&principal).unwrap();

        assert!(matches!(
            JwtService::new("two").principal_from_token(&token),
            Err(AuthError::Jwt(_))
        ));
    }
}
