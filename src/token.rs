use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize, Serialize)]
pub struct Claims {
    pub sub: String,
    /// Unique per issued token so two logins in the same second differ.
    pub jti: String,
    pub iat: usize,
    pub exp: usize,
}

/// Signs session tokens. Issued tokens are only honoured while they are
/// also present in the owner's stored token list.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, user_id: Uuid) -> AppResult<String> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

        let claims = Claims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp().max(0) as usize,
            exp: expiration.timestamp().max(0) as usize,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
    }

    /// Check signature and, unless `allow_expired`, expiry.
    pub fn verify(
        &self,
        token: &str,
        allow_expired: bool,
    ) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::default();
        if allow_expired {
            validation.validate_exp = false;
        }
        decode::<Claims>(token, &self.decoding, &validation).map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies_to_its_subject() {
        let issuer = TokenIssuer::new("secret", Duration::days(7));
        let user_id = Uuid::new_v4();
        let token = issuer.issue(user_id).unwrap();
        let claims = issuer.verify(&token, false).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
    }

    #[test]
    fn tokens_are_unique_per_issue() {
        let issuer = TokenIssuer::new("secret", Duration::days(7));
        let user_id = Uuid::new_v4();
        assert_ne!(issuer.issue(user_id).unwrap(), issuer.issue(user_id).unwrap());
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let ours = TokenIssuer::new("secret", Duration::days(7));
        let theirs = TokenIssuer::new("other", Duration::days(7));
        let token = theirs.issue(Uuid::new_v4()).unwrap();
        assert!(ours.verify(&token, false).is_err());
        assert!(ours.verify(&token, true).is_err());
    }

    #[test]
    fn expired_token_only_passes_when_allowed() {
        let issuer = TokenIssuer::new("secret", Duration::hours(-2));
        let token = issuer.issue(Uuid::new_v4()).unwrap();
        assert!(issuer.verify(&token, false).is_err());
        assert!(issuer.verify(&token, true).is_ok());
    }
}
