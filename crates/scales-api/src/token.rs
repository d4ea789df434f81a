use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use scales_types::api::Claims;

use crate::error::ApiError;

/// Signs and verifies session tokens. Constructed once at startup from the
/// configured secret; nothing else in the process touches the key material.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validity: Duration,
}

impl TokenService {
    pub fn new(secret: &str, validity_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validity: Duration::seconds(validity_secs),
        }
    }

    pub fn mint(&self, user_id: &str) -> Result<String, ApiError> {
        self.mint_with_validity(user_id, self.validity)
    }

    /// Zero-validity token handed out on logout; the caller is expected to
    /// overwrite its session state with it and discard the old token.
    pub fn mint_expired(&self, user_id: &str) -> Result<String, ApiError> {
        self.mint_with_validity(user_id, Duration::zero())
    }

    fn mint_with_validity(&self, user_id: &str, validity: Duration) -> Result<String, ApiError> {
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (Utc::now() + validity).timestamp() as usize,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Store(anyhow::anyhow!("token encoding failed: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| ApiError::Unauthorized)
    }

    /// Verify plus check that the token's identity matches the acting user.
    pub fn authorize(&self, token: &str, user_id: &str) -> Result<Claims, ApiError> {
        let claims = self.verify(token)?;
        if claims.sub != user_id {
            return Err(ApiError::Unauthorized);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret", 3600)
    }

    #[test]
    fn minted_token_verifies() {
        let tokens = service();
        let token = tokens.mint("u1").unwrap();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, "u1");
    }

    #[test]
    fn expired_token_is_unauthorized() {
        let tokens = service();
        let token = tokens
            .mint_with_validity("u1", Duration::seconds(-1))
            .unwrap();
        assert!(matches!(tokens.verify(&token), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn tampered_token_is_unauthorized() {
        let tokens = service();
        let mut token = tokens.mint("u1").unwrap();
        token.push('x');
        assert!(matches!(tokens.verify(&token), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn token_from_other_secret_is_unauthorized() {
        let token = TokenService::new("other-secret", 3600).mint("u1").unwrap();
        assert!(matches!(
            service().verify(&token),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn authorize_requires_matching_identity() {
        let tokens = service();
        let token = tokens.mint("u1").unwrap();
        assert!(tokens.authorize(&token, "u1").is_ok());
        assert!(matches!(
            tokens.authorize(&token, "u2"),
            Err(ApiError::Unauthorized)
        ));
    }
}
