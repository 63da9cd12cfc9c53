//! JWT encoding and decoding utilities.

use super::types::Claims;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

/// Encode claims into a JWT token.
pub fn encode_token(claims: &Claims, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Decode and validate a JWT token.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;

    Ok(token_data.claims)
}

/// Token decoder shared by the auth gate.
pub struct TokenDecoder {
    secret: String,
}

impl TokenDecoder {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn decode(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode_token(token, &self.secret)
    }

    /// Issue an access token for `claims` with the same secret.
    pub fn encode(&self, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
        encode_token(claims, &self.secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_common_core::UserId;
    use tokio_test::{assert_err, assert_ok};

    const SECRET: &str = "test_secret_key_32_chars_long!!!";

    #[test]
    fn test_encode_decode_roundtrip() {
        let claims = Claims::new_access(UserId::new(), 3600);

        let token = encode_token(&claims, SECRET).unwrap();
        let decoded = decode_token(&token, SECRET).unwrap();

        assert_eq!(decoded.sub, claims.sub);
        assert_eq!(decoded.jti, claims.jti);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = encode_token(&Claims::new_access(UserId::new(), 3600), SECRET).unwrap();
        assert_err!(decode_token(&token, "another_secret_that_is_long_enough"));
        assert_ok!(decode_token(&token, SECRET));
    }

    #[test]
    fn test_expired_token_rejected() {
        // Beyond the default 60s leeway.
        let token = encode_token(&Claims::new_access(UserId::new(), -600), SECRET).unwrap();
        assert_err!(TokenDecoder::new(SECRET).decode(&token));
    }
}
