use crate::services::{IdentityError, IdentityVerifier};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
}

/// Verifies member access tokens signed with a shared HS256 secret
/// (the format hosted auth providers issue to signed-in members).
#[derive(Clone)]
pub struct JwtIdentityVerifier {
    decoding_key: DecodingKey,
}

impl JwtIdentityVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        // audience differs between providers; signature and expiry are what matter here
        validation.validate_aud = false;
        decode::<Claims>(token, &self.decoding_key, &validation).map(|data| data.claims)
    }
}

#[async_trait]
impl IdentityVerifier for JwtIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<String, IdentityError> {
        let claims = self.verify_token(token).map_err(|e| {
            log::debug!("Member token rejected: {e}");
            IdentityError::Rejected
        })?;
        claims
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or(IdentityError::Rejected)
    }
}
