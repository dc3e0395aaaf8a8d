//! Member identity verification.
//!
//! A member bearer credential is opaque to this service; an [`IdentityVerifier`]
//! turns it into a verified email or refuses it.

use crate::config::IdentityConfig;
use crate::error::AppError;
use crate::external::HostedAuthVerifier;
use crate::utils::JwtIdentityVerifier;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    /// The credential is invalid, expired or carries no email.
    #[error("credential rejected")]
    Rejected,

    /// The verifier could not be reached or answered unexpectedly.
    #[error("identity verifier unavailable: {0}")]
    Unavailable(String),
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Rejected => AppError::InvalidToken,
            IdentityError::Unavailable(msg) => AppError::IdentityUnavailable(msg),
        }
    }
}

/// Maps a member bearer credential to the email it was issued for.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<String, IdentityError>;
}

/// Used when no verifier is configured: every credential is refused.
pub struct RejectAllVerifier;

#[async_trait]
impl IdentityVerifier for RejectAllVerifier {
    async fn verify(&self, _token: &str) -> Result<String, IdentityError> {
        Err(IdentityError::Rejected)
    }
}

/// Picks the verifier from configuration: local JWT secret first, then the
/// hosted auth endpoint.
pub fn build_identity_verifier(cfg: &IdentityConfig) -> Arc<dyn IdentityVerifier> {
    if let Some(secret) = cfg.jwt_secret.as_deref().filter(|s| !s.is_empty()) {
        log::info!("Member credentials verified locally (HS256)");
        return Arc::new(JwtIdentityVerifier::new(secret));
    }
    if let Some(url) = cfg.auth_url.as_deref().filter(|s| !s.is_empty()) {
        log::info!("Member credentials verified against {url}");
        return Arc::new(HostedAuthVerifier::new(
            url,
            cfg.api_key.clone().unwrap_or_default(),
        ));
    }
    log::warn!("No identity verifier configured; member listings will be refused");
    Arc::new(RejectAllVerifier)
}
