use crate::services::{IdentityError, IdentityVerifier};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// Verifies member credentials by asking the hosted auth service who they belong to
/// (`GET {base_url}/auth/v1/user`).
#[derive(Clone)]
pub struct HostedAuthVerifier {
    http: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    #[serde(default)]
    email: Option<String>,
}

impl HostedAuthVerifier {
    pub fn new(base_url: &str, api_key: String) -> Self {
        let http = Client::builder()
            .user_agent("perk-codes/identity")
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn user_endpoint(&self) -> String {
        format!("{}/auth/v1/user", self.base_url)
    }
}

#[async_trait]
impl IdentityVerifier for HostedAuthVerifier {
    async fn verify(&self, token: &str) -> Result<String, IdentityError> {
        let mut req = self.http.get(self.user_endpoint()).bearer_auth(token);
        if !self.api_key.is_empty() {
            req = req.header("apikey", &self.api_key);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        match resp.status() {
            s if s.is_success() => {
                let user: AuthUser = resp
                    .json()
                    .await
                    .map_err(|e| IdentityError::Unavailable(e.to_string()))?;
                user.email
                    .filter(|e| !e.trim().is_empty())
                    .ok_or(IdentityError::Rejected)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                Err(IdentityError::Rejected)
            }
            s => Err(IdentityError::Unavailable(format!(
                "auth service answered HTTP {}",
                s.as_u16()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_endpoint_trims_trailing_slash() {
        let verifier = HostedAuthVerifier::new("https://auth.example.com/", String::new());
        assert_eq!(
            verifier.user_endpoint(),
            "https://auth.example.com/auth/v1/user"
        );
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        // port 9 (discard) on localhost refuses connections
        let verifier = HostedAuthVerifier::new("http://127.0.0.1:9", String::new());
        assert!(matches!(
            verifier.verify("token").await,
            Err(IdentityError::Unavailable(_))
        ));
    }
}
