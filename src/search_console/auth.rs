use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::error::{ReportError, Result};

/// Read-only Search Console scope; the digest never writes anything.
pub const SCOPE: &str = "https://www.googleapis.com/auth/webmasters.readonly";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;

/// The subset of a Google service-account key file the digest needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Bearer token returned by the OAuth token endpoint.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: String) -> Self {
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Signs JWT bearer assertions for one service account.
pub struct ServiceAccountAuth {
    encoding_key: EncodingKey,
    client_email: String,
    token_uri: String,
}

impl ServiceAccountAuth {
    pub fn new(account: &ServiceAccount) -> Result<Self> {
        // Accepts both PKCS#8 (console key files) and PKCS#1 PEM.
        let encoding_key = EncodingKey::from_rsa_pem(account.private_key.as_bytes()).map_err(|e| {
            ReportError::Authentication(format!("Failed to parse service-account private key: {}", e))
        })?;
        Ok(Self {
            encoding_key,
            client_email: account.client_email.clone(),
            token_uri: account.token_uri.clone(),
        })
    }

    pub fn claims(&self, issued_at: i64) -> Claims {
        Claims {
            iss: self.client_email.clone(),
            scope: SCOPE.to_string(),
            aud: self.token_uri.clone(),
            iat: issued_at,
            exp: issued_at + TOKEN_LIFETIME_SECS,
        }
    }

    /// Signed RS256 JWT for the bearer grant.
    pub fn assertion(&self, issued_at: i64) -> Result<String> {
        encode(&Header::new(Algorithm::RS256), &self.claims(issued_at), &self.encoding_key)
            .map_err(|e| ReportError::Authentication(format!("Failed to sign assertion: {}", e)))
    }

    /// Exchange a fresh assertion for an access token.
    pub async fn fetch_token(&self, http: &Client) -> Result<AccessToken> {
        let assertion = self.assertion(chrono::Utc::now().timestamp())?;

        let resp = http
            .post(&self.token_uri)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| ReportError::Authentication(format!("Token request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ReportError::Authentication(format!(
                "Token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| ReportError::Authentication(format!("Failed to parse token response: {}", e)))?;
        debug!(client_email = %self.client_email, "Obtained Search Console access token");
        Ok(AccessToken::new(token.access_token))
    }
}
