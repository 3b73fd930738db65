//! Login and session token handling.
//!
//! One call to the remote account endpoint exchanges `{email, password}` for
//! a bearer token. Every failure mode (bad credentials, transport error,
//! malformed response) collapses into [`SearchError::AuthenticationFailed`]
//! so the raw cause never reaches user-visible text; the detail is logged.

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{ApiConfig, SearchError};

/// Process-wide session state. Holds the only value that outlives a single
/// search controller: the bearer token gating the search view.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
}

impl Session {
    /// Wrap a token obtained from the login endpoint. Empty tokens are a
    /// malformed response and count as login failure.
    pub fn new(token: String) -> Result<Self, SearchError> {
        if token.is_empty() {
            warn!("login response carried an empty token");
            return Err(SearchError::AuthenticationFailed);
        }
        Ok(Self { token })
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

#[derive(Debug, Deserialize)]
struct LoginEnvelope {
    data: Option<LoginData>,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    token: Option<String>,
}

/// Client for the account login endpoint.
pub struct AuthClient {
    http_client: Client,
    base_url: String,
}

impl AuthClient {
    pub fn new(config: &ApiConfig) -> Result<Self, SearchError> {
        debug!("Creating auth client");
        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.base_url.clone(),
        })
    }

    /// Exchange credentials for a session token.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, SearchError> {
        let url = format!("{}/main/v1/account/login", self.base_url);
        info!(url = %url, "Sending login request");

        let response = self
            .http_client
            .post(&url)
            .query(&[("populate", "detail")])
            .json(&serde_json::json!({
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Login request failed to complete");
                SearchError::AuthenticationFailed
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Login rejected by server");
            return Err(SearchError::AuthenticationFailed);
        }

        let envelope: LoginEnvelope = response.json().await.map_err(|e| {
            warn!(error = %e, "Login response body was not valid JSON");
            SearchError::AuthenticationFailed
        })?;

        let token = envelope
            .data
            .and_then(|d| d.token)
            .ok_or_else(|| {
                warn!("Login response missing data.token field");
                SearchError::AuthenticationFailed
            })?;

        info!("Login succeeded");
        Session::new(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_rejects_empty_token() {
        assert!(matches!(
            Session::new(String::new()),
            Err(SearchError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_session_keeps_token() {
        let session = Session::new("abc123".to_string()).unwrap();
        assert_eq!(session.token(), "abc123");
    }

    #[test]
    fn test_login_envelope_parsing() {
        let envelope: LoginEnvelope =
            serde_json::from_str(r#"{"data":{"token":"tok-1","detail":{"name":"x"}}}"#).unwrap();
        assert_eq!(envelope.data.unwrap().token.as_deref(), Some("tok-1"));

        // A success-shaped body without the token field is still a failure.
        let missing: LoginEnvelope = serde_json::from_str(r#"{"data":{}}"#).unwrap();
        assert!(missing.data.unwrap().token.is_none());
    }

    #[test]
    fn test_auth_client_creation() {
        let client = AuthClient::new(&ApiConfig::default());
        assert!(client.is_ok());
    }
}
