//! # Tour Search Library
//!
//! An async Rust client for a remote tours/packages search API. The crate
//! covers the full search session: exchanging credentials for a bearer token,
//! debounced autocomplete lookups while the user types, and submitting a
//! search with at most one live request whose settlement may touch state.
//!
//! The interesting machinery lives in [`controller::SearchController`], which
//! ties together the [`debounce::Debouncer`] and the
//! [`gateway::RequestChannel`] so that superseded requests can never
//! overwrite newer results.

pub mod auth;
pub mod controller;
pub mod debounce;
pub mod gateway;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export main types for convenience
pub use auth::{AuthClient, Session};
pub use controller::{ControllerState, SearchController, SearchEvent};
pub use debounce::Debouncer;
pub use gateway::{HttpGateway, RequestChannel, SearchGateway};

/// Error types for the tour search library.
///
/// Every network failure is translated into one of these at the call site
/// that issued it; the user-visible `Display` text is fixed per kind and
/// never carries transport detail (that goes to the logs instead).
#[derive(Error, Debug)]
pub enum SearchError {
    /// The request was superseded or aborted. Always silent: a settlement
    /// carrying this error must produce no user-visible change.
    #[error("request superseded")]
    Cancelled,

    /// Bad credentials, transport failure during login, or a malformed
    /// token response. Shown as one fixed message regardless of cause.
    #[error("Login failed. Please check your credentials and try again.")]
    AuthenticationFailed,

    /// Network or server error on an autocomplete or submit call. The
    /// inner detail is for logging only.
    #[error("Error fetching search results. Please try again.")]
    SearchFailed(String),

    /// An empty query; rejected client-side before any dispatch.
    #[error("search query must not be empty")]
    EmptyQuery,

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl SearchError {
    /// Whether this settlement should be discarded without touching state.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, SearchError::Cancelled)
    }
}

/// A tour product: a bookable activity or package attached to a destination,
/// or returned standalone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: serde_json::Value,
    pub name: String,
}

/// A destination match from the gateway: a place with category tags and
/// optionally its nested products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    #[serde(default)]
    pub id: serde_json::Value,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl Destination {
    /// Render as shown in a result list, e.g. `Lagos - city`.
    pub fn display_line(&self) -> String {
        if self.tags.is_empty() {
            self.name.clone()
        } else {
            format!("{} - {}", self.name, self.tags.join(", "))
        }
    }
}

/// An autocomplete suggestion is the same wire shape as a destination.
pub type Suggestion = Destination;

/// One search response. Replaces the previous result set wholesale on every
/// successful settlement; there is no incremental merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub destinations: Vec<Destination>,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty() && self.products.is_empty()
    }

    /// Flatten into display lines: destinations first (`name - tags`), then
    /// standalone product names.
    pub fn display_lines(&self) -> Vec<String> {
        self.destinations
            .iter()
            .map(Destination::display_line)
            .chain(self.products.iter().map(|p| p.name.clone()))
            .collect()
    }
}

/// Client configuration shared by the auth and search endpoints.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the remote API, without a trailing slash.
    pub base_url: String,
    /// Quiet period after the last keystroke before autocomplete dispatches.
    pub debounce: Duration,
    /// Per-request timeout for the underlying HTTP client.
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dev.intraversewebservices.com/api".to_string(),
            debounce: Duration::from_millis(300),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ApiConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

/// Log in and obtain a session token.
pub async fn login(
    config: &ApiConfig,
    email: &str,
    password: &str,
) -> Result<Session, SearchError> {
    let client = AuthClient::new(config)?;
    client.login(email, password).await
}

/// One-shot tour search, bypassing the controller. Empty queries are
/// rejected here the same way the controller refuses to dispatch them.
pub async fn search_tours(
    config: &ApiConfig,
    query: &str,
    token: &str,
) -> Result<SearchResults, SearchError> {
    if query.is_empty() {
        return Err(SearchError::EmptyQuery);
    }
    let gateway = HttpGateway::new(config)?;
    gateway.search(query, token).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_destination_display_line() {
        let dest = Destination {
            id: json!(1),
            name: "Lagos".to_string(),
            tags: vec!["city".to_string()],
            products: vec![],
        };
        assert_eq!(dest.display_line(), "Lagos - city");

        let untagged = Destination {
            id: json!(2),
            name: "Abuja".to_string(),
            tags: vec![],
            products: vec![],
        };
        assert_eq!(untagged.display_line(), "Abuja");
    }

    #[test]
    fn test_display_lines_order() {
        let results = SearchResults {
            destinations: vec![Destination {
                id: json!(1),
                name: "Lagos".to_string(),
                tags: vec!["city".to_string(), "beach".to_string()],
                products: vec![],
            }],
            products: vec![Product {
                id: json!(9),
                name: "Lekki Conservation Tour".to_string(),
            }],
        };
        assert_eq!(
            results.display_lines(),
            vec!["Lagos - city, beach", "Lekki Conservation Tour"]
        );
    }

    #[test]
    fn test_destination_deserializes_with_missing_fields() {
        let dest: Destination =
            serde_json::from_value(json!({"id": 1, "name": "Lagos"})).unwrap();
        assert_eq!(dest.name, "Lagos");
        assert!(dest.tags.is_empty());
        assert!(dest.products.is_empty());
    }

    #[test]
    fn test_search_error_fixed_messages() {
        let auth = SearchError::AuthenticationFailed;
        assert_eq!(
            auth.to_string(),
            "Login failed. Please check your credentials and try again."
        );

        // The detail must never leak into the user-visible text.
        let search = SearchError::SearchFailed("connection reset by peer".to_string());
        assert_eq!(
            search.to_string(),
            "Error fetching search results. Please try again."
        );
        assert!(!search.to_string().contains("connection reset"));
    }

    #[test]
    fn test_cancellation_is_silent_kind() {
        assert!(SearchError::Cancelled.is_cancellation());
        assert!(!SearchError::EmptyQuery.is_cancellation());
        assert!(!SearchError::SearchFailed("x".to_string()).is_cancellation());
    }

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.debounce, Duration::from_millis(300));
        assert!(config.base_url.starts_with("https://"));
        assert!(!config.base_url.ends_with('/'));
    }

    #[tokio::test]
    async fn test_search_tours_rejects_empty_query() {
        let config = ApiConfig::default();
        let result = search_tours(&config, "", "token").await;
        assert!(matches!(result, Err(SearchError::EmptyQuery)));
    }
}
