//! Remote search gateway and the cancellable request channel.
//!
//! [`HttpGateway`] is the reqwest-backed implementation of the autocomplete
//! endpoint. [`RequestChannel`] wraps one outstanding gateway call at a time:
//! issuing a new request aborts the previous task and bumps the live
//! generation, so a straggler settlement can never be applied even if its
//! task raced past the abort.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, info, instrument, warn};

use crate::{ApiConfig, Destination, SearchError, SearchResults};

/// One free-text lookup against the remote tours/packages index.
///
/// Implementations translate transport failures into [`SearchError`] kinds;
/// nothing rawer than that crosses this seam.
#[async_trait]
pub trait SearchGateway: Send + Sync {
    async fn search(&self, query: &str, token: &str) -> Result<SearchResults, SearchError>;
}

/// The autocomplete payload arrives in two shapes depending on the endpoint
/// revision: the full `{destinations, products}` object, or a bare list of
/// destinations. Both normalize into [`SearchResults`]; the full object is
/// the authoritative form.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SearchPayload {
    Full(SearchResults),
    Destinations(Vec<Destination>),
}

impl SearchPayload {
    fn into_results(self) -> SearchResults {
        match self {
            SearchPayload::Full(results) => results,
            SearchPayload::Destinations(destinations) => SearchResults {
                destinations,
                products: Vec::new(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    data: SearchPayload,
}

/// HTTP implementation of the search gateway.
pub struct HttpGateway {
    http_client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(config: &ApiConfig) -> Result<Self, SearchError> {
        debug!("Creating search gateway client");
        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl SearchGateway for HttpGateway {
    #[instrument(level = "info", skip(self, token))]
    async fn search(&self, query: &str, token: &str) -> Result<SearchResults, SearchError> {
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let url = format!("{}/product/v1/package/auto-complete", self.base_url);
        info!(url = %url, "Making autocomplete request");

        let start_time = std::time::Instant::now();
        let response = self
            .http_client
            .get(&url)
            .query(&[("q", query)])
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Autocomplete request failed to complete");
                SearchError::SearchFailed(e.to_string())
            })?;

        let status = response.status();
        info!(
            status = %status,
            duration_ms = start_time.elapsed().as_millis(),
            "Autocomplete request completed"
        );

        if !status.is_success() {
            warn!(status = %status, "Autocomplete request rejected");
            return Err(SearchError::SearchFailed(format!("status {}", status)));
        }

        let envelope: SearchEnvelope = response.json().await.map_err(|e| {
            warn!(error = %e, "Autocomplete response body was not valid JSON");
            SearchError::SearchFailed(e.to_string())
        })?;

        let results = envelope.data.into_results();
        debug!(
            destinations = results.destinations.len(),
            products = results.products.len(),
            "Autocomplete payload normalized"
        );
        Ok(results)
    }
}

/// The settlement of one issued request, tagged with its generation.
#[derive(Debug)]
pub struct Settlement {
    pub generation: u64,
    pub outcome: Result<SearchResults, SearchError>,
}

/// Wraps at most one outstanding gateway call.
///
/// Each issued request is tagged with a monotonically increasing generation.
/// Only the settlement whose generation matches the current live one may be
/// applied; [`RequestChannel::invalidate`] and a fresh
/// [`RequestChannel::issue`] both strip the previous handle of that right,
/// independently of whether the abort signal reached the task in time.
pub struct RequestChannel {
    gateway: Arc<dyn SearchGateway>,
    generation: u64,
    live: bool,
    abort: Option<AbortHandle>,
    tx: mpsc::UnboundedSender<Settlement>,
}

impl RequestChannel {
    pub fn new(gateway: Arc<dyn SearchGateway>) -> (Self, mpsc::UnboundedReceiver<Settlement>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                gateway,
                generation: 0,
                live: false,
                abort: None,
                tx,
            },
            rx,
        )
    }

    /// Dispatch a query, superseding any still-pending request. Returns the
    /// generation tag of the new request.
    pub fn issue(&mut self, query: &str, token: &str) -> u64 {
        self.invalidate();
        self.generation += 1;
        self.live = true;

        let generation = self.generation;
        let gateway = Arc::clone(&self.gateway);
        let tx = self.tx.clone();
        let query = query.to_owned();
        let token = token.to_owned();

        debug!(generation, query = %query, "Issuing search request");
        let handle = tokio::spawn(async move {
            let outcome = gateway.search(&query, &token).await;
            // Send can only fail if the controller is gone; nothing to do.
            let _ = tx.send(Settlement {
                generation,
                outcome,
            });
        });
        self.abort = Some(handle.abort_handle());
        generation
    }

    /// Cancel the pending request, if any. Best-effort on the transport
    /// side; the generation check makes the result unconditionally dead.
    pub fn invalidate(&mut self) {
        if let Some(handle) = self.abort.take() {
            debug!(generation = self.generation, "Cancelling in-flight request");
            handle.abort();
        }
        self.live = false;
    }

    /// Whether a settlement with this generation is the live one and may
    /// mutate state.
    pub fn is_current(&self, generation: u64) -> bool {
        self.live && generation == self.generation
    }

    /// Mark the live request as settled.
    pub fn settle(&mut self, generation: u64) {
        if self.is_current(generation) {
            self.live = false;
            self.abort = None;
        }
    }

    pub fn has_live_request(&self) -> bool {
        self.live
    }
}
