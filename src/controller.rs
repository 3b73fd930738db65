//! The search controller state machine.
//!
//! Owns everything mutable about one authenticated search session: the
//! current input text, the picked suggestion, the suggestion dropdown, the
//! result set, and the loading/error flags. All mutation happens through
//! [`SearchController::handle_event`] and the three UI operations, on one
//! task; the spawned gateway calls only report back through the settlement
//! channel, tagged with a generation that is checked before anything is
//! applied. A superseded request can therefore never overwrite newer state,
//! no matter when its settlement arrives.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::debounce::{DebounceFired, Debouncer};
use crate::gateway::{RequestChannel, SearchGateway, Settlement};
use crate::{ApiConfig, SearchResults, Session, Suggestion};

/// Snapshot of everything the search view renders.
#[derive(Debug, Clone, Default)]
pub struct ControllerState {
    /// The user's current raw input.
    pub query: String,
    /// At most one explicitly chosen suggestion; cleared on the next edit.
    pub selected: Option<Suggestion>,
    /// The open autocomplete dropdown.
    pub suggestions: Vec<Suggestion>,
    /// The last successful result set, replaced wholesale.
    pub results: SearchResults,
    /// True only between dispatch and settlement of the live request.
    pub is_loading: bool,
    /// Fixed-text error from the last failed settlement, if any.
    pub error_message: Option<String>,
}

/// Asynchronous inputs to the controller: debounce firings and request
/// settlements. UI operations call the controller methods directly.
#[derive(Debug)]
pub enum SearchEvent {
    DebounceFired(DebounceFired),
    Settled(Settlement),
}

/// Ties the debouncer and the request channel to one session's state.
/// Created once per authenticated session and dropped on logout.
pub struct SearchController {
    state: ControllerState,
    token: String,
    debouncer: Debouncer,
    debounce_rx: mpsc::UnboundedReceiver<DebounceFired>,
    channel: RequestChannel,
    settlement_rx: mpsc::UnboundedReceiver<Settlement>,
}

impl SearchController {
    pub fn new(gateway: Arc<dyn SearchGateway>, session: &Session, config: &ApiConfig) -> Self {
        let (debouncer, debounce_rx) = Debouncer::new(config.debounce);
        let (channel, settlement_rx) = RequestChannel::new(gateway);

        Self {
            state: ControllerState::default(),
            token: session.token().to_string(),
            debouncer,
            debounce_rx,
            channel,
            settlement_rx,
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// A keystroke. Clears any picked suggestion and either schedules a
    /// debounced autocomplete lookup or, for empty text, clears suggestions
    /// and results locally without touching the network.
    pub fn on_query_change(&mut self, text: &str) {
        self.state.query = text.to_string();
        self.state.selected = None;

        if text.is_empty() {
            debug!("Query emptied; clearing locally");
            self.debouncer.cancel();
            self.channel.invalidate();
            self.state.suggestions.clear();
            self.state.results = SearchResults::default();
            self.state.is_loading = false;
        } else {
            self.debouncer.on_input(text);
        }
    }

    /// The user picked a suggestion from the dropdown. Adopts its display
    /// name as the query and closes the dropdown; no network call fires,
    /// and any pending lookup loses its right to reopen it.
    pub fn on_suggestion_pick(&mut self, suggestion: Suggestion) {
        debug!(name = %suggestion.name, "Suggestion picked");
        self.debouncer.cancel();
        if self.channel.has_live_request() {
            self.channel.invalidate();
            self.state.is_loading = false;
        }

        self.state.query = suggestion.name.clone();
        self.state.selected = Some(suggestion);
        self.state.suggestions.clear();
    }

    /// Form submission. Cancels any in-flight autocomplete; the submit owns
    /// the final state. A picked suggestion resolves synchronously from its
    /// own data; otherwise a fresh search is issued, unless the query is
    /// empty, which clears locally instead of reaching the gateway.
    pub fn on_submit(&mut self) {
        info!(query = %self.state.query, "Search submitted");
        self.debouncer.cancel();
        self.channel.invalidate();
        self.state.error_message = None;

        if let Some(suggestion) = self.state.selected.clone() {
            // The user already confirmed an exact match; its payload is the
            // result set.
            self.state.results = SearchResults {
                products: suggestion.products.clone(),
                destinations: vec![suggestion],
            };
            self.state.suggestions.clear();
            self.state.is_loading = false;
            return;
        }

        if self.state.query.is_empty() {
            self.state.suggestions.clear();
            self.state.results = SearchResults::default();
            self.state.is_loading = false;
            return;
        }

        self.state.is_loading = true;
        let query = self.state.query.clone();
        self.channel.issue(&query, &self.token);
    }

    /// Wait for the next asynchronous input. Pends until a debounce timer
    /// elapses or a request settles.
    pub async fn next_event(&mut self) -> Option<SearchEvent> {
        tokio::select! {
            fired = self.debounce_rx.recv() => fired.map(SearchEvent::DebounceFired),
            settled = self.settlement_rx.recv() => settled.map(SearchEvent::Settled),
        }
    }

    pub fn handle_event(&mut self, event: SearchEvent) {
        match event {
            SearchEvent::DebounceFired(fired) => self.handle_debounce(fired),
            SearchEvent::Settled(settlement) => self.handle_settlement(settlement),
        }
    }

    fn handle_debounce(&mut self, fired: DebounceFired) {
        if !self.debouncer.is_current(fired.seq) {
            debug!(seq = fired.seq, "Stale debounce firing ignored");
            return;
        }
        if fired.text.is_empty() {
            return;
        }

        self.state.is_loading = true;
        self.state.error_message = None;
        self.channel.issue(&fired.text, &self.token);
    }

    fn handle_settlement(&mut self, settlement: Settlement) {
        if !self.channel.is_current(settlement.generation) {
            debug!(
                generation = settlement.generation,
                "Settlement of superseded request discarded"
            );
            return;
        }

        match settlement.outcome {
            Ok(results) => {
                self.channel.settle(settlement.generation);
                debug!(
                    destinations = results.destinations.len(),
                    products = results.products.len(),
                    "Applying search results"
                );
                self.state.suggestions = results.destinations.clone();
                self.state.results = results;
                self.state.is_loading = false;
                self.state.error_message = None;
            }
            Err(error) if error.is_cancellation() => {
                // The superseding operation owns the final state.
                debug!("Cancelled settlement discarded");
            }
            Err(error) => {
                self.channel.settle(settlement.generation);
                warn!(error = ?error, "Search request failed");
                self.state.error_message = Some(error.to_string());
                self.state.is_loading = false;
            }
        }
    }
}
