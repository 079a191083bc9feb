use std::sync::Arc;

use crossbeam::channel::Receiver;
use log::{debug, warn};
use parking_lot::Mutex;
use queueshare_core::{StorageKey, Track};

use crate::{
    store::{Reducer, StateStore},
    CollabContext,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    pub query: String,
    pub results: Vec<Track>,
    pub loading: bool,
}

#[derive(Debug, Clone)]
pub enum SearchAction {
    Typed(String),
    Loaded(Vec<Track>),
    Failed,
}

pub struct SearchReducer;

impl Reducer for SearchReducer {
    type State = SearchState;
    type Action = SearchAction;

    fn reduce(state: SearchState, action: SearchAction) -> SearchState {
        match action {
            SearchAction::Typed(query) => SearchState {
                loading: !query.trim().is_empty(),
                query,
                ..state
            },
            SearchAction::Loaded(results) => SearchState {
                results,
                loading: false,
                ..state
            },
            SearchAction::Failed => SearchState {
                loading: false,
                ..state
            },
        }
    }
}

/// A search input for the joined room.
///
/// Every input restarts a quiet period, and only the query still current once it
/// passes is sent. Each query gets a sequence number, and results arriving for
/// anything but the latest one are dropped.
#[derive(Clone)]
pub struct SearchDebouncer {
    context: CollabContext,
    state: Arc<StateStore<SearchReducer>>,
    latest: Arc<Mutex<u64>>,
}

impl SearchDebouncer {
    pub fn new(context: &CollabContext) -> Self {
        let query = context.storage.get(StorageKey::LastSearch).unwrap_or_default();
        let results = context
            .storage
            .get(StorageKey::LastSearchResults)
            .and_then(|json| match serde_json::from_str(&json) {
                Ok(results) => Some(results),
                Err(e) => {
                    warn!("Ignoring unreadable stored search results: {}", e);
                    None
                }
            })
            .unwrap_or_default();

        Self {
            context: context.clone(),
            state: Arc::new(StateStore::new(SearchState {
                query,
                results,
                loading: false,
            })),
            latest: Default::default(),
        }
    }

    pub fn state(&self) -> SearchState {
        self.state.state()
    }

    pub fn subscribe(&self) -> Receiver<SearchState> {
        self.state.subscribe()
    }

    /// Takes a new value of the search input
    pub fn input(&self, query: impl Into<String>) {
        let query = query.into();
        let sequence = {
            let mut latest = self.latest.lock();
            *latest += 1;
            *latest
        };

        self.state.dispatch(SearchAction::Typed(query.clone()));

        if query.trim().is_empty() {
            self.apply(sequence, SearchAction::Loaded(Vec::new()));
            return;
        }

        let debouncer = self.clone();

        tokio::spawn(async move {
            tokio::time::sleep(debouncer.context.config.search_debounce()).await;
            debouncer.run(sequence, query).await;
        });
    }

    async fn run(&self, sequence: u64, query: String) {
        if !self.is_latest(sequence) {
            return;
        }

        let (Some(visit), Some(credentials)) =
            (self.context.room.visit(), self.context.room_credentials())
        else {
            debug!("Not searching for {}, no room to search in", query);
            self.apply(sequence, SearchAction::Failed);
            return;
        };

        debug!("Searching room {} for {} (#{})", visit.code, query, sequence);

        let result = self
            .context
            .backend
            .search(&visit.code, &credentials, &query)
            .await;

        if visit.is_over() {
            debug!("Dropping results for {}, room {} was left", query, visit.code);
            self.apply(sequence, SearchAction::Failed);
            return;
        }

        match result {
            Ok(results) => {
                if self.apply(sequence, SearchAction::Loaded(results.clone())) {
                    self.persist(&query, &results);
                }
            }
            Err(e) => {
                if self.apply(sequence, SearchAction::Failed) {
                    self.context.report(&e);
                } else {
                    // A newer query owns the input, only the 403 rule still applies
                    self.context.forget_rejected_password(&e);
                }
            }
        }
    }

    fn is_latest(&self, sequence: u64) -> bool {
        *self.latest.lock() == sequence
    }

    /// Applies the outcome of a query, unless a newer one was issued since
    fn apply(&self, sequence: u64, action: SearchAction) -> bool {
        let latest = self.latest.lock();

        if *latest != sequence {
            debug!("Dropping outcome of search #{}, #{} is newer", sequence, *latest);
            return false;
        }

        self.state.dispatch(action);
        true
    }

    fn persist(&self, query: &str, results: &[Track]) {
        match serde_json::to_string(results) {
            Ok(json) => self.context.storage.set_many(&[
                (StorageKey::LastSearch, query),
                (StorageKey::LastSearchResults, json.as_str()),
            ]),
            Err(e) => warn!("Could not store search results: {}", e),
        }
    }
}
