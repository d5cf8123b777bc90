use std::time::{Duration, Instant};

use super::debounce::Debouncer;
use super::store::{SearchDecision, Store};

/// Feeds typed text through a debounce window into the store.
#[derive(Debug)]
pub struct QueryController {
    debouncer: Debouncer<String>,
}

impl QueryController {
    pub fn new(delay: Duration) -> Self {
        Self {
            debouncer: Debouncer::new(delay),
        }
    }

    /// Records the raw text immediately and (re)starts the debounce window.
    pub fn on_input(&mut self, store: &mut Store, text: impl Into<String>, now: Instant) {
        let text = text.into();
        store.set_query(text.clone());
        self.debouncer.push(text, now);
    }

    /// Returns a decision once the text has settled and differs from the
    /// current debounced query.
    pub fn poll(&mut self, store: &mut Store, now: Instant) -> Option<SearchDecision> {
        let value = self.debouncer.poll(now)?;
        self.settle(store, value)
    }

    /// Settles the pending text right away, e.g. when the user presses Enter.
    pub fn flush(&mut self, store: &mut Store) -> Option<SearchDecision> {
        let value = self.debouncer.flush()?;
        self.settle(store, value)
    }

    pub fn cancel(&mut self) {
        self.debouncer.cancel();
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    fn settle(&mut self, store: &mut Store, value: String) -> Option<SearchDecision> {
        if value.trim() == store.search.debounced_query.trim() {
            return None;
        }
        tracing::debug!(query = %value, "Query settled");
        Some(store.apply_debounced_query(value))
    }
}
