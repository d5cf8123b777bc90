//! Application state container.
//!
//! The [`Store`] is owned by the App and mutated only through its methods. Each
//! async slice carries a [`RequestSlot`]: starting a request cancels the previous
//! token and bumps the slot's generation, and a completion is applied only when
//! its generation is still current. Results therefore land in initiation order,
//! whatever order the network delivers them in.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::favorites::FavoritesMap;
use super::models::{Category, FetchStatus, Item, Page};
use super::ui::sort::SortOrder;
use crate::api::{GatewayError, SearchParams};

/// Generation counter plus the token of the request currently in flight.
#[derive(Debug, Default)]
pub struct RequestSlot {
    generation: u64,
    token: Option<CancellationToken>,
}

/// Handed to the task that performs a request.
#[derive(Debug, Clone)]
pub struct RequestTicket {
    pub generation: u64,
    pub token: CancellationToken,
}

impl RequestSlot {
    /// Supersedes whatever is in flight and issues a ticket for a new request.
    pub fn begin(&mut self) -> RequestTicket {
        self.cancel();
        let token = CancellationToken::new();
        self.token = Some(token.clone());
        RequestTicket {
            generation: self.generation,
            token,
        }
    }

    /// Cancels the in-flight request. Its completion will be ignored.
    pub fn cancel(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
        self.generation += 1;
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.token.is_some() && self.generation == generation
    }

    fn settle(&mut self) {
        self.token = None;
    }
}

/// How a search response is merged into the result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Replace,
    Append,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub page: u32,
    pub page_size: u32,
    pub category_id: Option<u32>,
    pub sort: SortOrder,
    pub mode: FetchMode,
}

impl SearchRequest {
    pub fn params(&self) -> SearchParams {
        SearchParams {
            query: self.query.clone(),
            page: self.page,
            page_size: self.page_size,
            category_ids: self.category_id.into_iter().collect(),
            sort: Some(self.sort),
        }
    }
}

/// What the browse view should do with a settled query.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchDecision {
    Fetch(SearchRequest),
    /// Nothing to search for: show favorites and the trending list.
    Home,
}

#[derive(Debug)]
pub struct SearchState {
    /// Text as typed.
    pub query: String,
    /// Text after the debounce window settled. Requests are built from this.
    pub debounced_query: String,
    pub category_id: Option<u32>,
    pub sort: SortOrder,
    pub page: u32,
    pub page_size: u32,
    pub total: u32,
    pub has_next: bool,
    pub results: Vec<Item>,
    pub status: FetchStatus,
    pub error: Option<String>,
    /// The most recently triggered request, kept for retry.
    pub last_request: Option<SearchRequest>,
    slot: RequestSlot,
}

impl SearchState {
    fn new(page_size: u32) -> Self {
        Self {
            query: String::new(),
            debounced_query: String::new(),
            category_id: None,
            sort: SortOrder::default(),
            page: 1,
            page_size,
            total: 0,
            has_next: false,
            results: Vec::new(),
            status: FetchStatus::Idle,
            error: None,
            last_request: None,
            slot: RequestSlot::default(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }

    /// An append request is in flight.
    pub fn is_loading_more(&self) -> bool {
        self.is_loading()
            && self
                .last_request
                .as_ref()
                .is_some_and(|r| r.mode == FetchMode::Append)
    }

    /// Neither a query nor a genre filter is active.
    pub fn is_home(&self) -> bool {
        self.debounced_query.trim().is_empty() && self.category_id.is_none()
    }

    pub fn total_pages(&self) -> u32 {
        if self.page_size == 0 {
            return 1;
        }
        self.total.div_ceil(self.page_size).max(1)
    }
}

/// Detail view slice.
#[derive(Debug, Default)]
pub struct DetailState {
    pub id: Option<u32>,
    pub item: Option<Item>,
    pub status: FetchStatus,
    pub error: Option<String>,
    slot: RequestSlot,
}

/// A slice holding one list fetched as a whole (trending items, genres).
#[derive(Debug)]
pub struct ListState<T> {
    pub items: Vec<T>,
    pub status: FetchStatus,
    pub error: Option<String>,
    slot: RequestSlot,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            status: FetchStatus::Idle,
            error: None,
            slot: RequestSlot::default(),
        }
    }
}

impl<T> ListState<T> {
    fn begin(&mut self) -> RequestTicket {
        self.status = FetchStatus::Loading;
        self.error = None;
        self.slot.begin()
    }

    fn finish(
        &mut self,
        generation: u64,
        outcome: Result<Vec<T>, GatewayError>,
        what: &str,
    ) -> bool {
        if !self.slot.is_current(generation) || matches!(outcome, Err(GatewayError::Cancelled)) {
            debug!(what, generation, "Dropping stale completion");
            return false;
        }
        self.slot.settle();
        match outcome {
            Ok(items) => {
                self.items = items;
                self.status = FetchStatus::Succeeded;
            }
            Err(e) => {
                self.status = FetchStatus::Failed;
                self.error = Some(e.describe(what));
            }
        }
        true
    }
}

pub type TopState = ListState<Item>;
pub type CategoriesState = ListState<Category>;

pub struct Store {
    pub search: SearchState,
    pub detail: DetailState,
    pub top: TopState,
    pub categories: CategoriesState,
    favorites: FavoritesMap,
    favorites_revision: u64,
}

impl Store {
    pub fn new(favorites: FavoritesMap, page_size: u32) -> Self {
        Self {
            search: SearchState::new(page_size.max(1)),
            detail: DetailState::default(),
            top: TopState::default(),
            categories: CategoriesState::default(),
            favorites,
            favorites_revision: 0,
        }
    }

    pub fn set_query(&mut self, text: impl Into<String>) {
        self.search.query = text.into();
    }

    fn fresh_request(&self) -> SearchRequest {
        SearchRequest {
            query: self.search.debounced_query.trim().to_string(),
            page: 1,
            page_size: self.search.page_size,
            category_id: self.search.category_id,
            sort: self.search.sort,
            mode: FetchMode::Replace,
        }
    }

    pub fn trigger_search(&mut self, request: SearchRequest) -> RequestTicket {
        info!(query = %request.query, page = request.page, mode = ?request.mode, "Search triggered");
        self.search.status = FetchStatus::Loading;
        self.search.error = None;
        self.search.last_request = Some(request);
        self.search.slot.begin()
    }

    /// Applies a search completion. Returns `false` when it was stale or cancelled.
    pub fn finish_search(
        &mut self,
        generation: u64,
        outcome: Result<Page<Item>, GatewayError>,
    ) -> bool {
        if !self.search.slot.is_current(generation)
            || matches!(outcome, Err(GatewayError::Cancelled))
        {
            debug!(generation, "Dropping stale search completion");
            return false;
        }
        self.search.slot.settle();

        let Some(request) = self.search.last_request.clone() else {
            return false;
        };
        match outcome {
            Ok(page) => {
                self.search.has_next = page.has_next();
                self.search.total = page.total();
                self.search.page = request.page;
                match request.mode {
                    FetchMode::Replace => self.search.results = page.data,
                    FetchMode::Append => self.search.results.extend(page.data),
                }
                self.search.status = FetchStatus::Succeeded;
            }
            Err(e) => {
                // results stay on screen, but paging no longer continues them
                if request.mode == FetchMode::Replace {
                    self.search.has_next = false;
                    self.search.total = 0;
                }
                self.search.status = FetchStatus::Failed;
                self.search.error = Some(e.describe("search results"));
            }
        }
        true
    }

    /// Request that re-runs the last search after a failure.
    pub fn retry_search(&self) -> Option<SearchRequest> {
        if self.search.status != FetchStatus::Failed {
            return None;
        }
        self.search.last_request.clone()
    }

    pub fn set_category(&mut self, id: Option<u32>) -> Option<SearchRequest> {
        self.search.category_id = id;
        self.restart_search()
    }

    pub fn set_sort(&mut self, sort: SortOrder) -> Option<SearchRequest> {
        self.search.sort = sort;
        self.restart_search()
    }

    fn restart_search(&mut self) -> Option<SearchRequest> {
        self.search.page = 1;
        if self.search.is_home() {
            self.clear_results();
            return None;
        }
        Some(self.fresh_request())
    }

    pub fn apply_debounced_query(&mut self, text: impl Into<String>) -> SearchDecision {
        self.search.debounced_query = text.into();
        match self.restart_search() {
            Some(request) => SearchDecision::Fetch(request),
            None => SearchDecision::Home,
        }
    }

    fn clear_results(&mut self) {
        self.search.slot.cancel();
        self.search.results.clear();
        self.search.page = 1;
        self.search.total = 0;
        self.search.has_next = false;
        self.search.status = FetchStatus::Idle;
        self.search.error = None;
        self.search.last_request = None;
    }

    pub fn reset_search(&mut self) {
        self.clear_results();
        self.search.query.clear();
        self.search.debounced_query.clear();
        self.search.category_id = None;
        self.search.sort = SortOrder::Descending;
    }

    /// Explicit page navigation. `None` when there is nothing to fetch.
    pub fn page_request(&self, page: u32) -> Option<SearchRequest> {
        if page == 0 || page == self.search.page || self.search.is_home() || self.search.is_loading()
        {
            return None;
        }
        if page > self.search.page && !self.search.has_next {
            return None;
        }
        Some(SearchRequest {
            page,
            ..self.fresh_request()
        })
    }

    /// Next page appended to the current results. After a failure only a retry
    /// or a fresh search continues.
    pub fn load_more_request(&self) -> Option<SearchRequest> {
        if !self.search.has_next
            || self.search.is_loading()
            || self.search.is_home()
            || self.search.status == FetchStatus::Failed
        {
            return None;
        }
        Some(SearchRequest {
            page: self.search.page + 1,
            mode: FetchMode::Append,
            ..self.fresh_request()
        })
    }

    pub fn favorites(&self) -> &FavoritesMap {
        &self.favorites
    }

    /// Incremented on every favorites change so the owner knows when to persist.
    pub fn favorites_revision(&self) -> u64 {
        self.favorites_revision
    }

    pub fn is_favorite(&self, id: u32) -> bool {
        self.favorites.contains(id)
    }

    /// Returns `true` if the item is a favorite afterwards.
    pub fn toggle_favorite(&mut self, item: &Item) -> bool {
        let added = self.favorites.toggle(item);
        self.favorites_revision += 1;
        info!(id = item.mal_id, added, "Favorite toggled");
        added
    }

    /// Starts loading a detail, dropping the previous selection.
    pub fn load_detail(&mut self, id: u32) -> RequestTicket {
        self.detail.item = None;
        self.detail.id = Some(id);
        self.detail.status = FetchStatus::Loading;
        self.detail.error = None;
        self.detail.slot.begin()
    }

    pub fn finish_detail(&mut self, generation: u64, outcome: Result<Item, GatewayError>) -> bool {
        if !self.detail.slot.is_current(generation)
            || matches!(outcome, Err(GatewayError::Cancelled))
        {
            debug!(generation, "Dropping stale detail completion");
            return false;
        }
        self.detail.slot.settle();
        match outcome {
            Ok(item) => {
                self.detail.item = Some(item);
                self.detail.status = FetchStatus::Succeeded;
            }
            Err(e) => {
                self.detail.status = FetchStatus::Failed;
                self.detail.error = Some(e.describe("details"));
            }
        }
        true
    }

    pub fn clear_detail(&mut self) {
        self.detail.slot.cancel();
        self.detail.id = None;
        self.detail.item = None;
        self.detail.status = FetchStatus::Idle;
        self.detail.error = None;
    }

    pub fn begin_top(&mut self) -> RequestTicket {
        self.top.begin()
    }

    pub fn finish_top(&mut self, generation: u64, outcome: Result<Page<Item>, GatewayError>) -> bool {
        self.top
            .finish(generation, outcome.map(|page| page.data), "trending anime")
    }

    pub fn begin_categories(&mut self) -> RequestTicket {
        self.categories.begin()
    }

    pub fn finish_categories(
        &mut self,
        generation: u64,
        outcome: Result<Vec<Category>, GatewayError>,
    ) -> bool {
        self.categories.finish(generation, outcome, "genres")
    }

    /// Cancels every in-flight request, used on shutdown.
    pub fn cancel_all(&mut self) {
        self.search.slot.cancel();
        self.detail.slot.cancel();
        self.top.slot.cancel();
        self.categories.slot.cancel();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::internal::models::{Pagination, PaginationItems};

    pub(crate) fn item(id: u32) -> Item {
        Item {
            mal_id: id,
            title: format!("Anime {}", id),
            ..Default::default()
        }
    }

    pub(crate) fn page(ids: std::ops::Range<u32>, total: u32, has_next: bool) -> Page<Item> {
        let data: Vec<Item> = ids.map(item).collect();
        Page {
            pagination: Some(Pagination {
                last_visible_page: total / 10,
                has_next_page: has_next,
                current_page: None,
                items: Some(PaginationItems {
                    count: data.len() as u32,
                    total,
                    per_page: 10,
                }),
            }),
            data,
        }
    }

    fn store() -> Store {
        Store::new(FavoritesMap::new(), 10)
    }

    fn search_naruto(store: &mut Store) -> RequestTicket {
        let SearchDecision::Fetch(request) = store.apply_debounced_query("naruto") else {
            panic!("expected a fetch");
        };
        store.trigger_search(request)
    }

    #[test]
    fn test_first_page_replaces_results() {
        let mut store = store();
        let ticket = search_naruto(&mut store);
        assert_eq!(store.search.status, FetchStatus::Loading);

        assert!(store.finish_search(ticket.generation, Ok(page(0..10, 500, true))));

        assert_eq!(store.search.results.len(), 10);
        assert_eq!(store.search.status, FetchStatus::Succeeded);
        assert_eq!(store.search.total, 500);
        assert!(store.search.has_next);
        assert_eq!(store.search.page, 1);
    }

    #[test]
    fn test_append_extends_in_order() {
        let mut store = store();
        let ticket = search_naruto(&mut store);
        store.finish_search(ticket.generation, Ok(page(0..10, 500, true)));

        let request = store.load_more_request().unwrap();
        assert_eq!(request.page, 2);
        assert_eq!(request.mode, FetchMode::Append);
        let ticket = store.trigger_search(request);
        assert!(store.search.is_loading_more());
        store.finish_search(ticket.generation, Ok(page(10..20, 500, true)));

        let ids: Vec<u32> = store.search.results.iter().map(|i| i.mal_id).collect();
        assert_eq!(ids, (0..20).collect::<Vec<_>>());
        assert_eq!(store.search.page, 2);
    }

    #[test]
    fn test_superseded_search_never_lands() {
        let mut store = store();
        let first = search_naruto(&mut store);
        let SearchDecision::Fetch(request) = store.apply_debounced_query("bleach") else {
            panic!("expected a fetch");
        };
        let second = store.trigger_search(request);

        assert!(first.token.is_cancelled());
        assert!(!second.token.is_cancelled());

        // second resolves first, then the stale first one arrives
        assert!(store.finish_search(second.generation, Ok(page(100..105, 5, false))));
        assert!(!store.finish_search(first.generation, Ok(page(0..10, 500, true))));

        assert_eq!(store.search.results[0].mal_id, 100);
        assert_eq!(store.search.total, 5);
        assert!(!store.search.has_next);
    }

    #[test]
    fn test_cancelled_outcome_changes_nothing() {
        let mut store = store();
        let ticket = search_naruto(&mut store);
        assert!(!store.finish_search(ticket.generation, Err(GatewayError::Cancelled)));
        assert_eq!(store.search.status, FetchStatus::Loading);
    }

    #[test]
    fn test_failed_append_keeps_results() {
        let mut store = store();
        let ticket = search_naruto(&mut store);
        store.finish_search(ticket.generation, Ok(page(0..10, 500, true)));

        let ticket = store.trigger_search(store.load_more_request().unwrap());
        store.finish_search(ticket.generation, Err(GatewayError::Timeout));

        assert_eq!(store.search.status, FetchStatus::Failed);
        assert_eq!(store.search.results.len(), 10);
        assert_eq!(store.search.page, 1);
        assert_eq!(
            store.search.error.as_deref(),
            Some("Failed to fetch search results (request timed out)")
        );

        let retry = store.retry_search().unwrap();
        assert_eq!(retry.page, 2);
        assert_eq!(retry.mode, FetchMode::Append);
        assert!(store.load_more_request().is_none());

        let ticket = store.trigger_search(retry);
        store.finish_search(ticket.generation, Ok(page(10..20, 500, true)));
        assert_eq!(store.search.results.len(), 20);
        assert_eq!(store.load_more_request().unwrap().page, 3);
    }

    #[test]
    fn test_failed_filter_change_blocks_load_more() {
        let mut store = store();
        let ticket = search_naruto(&mut store);
        store.finish_search(ticket.generation, Ok(page(0..10, 500, true)));

        let request = store.set_category(Some(1)).unwrap();
        let ticket = store.trigger_search(request);
        store.finish_search(ticket.generation, Err(GatewayError::Network("down".into())));

        assert_eq!(store.search.status, FetchStatus::Failed);
        assert!(!store.search.has_next);
        assert_eq!(store.search.total, 0);
        assert!(store.load_more_request().is_none());
        assert!(store.page_request(2).is_none());

        let retry = store.retry_search().unwrap();
        assert_eq!(retry.category_id, Some(1));
        assert_eq!(retry.mode, FetchMode::Replace);
        let ticket = store.trigger_search(retry);
        store.finish_search(ticket.generation, Ok(page(900..910, 40, true)));

        let ids: Vec<u32> = store.search.results.iter().map(|i| i.mal_id).collect();
        assert_eq!(ids, (900..910).collect::<Vec<_>>());
        let more = store.load_more_request().unwrap();
        assert_eq!((more.page, more.category_id), (2, Some(1)));
    }

    #[test]
    fn test_category_with_empty_query_fetches_page_one() {
        let mut store = store();
        store.search.page = 3;

        let request = store.set_category(Some(1)).unwrap();

        assert_eq!(request.category_id, Some(1));
        assert_eq!(request.page, 1);
        assert_eq!(request.mode, FetchMode::Replace);
        assert_eq!(request.query, "");
        assert_eq!(store.search.page, 1);
    }

    #[test]
    fn test_clearing_category_with_empty_query_goes_home() {
        let mut store = store();
        let request = store.set_category(Some(1)).unwrap();
        let ticket = store.trigger_search(request);

        assert!(store.set_category(None).is_none());
        assert!(ticket.token.is_cancelled());
        assert_eq!(store.search.status, FetchStatus::Idle);
        assert!(store.search.results.is_empty());
    }

    #[test]
    fn test_set_sort_restarts_active_search() {
        let mut store = store();
        let ticket = search_naruto(&mut store);
        store.finish_search(ticket.generation, Ok(page(0..10, 500, true)));

        let request = store.set_sort(SortOrder::Ascending).unwrap();
        assert_eq!(request.sort, SortOrder::Ascending);
        assert_eq!(request.page, 1);
        assert_eq!(request.query, "naruto");
    }

    #[test]
    fn test_blank_debounced_query_is_home() {
        let mut store = store();
        assert_eq!(store.apply_debounced_query("   "), SearchDecision::Home);
    }

    #[test]
    fn test_reset_search() {
        let mut store = store();
        store.set_query("naruto");
        store.set_sort(SortOrder::Ascending);
        let ticket = search_naruto(&mut store);
        store.finish_search(ticket.generation, Ok(page(0..10, 500, true)));
        store.set_category(Some(4));

        store.reset_search();

        assert_eq!(store.search.query, "");
        assert!(store.search.results.is_empty());
        assert_eq!(store.search.page, 1);
        assert!(!store.search.has_next);
        assert_eq!(store.search.category_id, None);
        assert_eq!(store.search.sort, SortOrder::Descending);
        assert_eq!(store.search.status, FetchStatus::Idle);
    }

    #[test]
    fn test_load_more_guards() {
        let mut store = store();
        assert!(store.load_more_request().is_none());

        let ticket = search_naruto(&mut store);
        assert!(store.load_more_request().is_none());

        store.finish_search(ticket.generation, Ok(page(0..3, 3, false)));
        assert!(store.load_more_request().is_none());
    }

    #[test]
    fn test_page_request() {
        let mut store = store();
        let ticket = search_naruto(&mut store);
        store.finish_search(ticket.generation, Ok(page(0..10, 500, true)));

        let next = store.page_request(2).unwrap();
        assert_eq!(next.mode, FetchMode::Replace);
        assert!(store.page_request(0).is_none());
        assert!(store.page_request(1).is_none());

        let ticket = store.trigger_search(next);
        store.finish_search(ticket.generation, Ok(page(10..20, 500, true)));
        assert_eq!(store.search.page, 2);
        assert_eq!(store.search.results[0].mal_id, 10);
        assert_eq!(store.page_request(1).unwrap().page, 1);
        assert_eq!(store.search.total_pages(), 50);
    }

    #[test]
    fn test_toggle_favorite_bumps_revision() {
        let mut store = store();
        assert!(store.toggle_favorite(&item(5)));
        assert!(store.is_favorite(5));
        assert!(!store.toggle_favorite(&item(5)));
        assert!(!store.is_favorite(5));
        assert_eq!(store.favorites_revision(), 2);
    }

    #[test]
    fn test_detail_lifecycle() {
        let mut store = store();
        let ticket = search_naruto(&mut store);
        store.finish_search(ticket.generation, Ok(page(0..10, 500, true)));

        let ticket = store.load_detail(3);
        assert_eq!(store.detail.status, FetchStatus::Loading);
        assert!(store.detail.item.is_none());

        let mut full = item(3);
        full.synopsis = Some("Long story".into());
        assert!(store.finish_detail(ticket.generation, Ok(full)));
        assert_eq!(store.detail.status, FetchStatus::Succeeded);

        store.clear_detail();
        assert!(store.detail.item.is_none());
        assert_eq!(store.detail.status, FetchStatus::Idle);
    }

    #[test]
    fn test_detail_completion_after_clear_is_dropped() {
        let mut store = store();
        let ticket = store.load_detail(7);
        store.clear_detail();

        assert!(ticket.token.is_cancelled());
        assert!(!store.finish_detail(ticket.generation, Ok(item(7))));
        assert!(store.detail.item.is_none());
    }

    #[test]
    fn test_top_and_categories() {
        let mut store = store();
        let top = store.begin_top();
        let categories = store.begin_categories();

        store.finish_top(top.generation, Ok(page(0..5, 5, false)));
        store.finish_categories(categories.generation, Err(GatewayError::Network("down".into())));

        assert_eq!(store.top.items.len(), 5);
        assert_eq!(store.top.status, FetchStatus::Succeeded);
        assert_eq!(store.categories.status, FetchStatus::Failed);
        assert!(store.categories.error.as_deref().unwrap().contains("genres"));
    }
}
