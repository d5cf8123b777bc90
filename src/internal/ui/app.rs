use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind};
use futures::StreamExt;
use ratatui::Frame;
use ratatui::widgets::ListState;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::api::{ApiService, GatewayError};
use crate::config::AppConfig;
use crate::internal::favorites::FavoritesStore;
use crate::internal::infinite_scroll::{LoadMoreGate, sentinel_visible};
use crate::internal::models::{Category, FetchStatus, Item, Page};
use crate::internal::notification::Notification;
use crate::internal::query::QueryController;
use crate::internal::storage::KvStore;
use crate::internal::store::{FetchMode, SearchDecision, SearchRequest, Store};
use crate::internal::ui::keybindings::{KeyBindingContext, KeyBindingMap};
use crate::internal::ui::keybindings_default::create_default_keybindings;
use crate::utils::theme::{ThemeMode, TuiTheme};

const MAL_ANIME_URL: &str = "https://myanimelist.net/anime";

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ViewMode {
    Browse,
    Detail,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum InputMode {
    Normal,
    Search,
}

/// Which pane of the browse view receives navigation keys.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Focus {
    Results,
    Categories,
}

/// User intents. These are what key bindings map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Quit,
    Back,
    NavigateUp,
    NavigateDown,
    Enter,
    OpenSearch,
    ToggleFavorite,
    ToggleSort,
    NextPage,
    PrevPage,
    LoadMore,
    ToggleFocus,
    ClearFilters,
    SwitchTheme,
    OpenBrowser,
    Retry,
    ToggleHelp,
}

/// Messages delivered to the app loop through the action channel.
#[derive(Debug)]
pub enum Action {
    Command(Command),
    SearchLoaded {
        generation: u64,
        outcome: Result<Page<Item>, GatewayError>,
    },
    DetailLoaded {
        generation: u64,
        outcome: Result<Item, GatewayError>,
    },
    TopLoaded {
        generation: u64,
        outcome: Result<Page<Item>, GatewayError>,
    },
    CategoriesLoaded {
        generation: u64,
        outcome: Result<Vec<Category>, GatewayError>,
    },
}

pub struct App {
    pub running: bool,
    pub app_version: String,
    pub config: AppConfig,
    pub api_service: Arc<ApiService>,
    pub store: Store,
    favorites_store: FavoritesStore,
    saved_favorites_revision: u64,
    kv: KvStore,
    pub query: QueryController,
    pub load_more_gate: LoadMoreGate,
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub focus: Focus,
    pub search_input: String,
    pub results_state: ListState,
    pub categories_state: ListState,
    /// Number of result entries that fit in the list viewport, updated by the view.
    pub results_viewport: usize,
    pub detail_scroll: u16,
    pub theme: TuiTheme,
    pub notification: Option<Notification>,
    pub show_help: bool,
    pub spinner_state: usize,
    pub last_spinner_update: Option<Instant>,
    pub keybindings: KeyBindingMap,
    pub action_tx: UnboundedSender<Action>,
    pub action_rx: UnboundedReceiver<Action>,
}

impl App {
    #[tracing::instrument(skip(config))]
    pub fn new(config: AppConfig) -> Self {
        let api = ApiService::new(&config.network, config.logging.enable_performance_metrics);
        let kv = KvStore::open_default(config.storage.data_dir.as_deref());
        Self::with_services(config, api, kv)
    }

    /// Builds the app around an explicit gateway and storage.
    pub fn with_services(config: AppConfig, api: ApiService, kv: KvStore) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        let favorites_store = FavoritesStore::new(kv.clone());
        let favorites = favorites_store.load();
        let store = Store::new(favorites, config.search.page_size);

        let theme_mode = ThemeMode::resolve(&kv, &config.theme);
        tracing::info!(theme = %theme_mode, "Selected theme");

        let mut keybindings = create_default_keybindings();
        if let Some(custom) = &config.keybindings {
            keybindings.merge_config(custom);
        }

        let mut categories_state = ListState::default();
        categories_state.select(Some(0));

        Self {
            running: true,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            api_service: Arc::new(api),
            store,
            favorites_store,
            saved_favorites_revision: 0,
            kv,
            query: QueryController::new(Duration::from_millis(config.search.debounce_ms)),
            load_more_gate: LoadMoreGate::new(Duration::from_millis(
                config.search.load_more_cooldown_ms,
            )),
            view_mode: ViewMode::Browse,
            input_mode: InputMode::Normal,
            focus: Focus::Results,
            search_input: String::new(),
            results_state: ListState::default(),
            categories_state,
            results_viewport: 0,
            detail_scroll: 0,
            theme: TuiTheme::for_mode(theme_mode),
            notification: None,
            show_help: false,
            spinner_state: 0,
            last_spinner_update: None,
            keybindings,
            action_tx,
            action_rx,
            config,
        }
    }

    pub fn notify_info(&mut self, message: impl Into<String>) {
        self.notification = Some(Notification::info(message));
    }

    pub fn notify_warning(&mut self, message: impl Into<String>) {
        self.notification = Some(Notification::warning(message));
    }

    pub fn notify_error(&mut self, message: impl Into<String>) {
        self.notification = Some(Notification::error(message));
    }

    /// Kicks off the requests the home screen needs.
    pub fn start(&mut self) {
        self.fetch_categories();
        self.ensure_top_loaded();
    }

    pub async fn run(&mut self, mut tui: crate::tui::Tui) -> Result<()> {
        self.start();

        let mut events = EventStream::new();
        let mut tick = tokio::time::interval(Duration::from_millis(50));

        while self.running {
            tui.draw(|f| self.ui(f))?;

            tokio::select! {
                _ = tick.tick() => self.on_tick(Instant::now()),
                Some(event) = events.next() => {
                    if let Event::Key(key) = event?
                        && key.kind == KeyEventKind::Press
                    {
                        self.handle_key_event(key);
                    }
                }
                Some(action) = self.action_rx.recv() => self.handle_action(action),
            }

            self.sync_favorites();
        }

        self.store.cancel_all();
        Ok(())
    }

    /// Timer-driven work: debounce, infinite scroll, spinner, notification expiry.
    pub fn on_tick(&mut self, now: Instant) {
        if let Some(decision) = self.query.poll(&mut self.store, now) {
            self.apply_decision(decision);
        }

        if self.view_mode == ViewMode::Browse && !self.store.search.is_home() {
            let offset = self.results_state.offset();
            let len = self.store.search.results.len();
            if sentinel_visible(offset, self.results_viewport, len)
                && let Some(request) = self.store.load_more_request()
                && self.load_more_gate.on_sentinel_visible(
                    now,
                    self.store.search.has_next,
                    self.store.search.is_loading(),
                )
            {
                tracing::debug!(page = request.page, "End of list visible, loading more");
                self.dispatch_search(request);
            }
        }

        match self.last_spinner_update {
            Some(last) if now.saturating_duration_since(last) < Duration::from_millis(100) => {}
            _ => {
                self.spinner_state = self.spinner_state.wrapping_add(1);
                self.last_spinner_update = Some(now);
            }
        }

        if let Some(notification) = &self.notification
            && notification.should_dismiss_at(now)
        {
            self.notification = None;
        }
    }

    /// Persists favorites when they changed since the last save.
    pub fn sync_favorites(&mut self) {
        let revision = self.store.favorites_revision();
        if revision != self.saved_favorites_revision {
            self.favorites_store.save(self.store.favorites());
            self.saved_favorites_revision = revision;
        }
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) {
        if self.show_help {
            match key.code {
                KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => self.show_help = false,
                _ => {}
            }
            return;
        }

        match self.input_mode {
            InputMode::Search => self.handle_search_input(key),
            InputMode::Normal => {
                if let Some(command) = self.keybindings.get_command(&key, self.context()) {
                    self.handle_command(command);
                }
            }
        }
    }

    fn context(&self) -> KeyBindingContext {
        match (self.view_mode, self.focus) {
            (ViewMode::Detail, _) => KeyBindingContext::Detail,
            (ViewMode::Browse, Focus::Categories) => KeyBindingContext::Categories,
            (ViewMode::Browse, Focus::Results) => KeyBindingContext::List,
        }
    }

    fn handle_search_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) => {
                self.search_input.push(c);
                self.query
                    .on_input(&mut self.store, self.search_input.clone(), Instant::now());
            }
            KeyCode::Backspace => {
                self.search_input.pop();
                self.query
                    .on_input(&mut self.store, self.search_input.clone(), Instant::now());
            }
            KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                if let Some(decision) = self.query.flush(&mut self.store) {
                    self.apply_decision(decision);
                }
            }
            KeyCode::Esc => self.input_mode = InputMode::Normal,
            _ => {}
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn handle_command(&mut self, command: Command) {
        match command {
            Command::Quit => self.running = false,
            Command::Back => match (self.view_mode, self.focus) {
                (ViewMode::Detail, _) => self.close_detail(),
                (ViewMode::Browse, Focus::Categories) => self.focus = Focus::Results,
                (ViewMode::Browse, Focus::Results) => self.running = false,
            },
            Command::NavigateDown => self.navigate(1),
            Command::NavigateUp => self.navigate(-1),
            Command::Enter => match (self.view_mode, self.focus) {
                (ViewMode::Browse, Focus::Results) => self.open_detail(),
                (ViewMode::Browse, Focus::Categories) => self.select_category(),
                (ViewMode::Detail, _) => {}
            },
            Command::OpenSearch => {
                if self.view_mode == ViewMode::Detail {
                    self.close_detail();
                }
                self.focus = Focus::Results;
                self.search_input = self.store.search.query.clone();
                self.input_mode = InputMode::Search;
            }
            Command::ToggleFavorite => self.toggle_favorite(),
            Command::ToggleSort => {
                let sort = self.store.search.sort.toggle();
                if let Some(request) = self.store.set_sort(sort) {
                    self.dispatch_search(request);
                }
                self.notify_info(format!("Sort by score: {}", sort.label()));
            }
            Command::NextPage => self.change_page(1),
            Command::PrevPage => self.change_page(-1),
            Command::LoadMore => match self.store.load_more_request() {
                Some(request) => self.dispatch_search(request),
                None if !self.store.search.is_home() && !self.store.search.has_next => {
                    self.notify_warning("No more results");
                }
                None => {}
            },
            Command::ToggleFocus => {
                if self.view_mode == ViewMode::Browse {
                    self.focus = match self.focus {
                        Focus::Results => Focus::Categories,
                        Focus::Categories => Focus::Results,
                    };
                    if self.store.categories.status == FetchStatus::Failed {
                        self.fetch_categories();
                    }
                }
            }
            Command::ClearFilters => {
                self.query.cancel();
                self.search_input.clear();
                self.store.reset_search();
                self.load_more_gate.reset();
                self.categories_state.select(Some(0));
                self.results_state.select(None);
                self.ensure_top_loaded();
            }
            Command::SwitchTheme => {
                let mode = self.theme.mode.toggle();
                self.theme = TuiTheme::for_mode(mode);
                mode.persist(&self.kv);
                self.notify_info(format!("Switched to {} theme", mode));
            }
            Command::OpenBrowser => self.open_in_browser(),
            Command::Retry => self.retry(),
            Command::ToggleHelp => self.show_help = !self.show_help,
        }
    }

    pub fn handle_action(&mut self, action: Action) {
        match action {
            Action::Command(command) => self.handle_command(command),
            Action::SearchLoaded {
                generation,
                outcome,
            } => {
                let mode = self.store.search.last_request.as_ref().map(|r| r.mode);
                if !self.store.finish_search(generation, outcome) {
                    return;
                }
                match mode {
                    // a failed append keeps the gate waiting until retry or a new search
                    Some(FetchMode::Append) if self.store.search.status == FetchStatus::Failed => {}
                    Some(FetchMode::Append) => self.load_more_gate.on_settled(Instant::now()),
                    _ => {
                        self.load_more_gate.reset();
                        self.results_state = ListState::default();
                    }
                }
                if let Some(error) = self.store.search.error.clone() {
                    self.notify_error(error);
                } else if !self.store.search.results.is_empty()
                    && self.results_state.selected().is_none()
                {
                    self.results_state.select(Some(0));
                }
            }
            Action::DetailLoaded {
                generation,
                outcome,
            } => {
                if self.store.finish_detail(generation, outcome)
                    && let Some(error) = self.store.detail.error.clone()
                {
                    self.notify_error(error);
                }
            }
            Action::TopLoaded {
                generation,
                outcome,
            } => {
                if self.store.finish_top(generation, outcome)
                    && let Some(error) = self.store.top.error.clone()
                {
                    self.notify_error(error);
                }
            }
            Action::CategoriesLoaded {
                generation,
                outcome,
            } => {
                if self.store.finish_categories(generation, outcome)
                    && let Some(error) = self.store.categories.error.clone()
                {
                    self.notify_error(error);
                }
            }
        }
    }

    fn apply_decision(&mut self, decision: SearchDecision) {
        match decision {
            SearchDecision::Fetch(request) => self.dispatch_search(request),
            SearchDecision::Home => {
                self.load_more_gate.reset();
                self.results_state = ListState::default();
                self.ensure_top_loaded();
            }
        }
    }

    fn dispatch_search(&mut self, request: SearchRequest) {
        if request.mode == FetchMode::Replace {
            self.load_more_gate.reset();
        }
        let params = request.params();
        let ticket = self.store.trigger_search(request);
        let api = self.api_service.clone();
        let tx = self.action_tx.clone();

        tokio::spawn(async move {
            let outcome = api.search(&params, &ticket.token).await;
            let _ = tx.send(Action::SearchLoaded {
                generation: ticket.generation,
                outcome,
            });
        });
    }

    fn ensure_top_loaded(&mut self) {
        if self.store.top.status != FetchStatus::Idle {
            return;
        }
        self.fetch_top();
    }

    fn fetch_top(&mut self) {
        let ticket = self.store.begin_top();
        let page_size = self.config.search.page_size;
        let api = self.api_service.clone();
        let tx = self.action_tx.clone();

        tokio::spawn(async move {
            let outcome = api.top_items(1, page_size, &ticket.token).await;
            let _ = tx.send(Action::TopLoaded {
                generation: ticket.generation,
                outcome,
            });
        });
    }

    fn fetch_categories(&mut self) {
        let ticket = self.store.begin_categories();
        let api = self.api_service.clone();
        let tx = self.action_tx.clone();

        tokio::spawn(async move {
            let outcome = api.list_categories(&ticket.token).await;
            let _ = tx.send(Action::CategoriesLoaded {
                generation: ticket.generation,
                outcome,
            });
        });
    }

    fn fetch_detail(&mut self, id: u32) {
        let ticket = self.store.load_detail(id);
        let api = self.api_service.clone();
        let tx = self.action_tx.clone();

        tokio::spawn(async move {
            let outcome = api.detail(id, &ticket.token).await;
            let _ = tx.send(Action::DetailLoaded {
                generation: ticket.generation,
                outcome,
            });
        });
    }

    /// Items shown in the browse list: search results, or favorites followed
    /// by trending items on the home screen.
    pub fn visible_items(&self) -> Vec<&Item> {
        if self.store.search.is_home() {
            self.store
                .favorites()
                .iter()
                .chain(self.store.top.items.iter())
                .collect()
        } else {
            self.store.search.results.iter().collect()
        }
    }

    pub fn selected_item(&self) -> Option<&Item> {
        let index = self.results_state.selected()?;
        self.visible_items().get(index).copied()
    }

    fn navigate(&mut self, delta: isize) {
        match (self.view_mode, self.focus) {
            (ViewMode::Detail, _) => {
                self.detail_scroll = match delta {
                    d if d < 0 => self.detail_scroll.saturating_sub(1),
                    _ => self.detail_scroll.saturating_add(1),
                };
            }
            (ViewMode::Browse, Focus::Results) => {
                let len = self.visible_items().len();
                step_selection(&mut self.results_state, len, delta);
            }
            (ViewMode::Browse, Focus::Categories) => {
                // row 0 is "All genres"
                let len = self.store.categories.items.len() + 1;
                step_selection(&mut self.categories_state, len, delta);
            }
        }
    }

    fn open_detail(&mut self) {
        let Some(id) = self.selected_item().map(|item| item.mal_id) else {
            return;
        };
        self.detail_scroll = 0;
        self.view_mode = ViewMode::Detail;
        self.fetch_detail(id);
    }

    fn close_detail(&mut self) {
        self.store.clear_detail();
        self.view_mode = ViewMode::Browse;
    }

    fn select_category(&mut self) {
        let index = self.categories_state.selected().unwrap_or(0);
        let chosen = match index {
            0 => None,
            i => self.store.categories.items.get(i - 1).map(|c| c.mal_id),
        };
        // selecting the active genre again clears the filter
        let id = match chosen {
            Some(id) if self.store.search.category_id == Some(id) => None,
            other => other,
        };

        match self.store.set_category(id) {
            Some(request) => self.dispatch_search(request),
            None => self.apply_decision(SearchDecision::Home),
        }
        if id.is_none() {
            self.categories_state.select(Some(0));
        }
        self.focus = Focus::Results;
    }

    fn change_page(&mut self, delta: i64) {
        let target = i64::from(self.store.search.page) + delta;
        let request = u32::try_from(target)
            .ok()
            .and_then(|page| self.store.page_request(page));
        match request {
            Some(request) => self.dispatch_search(request),
            None if delta > 0 && !self.store.search.is_home() && !self.store.search.has_next => {
                self.notify_warning("Already on the last page");
            }
            None => {}
        }
    }

    fn toggle_favorite(&mut self) {
        let item = match self.view_mode {
            ViewMode::Detail => self.store.detail.item.clone(),
            ViewMode::Browse => self.selected_item().cloned(),
        };
        let Some(item) = item else {
            return;
        };

        let added = self.store.toggle_favorite(&item);
        let message = match added {
            true => format!("Added \"{}\" to favorites", item.title),
            false => format!("Removed \"{}\" from favorites", item.title),
        };
        self.notify_info(message);

        // removing from the home list can leave the selection past the end
        let len = self.visible_items().len();
        if let Some(selected) = self.results_state.selected()
            && selected >= len
        {
            self.results_state.select(len.checked_sub(1));
        }
    }

    fn open_in_browser(&mut self) {
        let item = match self.view_mode {
            ViewMode::Detail => self.store.detail.item.as_ref(),
            ViewMode::Browse => self.selected_item(),
        };
        let Some(item) = item else {
            return;
        };
        let url = item
            .url
            .clone()
            .unwrap_or_else(|| format!("{}/{}", MAL_ANIME_URL, item.mal_id));

        if let Err(e) = open::that(&url) {
            tracing::error!(url = %url, error = %e, "Failed to open browser");
            self.notify_error(format!("Could not open {}", url));
        }
    }

    fn retry(&mut self) {
        if self.view_mode == ViewMode::Detail {
            if self.store.detail.status == FetchStatus::Failed
                && let Some(id) = self.store.detail.id
            {
                self.fetch_detail(id);
            }
            return;
        }

        if let Some(request) = self.store.retry_search() {
            self.dispatch_search(request);
        }
        if self.store.top.status == FetchStatus::Failed {
            self.fetch_top();
        }
        if self.store.categories.status == FetchStatus::Failed {
            self.fetch_categories();
        }
    }

    pub fn get_spinner_char(&self) -> &'static str {
        const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
        SPINNER_FRAMES[self.spinner_state % SPINNER_FRAMES.len()]
    }

    pub fn loading_description(&self) -> Option<&'static str> {
        let store = &self.store;
        if self.view_mode == ViewMode::Detail && store.detail.status == FetchStatus::Loading {
            Some("Loading details...")
        } else if store.search.is_loading_more() {
            Some("Loading more...")
        } else if store.search.is_loading() {
            Some("Searching...")
        } else if store.search.is_home() && store.top.status == FetchStatus::Loading {
            Some("Loading trending...")
        } else if store.categories.status == FetchStatus::Loading {
            Some("Loading genres...")
        } else {
            None
        }
    }

    pub fn ui(&mut self, f: &mut Frame) {
        super::view::draw(self, f);
    }
}

fn step_selection(state: &mut ListState, len: usize, delta: isize) {
    if len == 0 {
        state.select(None);
        return;
    }
    let next = match state.selected() {
        Some(i) if delta > 0 => (i + 1).min(len - 1),
        Some(i) => i.saturating_sub(1),
        None => 0,
    };
    state.select(Some(next));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use mockito::Matcher;

    const NARUTO_PAGE: &str = r#"{
        "pagination": { "last_visible_page": 2, "has_next_page": true,
                        "items": { "count": 2, "total": 4, "per_page": 2 } },
        "data": [
            { "mal_id": 20, "title": "Naruto" },
            { "mal_id": 1735, "title": "Naruto: Shippuuden" }
        ]
    }"#;

    fn app_with(server_url: String, dir: &std::path::Path) -> App {
        let mut config = AppConfig::default();
        config.search.page_size = 2;
        App::with_services(
            config,
            ApiService::with_base_url(server_url),
            KvStore::at(dir),
        )
    }

    fn press(app: &mut App, c: char) {
        app.handle_key_event(KeyEvent::new(KeyCode::Char(c), KeyModifiers::empty()));
    }

    #[tokio::test]
    async fn test_typed_query_fetches_after_debounce() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/anime")
            .match_query(Matcher::UrlEncoded("q".into(), "naruto".into()))
            .with_status(200)
            .with_body(NARUTO_PAGE)
            .expect(1)
            .create_async()
            .await;
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(server.url(), dir.path());

        press(&mut app, '/');
        assert_eq!(app.input_mode, InputMode::Search);
        for c in "naruto".chars() {
            press(&mut app, c);
        }
        app.on_tick(Instant::now());
        assert_eq!(app.store.search.status, FetchStatus::Idle);

        app.on_tick(Instant::now() + Duration::from_secs(1));
        assert_eq!(app.store.search.status, FetchStatus::Loading);

        let action = app.action_rx.recv().await.unwrap();
        app.handle_action(action);

        mock.assert_async().await;
        assert_eq!(app.store.search.results.len(), 2);
        assert_eq!(app.store.search.status, FetchStatus::Succeeded);
        assert_eq!(app.selected_item().map(|i| i.mal_id), Some(20));
    }

    #[tokio::test]
    async fn test_favorite_toggle_is_persisted() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/anime")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(NARUTO_PAGE)
            .create_async()
            .await;
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(server.url(), dir.path());

        app.query.on_input(&mut app.store, "naruto", Instant::now());
        let decision = app.query.flush(&mut app.store).unwrap();
        app.apply_decision(decision);
        let action = app.action_rx.recv().await.unwrap();
        app.handle_action(action);

        press(&mut app, 'j');
        press(&mut app, 'f');
        app.sync_favorites();

        let stored = FavoritesStore::new(KvStore::at(dir.path())).load();
        assert!(stored.contains(1735));
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_search_surfaces_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/anime")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(server.url(), dir.path());

        let request = app.store.set_category(Some(1)).unwrap();
        app.dispatch_search(request);
        let action = app.action_rx.recv().await.unwrap();
        app.handle_action(action);

        assert_eq!(app.store.search.status, FetchStatus::Failed);
        let notification = app.notification.as_ref().unwrap();
        assert!(notification.message.starts_with("Failed to fetch search results"));
    }

    #[tokio::test]
    async fn test_failed_append_does_not_refire() {
        let mut server = mockito::Server::new_async().await;
        let _first = server
            .mock("GET", "/anime")
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .with_status(200)
            .with_body(NARUTO_PAGE)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/anime")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(503)
            .expect(2)
            .create_async()
            .await;
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(server.url(), dir.path());
        app.results_viewport = 10;

        app.query.on_input(&mut app.store, "naruto", Instant::now());
        let decision = app.query.flush(&mut app.store).unwrap();
        app.apply_decision(decision);
        let action = app.action_rx.recv().await.unwrap();
        app.handle_action(action);

        let t0 = Instant::now();
        app.on_tick(t0);
        assert!(app.store.search.is_loading_more());
        let action = app.action_rx.recv().await.unwrap();
        app.handle_action(action);
        assert_eq!(app.store.search.status, FetchStatus::Failed);

        for i in 1..=5 {
            app.on_tick(t0 + Duration::from_millis(300 * i));
            assert!(!app.store.search.is_loading());
        }
        assert!(app.action_rx.try_recv().is_err());
        assert_eq!(app.store.search.results.len(), 2);

        press(&mut app, 'r');
        assert!(app.store.search.is_loading_more());
        let action = app.action_rx.recv().await.unwrap();
        app.handle_action(action);

        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_clear_filters_returns_home() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with("http://127.0.0.1:1".to_string(), dir.path());

        let request = app.store.set_category(Some(1)).unwrap();
        app.dispatch_search(request);
        press(&mut app, 'x');

        assert!(app.store.search.is_home());
        assert_eq!(app.store.search.status, FetchStatus::Idle);
        assert_eq!(app.store.top.status, FetchStatus::Loading);
    }

    #[tokio::test]
    async fn test_theme_switch_is_stored() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with("http://127.0.0.1:1".to_string(), dir.path());
        assert_eq!(app.theme.mode, ThemeMode::Dark);

        press(&mut app, 't');

        assert_eq!(app.theme.mode, ThemeMode::Light);
        assert_eq!(
            ThemeMode::resolve(&KvStore::at(dir.path()), "dark"),
            ThemeMode::Light
        );
    }

    #[test]
    fn test_help_overlay_swallows_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with("http://127.0.0.1:1".to_string(), dir.path());

        press(&mut app, '?');
        assert!(app.show_help);
        press(&mut app, 'q');
        assert!(!app.show_help);
        assert!(app.running);
    }

    #[test]
    fn test_step_selection_clamps() {
        let mut state = ListState::default();
        step_selection(&mut state, 3, -1);
        assert_eq!(state.selected(), Some(0));
        step_selection(&mut state, 3, 1);
        step_selection(&mut state, 3, 1);
        step_selection(&mut state, 3, 1);
        assert_eq!(state.selected(), Some(2));
        step_selection(&mut state, 0, 1);
        assert_eq!(state.selected(), None);
    }
}
