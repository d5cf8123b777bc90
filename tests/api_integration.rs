use std::time::{Duration, Instant};

use mockito::Matcher;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tui_anime_app::api::{ApiService, GatewayError};
use tui_anime_app::config::NetworkConfig;
use tui_anime_app::internal::favorites::FavoritesMap;
use tui_anime_app::internal::models::FetchStatus;
use tui_anime_app::internal::store::{FetchMode, SearchDecision, Store};

fn page_body(ids: std::ops::Range<u32>, has_next: bool) -> String {
    let data: Vec<String> = ids
        .map(|id| format!(r#"{{ "mal_id": {id}, "title": "Naruto {id}", "score": 7.5 }}"#))
        .collect();
    format!(
        r#"{{ "pagination": {{ "last_visible_page": 50, "has_next_page": {has_next},
              "items": {{ "count": 10, "total": 500, "per_page": 10 }} }},
            "data": [{}] }}"#,
        data.join(",")
    )
}

/// Accepts connections and never answers.
async fn silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_search_then_append_through_store() {
    let mut server = mockito::Server::new_async().await;
    let page1 = server
        .mock("GET", "/anime")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "naruto".into()),
            Matcher::UrlEncoded("page".into(), "1".into()),
        ]))
        .with_status(200)
        .with_body(page_body(0..10, true))
        .create_async()
        .await;
    let page2 = server
        .mock("GET", "/anime")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "naruto".into()),
            Matcher::UrlEncoded("page".into(), "2".into()),
        ]))
        .with_status(200)
        .with_body(page_body(10..20, true))
        .create_async()
        .await;

    let api = ApiService::with_base_url(server.url());
    let mut store = Store::new(FavoritesMap::new(), 10);

    let SearchDecision::Fetch(request) = store.apply_debounced_query("naruto") else {
        panic!("expected a fetch");
    };
    let ticket = store.trigger_search(request.clone());
    let outcome = api.search(&request.params(), &ticket.token).await;
    store.finish_search(ticket.generation, outcome);

    assert_eq!(store.search.results.len(), 10);
    assert_eq!(store.search.status, FetchStatus::Succeeded);
    assert_eq!(store.search.total, 500);
    assert!(store.search.has_next);

    let request = store.load_more_request().unwrap();
    assert_eq!(request.mode, FetchMode::Append);
    let ticket = store.trigger_search(request.clone());
    let outcome = api.search(&request.params(), &ticket.token).await;
    store.finish_search(ticket.generation, outcome);

    page1.assert_async().await;
    page2.assert_async().await;
    assert_eq!(store.search.results.len(), 20);
    let ids: Vec<u32> = store.search.results.iter().map(|i| i.mal_id).collect();
    assert_eq!(ids, (0..20).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_cancel_in_flight_request() {
    let api = ApiService::with_base_url(silent_server().await);
    let token = CancellationToken::new();

    let handle = {
        let api = api.clone();
        let token = token.clone();
        tokio::spawn(async move { api.detail(1, &token).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    let start = Instant::now();
    token.cancel();
    let result = handle.await.unwrap();

    assert_eq!(result.unwrap_err(), GatewayError::Cancelled);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_superseded_search_is_cancelled_and_ignored() {
    let slow = ApiService::with_base_url(silent_server().await);
    let mut store = Store::new(FavoritesMap::new(), 10);

    let SearchDecision::Fetch(first) = store.apply_debounced_query("one") else {
        panic!("expected a fetch");
    };
    let first_ticket = store.trigger_search(first.clone());
    let first_call = {
        let slow = slow.clone();
        let token = first_ticket.token.clone();
        tokio::spawn(async move { slow.search(&first.params(), &token).await })
    };

    let SearchDecision::Fetch(second) = store.apply_debounced_query("two") else {
        panic!("expected a fetch");
    };
    let _second_ticket = store.trigger_search(second);

    let outcome = first_call.await.unwrap();
    assert!(outcome.as_ref().unwrap_err().is_cancelled());
    assert!(!store.finish_search(first_ticket.generation, outcome));
    assert_eq!(store.search.status, FetchStatus::Loading);
    assert_eq!(
        store.search.last_request.as_ref().map(|r| r.query.as_str()),
        Some("two")
    );
}

#[tokio::test]
async fn test_timeout_is_classified() {
    let network = NetworkConfig {
        base_url: silent_server().await,
        timeout_secs: 1,
        ..NetworkConfig::default()
    };
    let api = ApiService::new(&network, false);

    let err = api
        .list_categories(&CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err, GatewayError::Timeout);
    assert!(err.is_network_or_timeout());
}

#[tokio::test]
async fn test_top_items() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/top/anime")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".into(), "1".into()),
            Matcher::UrlEncoded("limit".into(), "10".into()),
        ]))
        .with_status(200)
        .with_body(page_body(100..110, true))
        .create_async()
        .await;

    let api = ApiService::with_base_url(server.url());
    let mut store = Store::new(FavoritesMap::new(), 10);
    let ticket = store.begin_top();
    let outcome = api.top_items(1, 10, &ticket.token).await;
    assert!(store.finish_top(ticket.generation, outcome));

    mock.assert_async().await;
    assert_eq!(store.top.items.len(), 10);
    assert_eq!(store.top.items[0].mal_id, 100);
}
