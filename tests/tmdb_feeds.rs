//! End-to-end tests: the pagination controller on top of the TMDB client,
//! against a mock discover endpoint.

use cinefeed::catalog::Category;
use cinefeed::config::TmdbConfig;
use cinefeed::feed::PaginationController;
use cinefeed::tmdb::TmdbClient;
use secrecy::SecretString;
use serde_json::json;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn page_body(page: u32, ids: &[u64]) -> serde_json::Value {
    let results: Vec<_> = ids
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "title": format!("Movie {id}"),
                "poster_path": format!("/{id}.jpg"),
                "overview": "",
                "vote_average": 6.5,
                "release_date": "2011-11-11"
            })
        })
        .collect();
    json!({
        "page": page,
        "results": results,
        "total_pages": 3,
        "total_results": 60
    })
}

async fn mount_page(server: &MockServer, sort_by: &str, page: u32, ids: &[u64]) {
    Mock::given(method("GET"))
        .and(path("/3/discover/movie"))
        .and(query_param("sort_by", sort_by))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(page, ids)))
        .mount(server)
        .await;
}

fn controller_for(server: &MockServer) -> PaginationController<TmdbClient> {
    controller_at(&format!("{}/3", server.uri()), 5)
}

fn controller_at(base_url: &str, timeout_secs: u64) -> PaginationController<TmdbClient> {
    let config = TmdbConfig {
        base_url: base_url.to_string(),
        image_base_url: "https://img.example.com/t/p/".to_string(),
        max_retries: 1,
        retry_backoff_ms: 1,
        timeout_secs,
        ..TmdbConfig::default()
    };
    let client = TmdbClient::new(
        reqwest::Client::new(),
        &config,
        SecretString::from("integration-key".to_string()),
    )
    .unwrap();
    PaginationController::new(client)
}

#[tokio::test]
async fn test_three_feeds_load_and_page_through_tmdb() {
    let server = MockServer::start().await;
    mount_page(&server, "popularity.desc", 1, &[1, 2]).await;
    mount_page(&server, "popularity.desc", 2, &[2, 3]).await;
    mount_page(&server, "popularity.desc", 3, &[]).await;
    mount_page(&server, "vote_average.desc", 1, &[20]).await;
    mount_page(&server, "revenue.desc", 1, &[30, 31]).await;

    let controller = controller_for(&server);
    for handle in controller.start() {
        handle.await.unwrap();
    }

    let state = controller.snapshot();
    assert_eq!(state.feed(Category::Popular).items().len(), 2);
    assert_eq!(state.feed(Category::TopRated).items().len(), 1);
    assert_eq!(state.feed(Category::Revenue).items().len(), 2);

    let revenue = &state.feed(Category::Revenue).items()[0];
    assert_eq!(
        revenue.poster_url.as_deref(),
        Some("https://img.example.com/t/p/w500/30.jpg")
    );
    assert!(revenue.overview.is_none());
    assert_eq!(revenue.release_year(), Some(2011));

    controller.load_more(Category::Popular).unwrap().await.unwrap();
    controller.load_more(Category::Popular).unwrap().await.unwrap();

    let state = controller.snapshot();
    let popular = state.feed(Category::Popular);
    let ids: Vec<u64> = popular.items().iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(popular.next_page(), 4);
    assert!(popular.end_reached());
    assert!(controller.load_more(Category::Popular).is_none());
}

#[tokio::test]
async fn test_http_failure_lands_in_last_error_only_for_that_feed() {
    let server = MockServer::start().await;
    mount_page(&server, "popularity.desc", 1, &[1]).await;
    mount_page(&server, "revenue.desc", 1, &[3]).await;
    Mock::given(method("GET"))
        .and(query_param("sort_by", "vote_average.desc"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let controller = controller_for(&server);
    for handle in controller.start() {
        handle.await.unwrap();
    }

    let state = controller.snapshot();
    let top = state.feed(Category::TopRated);
    assert_eq!(top.last_error(), Some("HTTP error: status 401"));
    assert_eq!(top.next_page(), 1);
    assert!(top.items().is_empty());
    assert!(!top.end_reached());

    assert!(state.feed(Category::Popular).last_error().is_none());
    assert!(state.feed(Category::Revenue).last_error().is_none());
    assert_eq!(controller.movie(3).map(|m| m.title), Some("Movie 3".to_string()));
}

#[tokio::test]
async fn test_api_key_is_sent_but_not_leaked_into_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("api_key", "integration-key"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let controller = controller_for(&server);
    for handle in controller.start() {
        handle.await.unwrap();
    }

    let state = controller.snapshot();
    for feed in state.feeds() {
        let error = feed.last_error().expect("decode should fail");
        assert!(error.starts_with("Malformed response"));
        assert!(!error.contains("integration-key"));
    }
}

/// Answers every connection with headers and a truncated body, then goes
/// silent.
async fn stalling_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n{\"results\":",
                    )
                    .await;
                tokio::time::sleep(Duration::from_secs(30)).await;
            });
        }
    });
    format!("http://{}/3", addr)
}

#[tokio::test]
async fn test_stalled_body_times_out_and_feed_can_retry() {
    let base_url = stalling_server().await;
    let controller = controller_at(&base_url, 1);

    let load = async {
        for handle in controller.start() {
            handle.await.unwrap();
        }
    };
    tokio::time::timeout(Duration::from_secs(10), load)
        .await
        .expect("loads should finish once the request times out");

    let state = controller.snapshot();
    for feed in state.feeds() {
        assert!(!feed.is_loading());
        assert_eq!(feed.last_error(), Some("Request timed out"));
        assert_eq!(feed.next_page(), 1);
    }
    assert!(controller.load_more(Category::Popular).is_some());
}
