use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use market_scraper::fetchers::WebDriverFetcher;
use market_scraper::{Extractor, FetchError, PageFetcher};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

const LOADING: &str = "<html><body><div class=\"spinner\">Loading</div></body></html>";
const RENDERED: &str = "<html><body>\
    <div class=\"overview-table-row\"><div>BTC/USDT</div><div>67250.85</div><div>+1.35%</div></div>\
    </body></html>";

#[derive(Default)]
struct DriverState {
    /// Polls answered with the loading page before rows appear; None = never
    ready_after: Option<usize>,
    navigation_error: Option<(StatusCode, &'static str)>,
    reject_sessions: bool,
    sessions_created: usize,
    navigated_to: Vec<String>,
    source_polls: usize,
    deleted: Vec<String>,
}

type Shared = Arc<Mutex<DriverState>>;

async fn new_session(State(state): State<Shared>) -> (StatusCode, Json<Value>) {
    let mut state = state.lock().unwrap();
    if state.reject_sessions {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "value": { "error": "session not created", "message": "chrome not found" } })),
        );
    }
    state.sessions_created += 1;
    let id = format!("session-{}", state.sessions_created);
    (
        StatusCode::OK,
        Json(json!({ "value": { "sessionId": id, "capabilities": {} } })),
    )
}

async fn navigate(
    State(state): State<Shared>,
    Path(_id): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut state = state.lock().unwrap();
    state
        .navigated_to
        .push(body["url"].as_str().unwrap_or_default().to_string());
    match state.navigation_error {
        Some((status, error)) => (
            status,
            Json(json!({ "value": { "error": error, "message": "navigation failed" } })),
        ),
        None => (StatusCode::OK, Json(json!({ "value": null }))),
    }
}

async fn source(State(state): State<Shared>, Path(_id): Path<String>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.source_polls += 1;
    let rendered = state
        .ready_after
        .is_some_and(|after| state.source_polls > after);
    let page = if rendered { RENDERED } else { LOADING };
    Json(json!({ "value": page }))
}

async fn delete_session(State(state): State<Shared>, Path(id): Path<String>) -> Json<Value> {
    state.lock().unwrap().deleted.push(id);
    Json(json!({ "value": null }))
}

async fn spawn_driver(state: DriverState) -> (String, Shared) {
    let shared = Arc::new(Mutex::new(state));
    let app = Router::new()
        .route("/session", post(new_session))
        .route("/session/:id", delete(delete_session))
        .route("/session/:id/url", post(navigate))
        .route("/session/:id/source", get(source))
        .with_state(shared.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), shared)
}

fn fetcher(url: &str) -> WebDriverFetcher {
    let extractor = Extractor::new("div.overview-table-row").unwrap();
    WebDriverFetcher::new(url, extractor)
        .unwrap()
        .with_render_timeout(Duration::from_millis(200))
        .with_poll_interval(Duration::from_millis(10))
}

#[tokio::test]
async fn fetch_waits_for_rows_then_closes_session() {
    let (url, state) = spawn_driver(DriverState {
        ready_after: Some(2),
        ..Default::default()
    })
    .await;

    let html = fetcher(&url).fetch("https://example.test/markets").await.unwrap();

    assert!(html.contains("BTC/USDT"));
    let state = state.lock().unwrap();
    assert_eq!(state.navigated_to, vec!["https://example.test/markets"]);
    assert_eq!(state.source_polls, 3);
    assert_eq!(state.deleted, vec!["session-1"]);
}

#[tokio::test]
async fn render_timeout_still_closes_session() {
    let (url, state) = spawn_driver(DriverState::default()).await;

    let result = fetcher(&url).fetch("https://example.test/markets").await;

    assert!(matches!(result, Err(FetchError::RenderTimeout { .. })));
    let state = state.lock().unwrap();
    assert!(state.source_polls > 1);
    assert_eq!(state.deleted, vec!["session-1"]);
}

#[tokio::test]
async fn navigation_error_still_closes_session() {
    let (url, state) = spawn_driver(DriverState {
        navigation_error: Some((StatusCode::INTERNAL_SERVER_ERROR, "unknown error")),
        ..Default::default()
    })
    .await;

    let result = fetcher(&url).fetch("https://unreachable.test").await;

    match result {
        Err(FetchError::WebDriver(msg)) => assert!(msg.contains("navigation failed")),
        other => panic!("expected WebDriver error, got {other:?}"),
    }
    assert_eq!(state.lock().unwrap().deleted, vec!["session-1"]);
}

#[tokio::test]
async fn page_load_timeout_maps_to_timeout() {
    let (url, state) = spawn_driver(DriverState {
        navigation_error: Some((StatusCode::INTERNAL_SERVER_ERROR, "timeout")),
        ..Default::default()
    })
    .await;

    let result = fetcher(&url).fetch("https://slow.test").await;

    assert!(matches!(result, Err(FetchError::Timeout)));
    assert_eq!(state.lock().unwrap().deleted, vec!["session-1"]);
}

#[tokio::test]
async fn each_fetch_uses_a_fresh_session() {
    let (url, state) = spawn_driver(DriverState {
        ready_after: Some(0),
        ..Default::default()
    })
    .await;
    let fetcher = fetcher(&url);

    fetcher.fetch("https://example.test/markets").await.unwrap();
    fetcher.fetch("https://example.test/markets").await.unwrap();

    let state = state.lock().unwrap();
    assert_eq!(state.sessions_created, 2);
    assert_eq!(state.deleted, vec!["session-1", "session-2"]);
}

#[tokio::test]
async fn session_creation_failure_is_reported() {
    let (url, state) = spawn_driver(DriverState {
        reject_sessions: true,
        ..Default::default()
    })
    .await;

    let result = fetcher(&url).fetch("https://example.test/markets").await;

    assert!(matches!(result, Err(FetchError::WebDriver(_))));
    assert!(state.lock().unwrap().deleted.is_empty());
}
