//! Headless browser fetcher speaking the W3C WebDriver protocol

use crate::{
    constants::{
        BROWSER_ARGS, DEFAULT_PAGE_LOAD_TIMEOUT_SECS, DEFAULT_RENDER_TIMEOUT_SECS,
        RENDER_POLL_INTERVAL_MS, REQUEST_TIMEOUT_SECS, USER_AGENT,
    },
    error::FetchError,
    extractor::Extractor,
    fetcher::PageFetcher,
};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Every WebDriver response wraps its payload in `value`
#[derive(Debug, Deserialize)]
struct WebDriverResponse {
    value: Value,
}

#[derive(Debug, Deserialize)]
struct NewSessionValue {
    #[serde(rename = "sessionId")]
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct WebDriverErrorValue {
    error: String,
    #[serde(default)]
    message: String,
}

/// Fetches pages through a headless Chrome driven over WebDriver
///
/// One browser session is opened per fetch and deleted before `fetch`
/// returns, on success and on every error path. If the fetch future itself
/// is dropped mid-flight, the session is deleted from a background task.
pub struct WebDriverFetcher {
    client: Client,
    webdriver_url: String,
    extractor: Extractor,
    render_timeout: Duration,
    page_load_timeout: Duration,
    poll_interval: Duration,
}

impl WebDriverFetcher {
    /// Creates a fetcher talking to the WebDriver server at `webdriver_url`
    ///
    /// `extractor` decides when the page counts as rendered.
    pub fn new(webdriver_url: impl Into<String>, extractor: Extractor) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(FetchError::NetworkError)?;

        Ok(Self {
            client,
            webdriver_url: webdriver_url.into().trim_end_matches('/').to_string(),
            extractor,
            render_timeout: Duration::from_secs(DEFAULT_RENDER_TIMEOUT_SECS),
            page_load_timeout: Duration::from_secs(DEFAULT_PAGE_LOAD_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(RENDER_POLL_INTERVAL_MS),
        })
    }

    /// Upper bound on waiting for rows after navigation
    pub fn with_render_timeout(mut self, render_timeout: Duration) -> Self {
        self.render_timeout = render_timeout;
        self
    }

    /// Browser page-load timeout sent with the session capabilities
    pub fn with_page_load_timeout(mut self, page_load_timeout: Duration) -> Self {
        self.page_load_timeout = page_load_timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn capabilities(&self) -> Value {
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": BROWSER_ARGS },
                    "timeouts": { "pageLoad": self.page_load_timeout.as_millis() as u64 }
                }
            }
        })
    }

    async fn new_session(&self) -> Result<Session, FetchError> {
        let value: NewSessionValue = command(
            &self.client,
            Method::POST,
            &format!("{}/session", self.webdriver_url),
            Some(self.capabilities()),
        )
        .await?;

        tracing::debug!(session_id = %value.session_id, "Opened browser session");

        Ok(Session {
            id: value.session_id,
            client: self.client.clone(),
            webdriver_url: self.webdriver_url.clone(),
            released: false,
        })
    }

    /// Navigates and polls the page source until rows render or the wait runs out
    async fn load_rendered(&self, session: &Session, url: &str) -> Result<String, FetchError> {
        let _: Value = command(
            &self.client,
            Method::POST,
            &session.endpoint("url"),
            Some(json!({ "url": url })),
        )
        .await?;

        let deadline = Instant::now() + self.render_timeout;
        loop {
            let source: String =
                command(&self.client, Method::GET, &session.endpoint("source"), None).await?;

            if self.extractor.has_rows(&source) {
                return Ok(source);
            }

            if Instant::now() >= deadline {
                return Err(FetchError::RenderTimeout {
                    waited: self.render_timeout,
                });
            }

            sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl PageFetcher for WebDriverFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let session = self.new_session().await?;
        let result = self.load_rendered(&session, url).await;
        session.release().await;
        result
    }

    fn fetcher_name(&self) -> &'static str {
        "webdriver"
    }
}

/// A live browser session, deleted on release or drop
struct Session {
    id: String,
    client: Client,
    webdriver_url: String,
    released: bool,
}

impl Session {
    fn url(&self) -> String {
        format!("{}/session/{}", self.webdriver_url, self.id)
    }

    fn endpoint(&self, command: &str) -> String {
        format!("{}/{}", self.url(), command)
    }

    async fn release(mut self) {
        self.released = true;
        delete_session(&self.client, &self.url()).await;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let client = self.client.clone();
        let url = self.url();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    delete_session(&client, &url).await;
                });
            }
            Err(_) => {
                tracing::warn!(session_url = %url, "Dropped browser session outside a runtime");
            }
        }
    }
}

async fn delete_session(client: &Client, session_url: &str) {
    match command::<Value>(client, Method::DELETE, session_url, None).await {
        Ok(_) => tracing::debug!(session_url, "Closed browser session"),
        Err(e) => tracing::warn!(session_url, error = %e, "Failed to close browser session"),
    }
}

/// Sends one WebDriver command and unwraps its `value`
async fn command<T: DeserializeOwned>(
    client: &Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> Result<T, FetchError> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request.send().await.map_err(FetchError::NetworkError)?;
    let status = response.status();
    let response_text = response.text().await.map_err(FetchError::NetworkError)?;

    let envelope: WebDriverResponse = serde_json::from_str(&response_text).map_err(|e| {
        FetchError::InvalidResponse(format!(
            "Failed to parse WebDriver response: {}. Status: {}",
            e, status
        ))
    })?;

    if !status.is_success() {
        return Err(match serde_json::from_value::<WebDriverErrorValue>(envelope.value) {
            Ok(err) if err.error == "timeout" => FetchError::Timeout,
            Ok(err) => FetchError::WebDriver(format!("{}: {}", err.error, err.message)),
            Err(_) => FetchError::WebDriver(format!("HTTP {}", status)),
        });
    }

    serde_json::from_value(envelope.value).map_err(|e| {
        FetchError::InvalidResponse(format!("Unexpected WebDriver payload: {}", e))
    })
}
