use std::time::Duration;

use async_trait::async_trait;
use rand::{thread_rng, Rng};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use super::TextStore;
use crate::error::StoreError;
use crate::model::entry::TextEntry;

const BASE_DELAY_MS: u64 = 800;
const MAX_DELAY_MS: u64 = 30_000;
const ERROR_SNIPPET_LEN: usize = 400;
const SELECT_COLUMNS: &str = "key,content_nl,content_en,variables";

/// The hosted backend's REST interface over the microcopy table.
pub struct RestTextStore {
    client: Client,
    endpoint: String,
    api_key: String,
    max_retries: usize,
}

impl RestTextStore {
    pub fn new(
        base_url: &str,
        table: &str,
        api_key: &str,
        timeout: Duration,
        max_retries: usize,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint_for(base_url, table),
            api_key: api_key.to_string(),
            max_retries: max_retries.max(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch_once(&self) -> Result<Vec<TextEntry>, StoreError> {
        let mut request = self.client.get(&self.endpoint);
        if !self.api_key.is_empty() {
            request = request
                .header("apikey", &self.api_key)
                .bearer_auth(&self.api_key);
        }

        let resp = request.send().await?;
        let status = resp.status();

        // Read as text first so an error body survives a failed JSON parse.
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                message: extract_error_message(&text),
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl TextStore for RestTextStore {
    async fn fetch_all(&self) -> Result<Vec<TextEntry>, StoreError> {
        let mut attempt = 0;

        loop {
            match self.fetch_once().await {
                Ok(entries) => {
                    debug!(rows = entries.len(), attempt, "microcopy rows received");
                    return Ok(entries);
                }
                Err(err) if should_retry(&err) && attempt + 1 < self.max_retries => {
                    let delay = backoff(attempt);
                    warn!(
                        error = %err,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "microcopy fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn describe(&self) -> String {
        format!("rest {}", self.endpoint)
    }
}

fn endpoint_for(base_url: &str, table: &str) -> String {
    format!(
        "{}/rest/v1/{}?select={}",
        base_url.trim_end_matches('/'),
        table,
        SELECT_COLUMNS
    )
}

fn backoff(attempt: usize) -> Duration {
    let jitter: u64 = thread_rng().gen_range(0..200);
    let exponent = u32::try_from(attempt).unwrap_or(u32::MAX);
    let ms = BASE_DELAY_MS
        .saturating_mul(2_u64.saturating_pow(exponent))
        .min(MAX_DELAY_MS);
    Duration::from_millis(ms + jitter)
}

fn should_retry(err: &StoreError) -> bool {
    match err {
        StoreError::Transport(_) => true,
        StoreError::Status { status, .. } => StatusCode::from_u16(*status)
            .map(should_retry_http)
            .unwrap_or(false),
        _ => false,
    }
}

// 408/429/5xx are usually temporary.
fn should_retry_http(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

fn extract_error_message(body_text: &str) -> String {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body_text) {
        if let Some(msg) = v
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return msg.to_string();
        }
        if let Some(msg) = v.get("message").and_then(|m| m.as_str()) {
            return msg.to_string();
        }
    }

    let trimmed = body_text.trim();
    match trimmed.char_indices().nth(ERROR_SNIPPET_LEN) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
