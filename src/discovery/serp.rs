//! Thin client for the Google-search proxy.
//!
//! Contract: POST `{q, num: 10}` with an `X-API-KEY` header; the proxy
//! answers with organic results under either an `organic` or a `results`
//! key, each entry carrying `{link, title, snippet}`.

use serde_json::{json, Value};
use tracing::debug;

use crate::core::types::SerpResult;
use crate::core::EnrichError;

pub struct SerpClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl SerpClient {
    pub fn new(client: reqwest::Client, endpoint: String, api_key: Option<String>) -> Self {
        Self {
            client,
            endpoint,
            api_key,
        }
    }

    /// Run one query, returning up to ten organic results.
    ///
    /// Throws only on backend HTTP failure; an empty or oddly-shaped body is
    /// reported as zero results.
    pub async fn search(&self, query: &str) -> Result<Vec<SerpResult>, EnrichError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&json!({"q": query, "num": 10}));
        if let Some(key) = &self.api_key {
            request = request.header("X-API-KEY", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EnrichError::Search(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichError::Search(format!("HTTP {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| EnrichError::Search(format!("body read failed: {e}")))?;

        let results = parse_results(&body);
        debug!("search '{}' → {} organic results", query, results.len());
        Ok(results)
    }
}

/// Robust to both response shapes (`organic` or `results`).
pub fn parse_results(body: &Value) -> Vec<SerpResult> {
    let items = body
        .get("organic")
        .or_else(|| body.get("results"))
        .and_then(Value::as_array);

    let Some(items) = items else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let link = item.get("link").and_then(Value::as_str)?.trim();
            if link.is_empty() {
                return None;
            }
            Some(SerpResult {
                link: link.to_string(),
                title: item
                    .get("title")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
                snippet: item
                    .get("snippet")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
            })
        })
        .take(10)
        .collect()
}
