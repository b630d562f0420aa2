//! Two-tier crawler. Tier 1 is a cheap HTTP fetch validated against
//! product-page heuristics; tier 2 escalates to a headless browser when the
//! cheap fetch returned a blocked page, a homepage, or anything else that
//! fails validation. Never throws; every outcome is a tagged `CrawlResult`.

pub mod antibot;
pub mod browser;
pub mod validate;

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::types::{Confidence, CrawlResult, FallbackReason};

/// Per-attempt deadline for the cheap fetch tier.
const FETCH_DEADLINE: Duration = Duration::from_secs(10);

/// Cheap-fetch attempts before escalating.
const FETCH_ATTEMPTS: usize = 2;

pub struct Crawler {
    client: reqwest::Client,
}

struct FetchedBody {
    final_url: String,
    content_type: String,
    body: String,
}

impl Crawler {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Crawl one URL. The result's `html` is `None` only when both tiers
    /// produced nothing worth parsing, and then the confidence is always low.
    pub async fn crawl(&self, url: &str) -> CrawlResult {
        for attempt in 1..=FETCH_ATTEMPTS {
            match self.fetch_once(url).await {
                Ok(fetched) => {
                    if validate::is_valid_html(&fetched.body)
                        && validate::is_product_page(&fetched.body)
                        && validate::has_usable_signal(&fetched.body)
                    {
                        info!("tier-1 fetch usable: {} (attempt {})", url, attempt);
                        return CrawlResult {
                            final_url: fetched.final_url,
                            html: Some(fetched.body),
                            used_headless_browser: false,
                            content_type: fetched.content_type,
                            confidence: Confidence::High,
                            fallback_reason: None,
                        };
                    }
                    debug!("tier-1 validation failed: {} (attempt {})", url, attempt);
                }
                Err(e) => {
                    warn!("tier-1 fetch error: {} (attempt {}): {}", url, attempt, e);
                }
            }
        }

        self.escalate(url).await
    }

    async fn fetch_once(&self, url: &str) -> Result<FetchedBody, reqwest::Error> {
        let mut request = self
            .client
            .get(url)
            .timeout(FETCH_DEADLINE)
            .header("User-Agent", antibot::random_user_agent());
        for (name, value) in antibot::stealth_headers() {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_string();
        let body = response.text().await?;

        Ok(FetchedBody {
            final_url,
            content_type,
            body,
        })
    }

    /// Tier 2: render with a headless browser and re-validate.
    async fn escalate(&self, url: &str) -> CrawlResult {
        // Without a browser on the box there is nothing to escalate to.
        if !browser::native_browser_available() {
            warn!("no headless browser available, giving up on {}", url);
            return CrawlResult::failed(url, FallbackReason::FetchFailed);
        }

        info!("escalating to headless browser: {}", url);

        let rendered = match browser::fetch_rendered_html(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("headless navigation failed for {}: {}", url, e);
                return CrawlResult::failed(url, FallbackReason::CaptchaOrJs);
            }
        };

        if validate::has_usable_signal(&rendered) {
            return CrawlResult {
                final_url: url.to_string(),
                html: Some(rendered),
                used_headless_browser: true,
                content_type: "text/html".to_string(),
                confidence: Confidence::Medium,
                fallback_reason: None,
            };
        }

        // Rendered but still weak: keep the HTML for the extractor's own
        // guardrails, tag why we are unsure.
        let reason = if !validate::is_valid_html(&rendered) {
            FallbackReason::InvalidHtml
        } else {
            FallbackReason::NonProduct
        };
        CrawlResult {
            final_url: url.to_string(),
            html: Some(rendered),
            used_headless_browser: true,
            content_type: "text/html".to_string(),
            confidence: Confidence::Low,
            fallback_reason: Some(reason),
        }
    }
}
