use std::env;
use std::sync::Arc;

use crate::core::config::{self, PartscoutConfig};
use crate::discovery::serp::SerpClient;
use crate::llm::LlmClient;

#[derive(Clone)]
pub struct AppState {
    pub http_client: reqwest::Client,
    pub config: Arc<PartscoutConfig>,
    pub serp: Arc<SerpClient>,
    pub llm: Arc<LlmClient>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("search_key_present", &self.config.resolve_search_key().is_some())
            .field("llm_key_present", &self.config.resolve_llm_key().is_some())
            .finish()
    }
}

impl AppState {
    pub fn new(http_client: reqwest::Client) -> Self {
        let config = Arc::new(config::load_config());
        let serp = Arc::new(SerpClient::new(
            http_client.clone(),
            config.resolve_search_url(),
            config.resolve_search_key(),
        ));
        let llm = Arc::new(LlmClient::new(
            http_client.clone(),
            config.resolve_llm_base(),
            config.resolve_llm_model(),
            config.resolve_llm_key(),
        ));
        Self {
            http_client,
            config,
            serp,
            llm,
        }
    }

    /// Build the shared HTTP client the way the binary does, honoring the
    /// timeout env vars.
    pub fn default_http_client() -> reqwest::Client {
        let http_timeout = env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);
        let connect_timeout = env::var("HTTP_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(10);
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(http_timeout))
            .connect_timeout(std::time::Duration::from_secs(connect_timeout))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .unwrap_or_default()
    }
}
